use serde::{Deserialize, Serialize};

use super::period::{find_applicable_baseline, resolve_current_period, sort_by_time};
use super::{AccuracyConfig, MS_PER_DAY};
use crate::db::models::Measurement;

/// Readings closer than this to their baseline get no per-measurement rate.
const MIN_RATE_WINDOW_MS: i64 = 15 * 60 * 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Gaining,
    Losing,
    Stable,
    Unknown,
}

impl Trend {
    pub fn classify(seconds_per_day: f64, config: &AccuracyConfig) -> Self {
        if seconds_per_day.abs() < config.stable_threshold {
            Trend::Stable
        } else if seconds_per_day > 0.0 {
            Trend::Gaining
        } else {
            Trend::Losing
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Gaining => "gaining",
            Trend::Losing => "losing",
            Trend::Stable => "stable",
            Trend::Unknown => "unknown",
        }
    }
}

/// Coarse trust level of a rate estimate. Rule of thumb, not a statistic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// First matching tier wins.
    pub fn classify(elapsed_days: f64, period_count: usize, config: &AccuracyConfig) -> Self {
        if elapsed_days >= config.high_confidence_days
            && period_count >= config.high_confidence_points
        {
            Confidence::High
        } else if elapsed_days >= config.medium_confidence_days
            && period_count >= config.medium_confidence_points
        {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Headline accuracy of a watch over its current tracking period.
///
/// `total_drift_ms` and `seconds_per_day` are positive when the watch gains
/// time. `measurement_count` counts every measurement passed in, not only
/// the current period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyStats {
    pub seconds_per_day: Option<f64>,
    pub trend: Trend,
    pub confidence: Confidence,
    pub elapsed_days: f64,
    pub total_drift_ms: i64,
    pub measurement_count: usize,
}

impl AccuracyStats {
    fn unknown(measurement_count: usize) -> Self {
        Self {
            seconds_per_day: None,
            trend: Trend::Unknown,
            confidence: Confidence::Low,
            elapsed_days: 0.0,
            total_drift_ms: 0,
            measurement_count,
        }
    }
}

/// Drift of one measurement relative to a baseline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriftSample {
    pub drift_ms: i64,
    pub elapsed_ms: i64,
    pub seconds_per_day: Option<f64>,
}

/// A measurement paired with its drift against the baseline that applied
/// when it was taken.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementDrift {
    pub measurement: Measurement,
    pub baseline_id: Option<String>,
    pub drift: Option<DriftSample>,
}

pub fn calculate_accuracy(measurements: &[Measurement]) -> AccuracyStats {
    calculate_accuracy_with(measurements, &AccuracyConfig::default())
}

/// Estimate the drift rate of the current tracking period.
///
/// Never fails: too few measurements, no baseline or too short a period all
/// degrade to an unknown, low-confidence result.
pub fn calculate_accuracy_with(
    measurements: &[Measurement],
    config: &AccuracyConfig,
) -> AccuracyStats {
    let count = measurements.len();
    if count < 2 {
        return AccuracyStats::unknown(count);
    }

    let period = resolve_current_period(measurements);
    let (Some(baseline), Some(last)) = (period.baseline, period.last()) else {
        return AccuracyStats::unknown(count);
    };
    if period.len() < 2 {
        return AccuracyStats::unknown(count);
    }

    let elapsed_ms = (last.device_time - baseline.device_time).num_milliseconds();
    let elapsed_days = elapsed_ms as f64 / MS_PER_DAY;
    let total_drift_ms = drift_ms(last, baseline);

    if elapsed_days < config.min_elapsed_days {
        return AccuracyStats {
            elapsed_days,
            total_drift_ms,
            ..AccuracyStats::unknown(count)
        };
    }

    let seconds_per_day = if period.len() >= config.regression_min_points {
        let points: Vec<(f64, f64)> = period
            .measurements
            .iter()
            .map(|m| drift_point(m, baseline))
            .collect();
        least_squares_slope(&points)
    } else {
        (total_drift_ms as f64 / elapsed_days) / 1000.0
    };

    AccuracyStats {
        seconds_per_day: Some(round_one_decimal(seconds_per_day)),
        trend: Trend::classify(seconds_per_day, config),
        confidence: Confidence::classify(elapsed_days, period.len(), config),
        elapsed_days,
        total_drift_ms,
        measurement_count: count,
    }
}

/// Drift of a single measurement since `baseline`, with a per-day rate once
/// at least 15 minutes have passed.
pub fn drift_from_baseline(measurement: &Measurement, baseline: &Measurement) -> DriftSample {
    let drift_ms = drift_ms(measurement, baseline);
    let elapsed_ms = (measurement.device_time - baseline.device_time).num_milliseconds();

    let seconds_per_day = if elapsed_ms < MIN_RATE_WINDOW_MS {
        None
    } else {
        Some(drift_ms as f64 / elapsed_ms as f64 * MS_PER_DAY / 1000.0)
    };

    DriftSample {
        drift_ms,
        elapsed_ms,
        seconds_per_day,
    }
}

/// Every measurement, newest first, with its drift against the baseline in
/// force at the time. Measurements older than any baseline carry no drift.
pub fn measurement_history(measurements: &[Measurement]) -> Vec<MeasurementDrift> {
    sort_by_time(measurements)
        .into_iter()
        .rev()
        .map(|m| {
            let baseline = find_applicable_baseline(m, measurements);
            MeasurementDrift {
                measurement: m.clone(),
                baseline_id: baseline.map(|b| b.id.clone()),
                drift: baseline.map(|b| drift_from_baseline(m, b)),
            }
        })
        .collect()
}

/// Negated delta change: positive means the watch ran fast since baseline.
/// Saturates rather than overflowing on absurd stored deltas.
pub(crate) fn drift_ms(measurement: &Measurement, baseline: &Measurement) -> i64 {
    baseline.delta_ms.saturating_sub(measurement.delta_ms)
}

/// (days since baseline, drift in seconds since baseline)
pub(crate) fn drift_point(measurement: &Measurement, baseline: &Measurement) -> (f64, f64) {
    let x = (measurement.device_time - baseline.device_time).num_milliseconds() as f64 / MS_PER_DAY;
    let y = drift_ms(measurement, baseline) as f64 / 1000.0;
    (x, y)
}

/// Ordinary least-squares slope. Degenerate x values give 0.
fn least_squares_slope(points: &[(f64, f64)]) -> f64 {
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
    let sum_x2: f64 = points.iter().map(|(x, _)| x * x).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }

    (n * sum_xy - sum_x * sum_y) / denominator
}

/// Half-up rounding to one decimal.
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::models::TimeSource;
    use chrono::{DateTime, Duration};

    const DAY_MS: i64 = 86_400_000;

    pub(crate) fn sample(id: &str, device_ms: i64, delta_ms: i64, is_baseline: bool) -> Measurement {
        let device_time = DateTime::from_timestamp_millis(device_ms).unwrap();
        Measurement {
            id: id.to_string(),
            watch_id: "watch".to_string(),
            watch_time: device_time - Duration::milliseconds(delta_ms),
            device_time,
            delta_ms,
            time_source: TimeSource::Ntp,
            is_baseline,
            created_at: device_time,
        }
    }

    fn assert_unknown(stats: &AccuracyStats) {
        assert_eq!(stats.seconds_per_day, None);
        assert_eq!(stats.trend, Trend::Unknown);
        assert_eq!(stats.confidence, Confidence::Low);
    }

    #[test]
    fn fewer_than_two_measurements_is_unknown() {
        let empty = calculate_accuracy(&[]);
        assert_unknown(&empty);
        assert_eq!(empty.measurement_count, 0);

        let single = calculate_accuracy(&[sample("a", 0, 0, true)]);
        assert_unknown(&single);
        assert_eq!(single.measurement_count, 1);
        assert_eq!(single.elapsed_days, 0.0);
    }

    #[test]
    fn missing_baseline_is_unknown_at_any_size() {
        let list: Vec<Measurement> = (0..6)
            .map(|i| sample(&i.to_string(), i * DAY_MS, -1000 * i, false))
            .collect();
        let stats = calculate_accuracy(&list);
        assert_unknown(&stats);
        assert_eq!(stats.total_drift_ms, 0);
        assert_eq!(stats.measurement_count, 6);
    }

    #[test]
    fn baseline_as_last_measurement_is_unknown() {
        let list = vec![sample("a", 0, 0, true), sample("b", DAY_MS, -500, true)];
        let stats = calculate_accuracy(&list);
        assert_unknown(&stats);
        assert_eq!(stats.elapsed_days, 0.0);
        assert_eq!(stats.measurement_count, 2);
    }

    #[test]
    fn one_day_three_seconds_fast() {
        let list = vec![sample("a", 0, 0, true), sample("b", DAY_MS, -3000, false)];
        let stats = calculate_accuracy(&list);
        assert_eq!(stats.total_drift_ms, 3000);
        assert_eq!(stats.elapsed_days, 1.0);
        assert_eq!(stats.seconds_per_day, Some(3.0));
        assert_eq!(stats.trend, Trend::Gaining);
        assert_eq!(stats.confidence, Confidence::Medium);
    }

    #[test]
    fn sign_convention_for_fast_and_slow_watches() {
        let fast = calculate_accuracy(&[sample("a", 0, 0, true), sample("b", DAY_MS, -5000, false)]);
        assert_eq!(fast.total_drift_ms, 5000);
        assert_eq!(fast.seconds_per_day, Some(5.0));
        assert_eq!(fast.trend, Trend::Gaining);

        let slow = calculate_accuracy(&[sample("a", 0, 0, true), sample("b", 2 * DAY_MS, 8000, false)]);
        assert_eq!(slow.total_drift_ms, -8000);
        assert_eq!(slow.seconds_per_day, Some(-4.0));
        assert_eq!(slow.trend, Trend::Losing);
    }

    #[test]
    fn short_period_keeps_drift_but_hides_rate() {
        // Ten minutes is below the 0.01 day floor.
        let list = vec![sample("a", 0, 100, true), sample("b", 10 * 60 * 1000, -400, false)];
        let stats = calculate_accuracy(&list);
        assert_unknown(&stats);
        assert_eq!(stats.total_drift_ms, 500);
        assert!(stats.elapsed_days > 0.0 && stats.elapsed_days < 0.01);
    }

    #[test]
    fn two_points_use_simple_rate() {
        let list = vec![sample("a", 0, 250, true), sample("b", 3 * DAY_MS + DAY_MS / 2, -6_750, false)];
        let stats = calculate_accuracy(&list);
        let expected = (stats.total_drift_ms as f64 / stats.elapsed_days) / 1000.0;
        assert_eq!(stats.seconds_per_day, Some(round_one_decimal(expected)));
        assert_eq!(stats.seconds_per_day, Some(2.0));
    }

    #[test]
    fn collinear_points_match_pairwise_slope() {
        let list = vec![
            sample("a", 0, 0, true),
            sample("b", DAY_MS, -2000, false),
            sample("c", 2 * DAY_MS, -4000, false),
            sample("d", 4 * DAY_MS, -8000, false),
        ];
        let stats = calculate_accuracy(&list);
        assert_eq!(stats.seconds_per_day, Some(2.0));

        let pair = calculate_accuracy(&[list[0].clone(), list[3].clone()]);
        assert_eq!(stats.seconds_per_day, pair.seconds_per_day);
    }

    #[test]
    fn regression_smooths_noisy_points() {
        let list = vec![
            sample("a", 0, 0, true),
            sample("b", DAY_MS, 1000, false),
            sample("c", 2 * DAY_MS, 3000, false),
            sample("d", 3 * DAY_MS, 3000, false),
        ];
        // y = [0, -1, -3, -3] over x = [0, 1, 2, 3]: slope -1.1
        let stats = calculate_accuracy(&list);
        assert_eq!(stats.seconds_per_day, Some(-1.1));
        assert_eq!(stats.trend, Trend::Losing);
        assert_eq!(stats.total_drift_ms, -3000);
    }

    #[test]
    fn older_epochs_are_ignored() {
        let list = vec![
            sample("A", 0, 0, true),
            sample("B", DAY_MS, -50_000, false),
            sample("C", 2 * DAY_MS, 10_000, true),
            sample("D", 3 * DAY_MS, 9_000, false),
        ];
        let stats = calculate_accuracy(&list);
        assert_eq!(stats.total_drift_ms, 1000);
        assert_eq!(stats.seconds_per_day, Some(1.0));
        assert_eq!(stats.elapsed_days, 1.0);
        assert_eq!(stats.measurement_count, 4);
    }

    #[test]
    fn stable_band_uses_unrounded_rate() {
        // 0.48 s/day rounds to 0.5 but still sits inside the stable band.
        let list = vec![sample("a", 0, 0, true), sample("b", 2 * DAY_MS, -960, false)];
        let stats = calculate_accuracy(&list);
        assert_eq!(stats.seconds_per_day, Some(0.5));
        assert_eq!(stats.trend, Trend::Stable);
    }

    #[test]
    fn confidence_tiers() {
        let config = AccuracyConfig::default();
        assert_eq!(Confidence::classify(6.99, 5, &config), Confidence::Medium);
        assert_eq!(Confidence::classify(7.0, 5, &config), Confidence::High);
        assert_eq!(Confidence::classify(30.0, 4, &config), Confidence::Medium);
        assert_eq!(Confidence::classify(0.99, 10, &config), Confidence::Low);
        assert_eq!(Confidence::classify(1.0, 1, &config), Confidence::Low);
    }

    #[test]
    fn high_confidence_after_a_week() {
        let list: Vec<Measurement> = (0..5)
            .map(|i| sample(&i.to_string(), i * 2 * DAY_MS, -1000 * i, i == 0))
            .collect();
        let stats = calculate_accuracy(&list);
        assert_eq!(stats.elapsed_days, 8.0);
        assert_eq!(stats.confidence, Confidence::High);
        assert_eq!(stats.seconds_per_day, Some(0.5));
    }

    #[test]
    fn degenerate_regression_slope_is_zero() {
        assert_eq!(least_squares_slope(&[(1.0, 2.0), (1.0, 5.0), (1.0, -3.0)]), 0.0);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let list = vec![
            sample("c", 2 * DAY_MS, -2500, false),
            sample("a", 0, 0, true),
            sample("b", DAY_MS, -1000, false),
        ];
        let first = calculate_accuracy(&list);
        let second = calculate_accuracy(&list);
        assert_eq!(first, second);
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_one_decimal(2.25), 2.3);
        assert_eq!(round_one_decimal(-2.25), -2.2);
        assert_eq!(round_one_decimal(2.04), 2.0);
    }

    #[test]
    fn extreme_deltas_saturate() {
        let baseline = sample("a", 0, -2, true);
        let mut wild = sample("b", DAY_MS, 0, false);
        wild.delta_ms = i64::MAX;
        let list = vec![baseline.clone(), wild.clone()];

        let stats = calculate_accuracy(&list);
        assert_eq!(stats.total_drift_ms, i64::MIN);
        assert_eq!(stats.trend, Trend::Losing);
        assert_eq!(drift_from_baseline(&wild, &baseline).drift_ms, i64::MIN);
        assert_eq!(measurement_history(&list)[0].drift.map(|d| d.drift_ms), Some(i64::MIN));
    }

    #[test]
    fn drift_rate_needs_fifteen_minutes() {
        let baseline = sample("a", 0, 0, true);
        let early = drift_from_baseline(&sample("b", 14 * 60 * 1000, -100, false), &baseline);
        assert_eq!(early.drift_ms, 100);
        assert_eq!(early.seconds_per_day, None);

        let later = drift_from_baseline(&sample("c", DAY_MS / 2, -1500, false), &baseline);
        assert_eq!(later.elapsed_ms, DAY_MS / 2);
        let rate = later.seconds_per_day.unwrap();
        assert!((rate - 3.0).abs() < 1e-9);
    }

    #[test]
    fn history_is_newest_first_with_applicable_baseline() {
        let list = vec![
            sample("pre", 0, 0, false),
            sample("A", DAY_MS, 0, true),
            sample("B", 2 * DAY_MS, -1000, false),
            sample("C", 3 * DAY_MS, 500, true),
            sample("D", 4 * DAY_MS, -500, false),
        ];
        let history = measurement_history(&list);
        let ids: Vec<&str> = history.iter().map(|h| h.measurement.id.as_str()).collect();
        assert_eq!(ids, ["D", "C", "B", "A", "pre"]);

        assert_eq!(history[0].baseline_id.as_deref(), Some("C"));
        assert_eq!(history[0].drift.map(|d| d.drift_ms), Some(1000));
        assert_eq!(history[2].baseline_id.as_deref(), Some("A"));
        let rate = history[2].drift.and_then(|d| d.seconds_per_day).unwrap();
        assert!((rate - 1.0).abs() < 1e-9);
        assert!(history[4].drift.is_none());
    }
}
