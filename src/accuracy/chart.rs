use serde::{Deserialize, Serialize};

use super::period::sort_by_time;
use super::rate::{calculate_accuracy_with, drift_point};
use super::AccuracyConfig;
use crate::db::models::Measurement;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    /// Days since baseline.
    pub x: f64,
    /// Average rate since baseline, s/day.
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RegressionLine {
    pub start: ChartPoint,
    pub end: ChartPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub points: Vec<ChartPoint>,
    pub regression_line: Option<RegressionLine>,
    pub baseline: Option<Measurement>,
}

impl ChartData {
    fn empty(baseline: Option<Measurement>) -> Self {
        Self {
            points: Vec::new(),
            regression_line: None,
            baseline,
        }
    }
}

pub fn get_chart_data(measurements: &[Measurement]) -> ChartData {
    get_chart_data_with(measurements, &AccuracyConfig::default())
}

/// Chart series for the current tracking period.
///
/// Each point plots the cumulative average rate from the baseline up to that
/// measurement, which is noisier than the headline regression rate. The
/// regression rate is overlaid as a flat line across the plotted range.
/// The baseline itself is not plotted.
pub fn get_chart_data_with(measurements: &[Measurement], config: &AccuracyConfig) -> ChartData {
    if measurements.len() < 2 {
        return ChartData::empty(None);
    }

    let sorted = sort_by_time(measurements);
    let Some(baseline) = sorted.iter().rev().find(|m| m.is_baseline).copied() else {
        return ChartData::empty(None);
    };

    let after_baseline: Vec<&Measurement> = sorted
        .into_iter()
        .filter(|m| m.device_time > baseline.device_time)
        .collect();

    if after_baseline.len() < 2 {
        return ChartData::empty(Some(baseline.clone()));
    }

    let points: Vec<ChartPoint> = after_baseline
        .iter()
        .map(|m| {
            let (x, drift_secs) = drift_point(m, baseline);
            ChartPoint {
                x,
                y: drift_secs / x,
            }
        })
        .collect();

    let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let rate = calculate_accuracy_with(measurements, config)
        .seconds_per_day
        .unwrap_or(0.0);

    ChartData {
        points,
        regression_line: Some(RegressionLine {
            start: ChartPoint { x: min_x, y: rate },
            end: ChartPoint { x: max_x, y: rate },
        }),
        baseline: Some(baseline.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accuracy::rate::tests::sample;

    const DAY_MS: i64 = 86_400_000;

    #[test]
    fn too_few_measurements_have_no_baseline() {
        let chart = get_chart_data(&[sample("a", 0, 0, true)]);
        assert!(chart.points.is_empty());
        assert!(chart.regression_line.is_none());
        assert!(chart.baseline.is_none());
    }

    #[test]
    fn no_baseline_gives_empty_chart() {
        let chart = get_chart_data(&[sample("a", 0, 0, false), sample("b", DAY_MS, 0, false)]);
        assert_eq!(chart, ChartData::empty(None));
    }

    #[test]
    fn single_point_after_baseline_keeps_baseline() {
        let chart = get_chart_data(&[sample("a", 0, 0, true), sample("b", DAY_MS, -1000, false)]);
        assert!(chart.points.is_empty());
        assert!(chart.regression_line.is_none());
        assert_eq!(chart.baseline.map(|b| b.id), Some("a".to_string()));
    }

    #[test]
    fn points_are_average_rates_since_baseline() {
        let list = vec![
            sample("c", 4 * DAY_MS, -6000, false),
            sample("a", 0, 1000, true),
            sample("b", 2 * DAY_MS, -3000, false),
        ];
        let chart = get_chart_data(&list);

        // Drift 4s over 2 days, then 7s over 4 days.
        assert_eq!(chart.points, vec![ChartPoint { x: 2.0, y: 2.0 }, ChartPoint { x: 4.0, y: 1.75 }]);

        let line = chart.regression_line.unwrap();
        let headline = calculate_accuracy_with(&list, &AccuracyConfig::default());
        assert_eq!(line.start, ChartPoint { x: 2.0, y: headline.seconds_per_day.unwrap() });
        assert_eq!(line.end.x, 4.0);
        assert_eq!(line.start.y, line.end.y);
    }

    #[test]
    fn flat_line_sits_at_zero_without_a_rate() {
        // Both points land inside the first 0.01 day, so there is no headline rate.
        let minute = 60 * 1000;
        let list = vec![
            sample("a", 0, 0, true),
            sample("b", 5 * minute, -100, false),
            sample("c", 10 * minute, -200, false),
        ];
        assert_eq!(calculate_accuracy_with(&list, &AccuracyConfig::default()).seconds_per_day, None);

        let chart = get_chart_data(&list);
        assert_eq!(chart.points.len(), 2);
        let line = chart.regression_line.unwrap();
        assert_eq!(line.start.y, 0.0);
        assert_eq!(line.end.y, 0.0);
        assert_eq!(line.start.x, chart.points[0].x);
        assert_eq!(line.end.x, chart.points[1].x);
    }

    #[test]
    fn chart_only_covers_latest_epoch() {
        let list = vec![
            sample("A", 0, 0, true),
            sample("B", DAY_MS, -9000, false),
            sample("C", 2 * DAY_MS, 0, true),
            sample("D", 3 * DAY_MS, -1000, false),
            sample("E", 4 * DAY_MS, -2000, false),
        ];
        let chart = get_chart_data(&list);
        assert_eq!(chart.baseline.as_ref().map(|b| b.id.as_str()), Some("C"));
        assert_eq!(chart.points.len(), 2);
        assert!(chart.points.iter().all(|p| (p.y - 1.0).abs() < 1e-9));
    }
}
