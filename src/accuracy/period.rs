use std::cmp::Reverse;

use crate::db::models::Measurement;

/// The live tracking epoch: the latest baseline and every measurement taken
/// at or after it, in chronological order (baseline included).
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentPeriod<'a> {
    pub baseline: Option<&'a Measurement>,
    pub measurements: Vec<&'a Measurement>,
}

impl<'a> CurrentPeriod<'a> {
    fn empty() -> Self {
        Self {
            baseline: None,
            measurements: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Most recent measurement of the period.
    pub fn last(&self) -> Option<&'a Measurement> {
        self.measurements.last().copied()
    }
}

/// Order measurements by reference time. Stable, so equal timestamps keep
/// their input order.
pub fn sort_by_time(measurements: &[Measurement]) -> Vec<&Measurement> {
    let mut sorted: Vec<&Measurement> = measurements.iter().collect();
    sorted.sort_by_key(|m| m.device_time);
    sorted
}

/// Pick the latest baseline and the measurements that belong to its epoch.
///
/// Earlier epochs stay in storage but are excluded here once a newer
/// baseline exists. Without any baseline the period is empty.
pub fn resolve_current_period(measurements: &[Measurement]) -> CurrentPeriod<'_> {
    let sorted = sort_by_time(measurements);

    let Some(baseline) = sorted.iter().rev().find(|m| m.is_baseline).copied() else {
        return CurrentPeriod::empty();
    };

    let period = sorted
        .into_iter()
        .filter(|m| m.device_time >= baseline.device_time)
        .collect();

    CurrentPeriod {
        baseline: Some(baseline),
        measurements: period,
    }
}

/// The baseline in force when `measurement` was taken: the most recent
/// baseline at or before its reference time.
pub fn find_applicable_baseline<'a>(
    measurement: &Measurement,
    all: &'a [Measurement],
) -> Option<&'a Measurement> {
    all.iter()
        .filter(|m| m.is_baseline && m.device_time <= measurement.device_time)
        .min_by_key(|m| Reverse(m.device_time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accuracy::rate::tests::sample;

    #[test]
    fn sort_is_stable_for_equal_times() {
        let list = vec![
            sample("b", 2_000, 0, false),
            sample("a", 1_000, 0, false),
            sample("c", 2_000, 0, false),
        ];
        let ids: Vec<&str> = sort_by_time(&list).iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn no_baseline_gives_empty_period() {
        let list = vec![sample("a", 0, 0, false), sample("b", 10, 0, false)];
        let period = resolve_current_period(&list);
        assert!(period.baseline.is_none());
        assert!(period.is_empty());
    }

    #[test]
    fn newest_baseline_starts_the_period() {
        // Deliberately unsorted input.
        let list = vec![
            sample("D", 4_000, -40, false),
            sample("B", 2_000, -20, false),
            sample("C", 3_000, -30, true),
            sample("A", 1_000, 0, true),
        ];
        let period = resolve_current_period(&list);
        assert_eq!(period.baseline.map(|m| m.id.as_str()), Some("C"));
        let ids: Vec<&str> = period.measurements.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["C", "D"]);
        assert_eq!(period.last().map(|m| m.id.as_str()), Some("D"));
    }

    #[test]
    fn lone_baseline_is_its_own_period() {
        let list = vec![sample("A", 1_000, 0, false), sample("B", 5_000, 0, true)];
        let period = resolve_current_period(&list);
        assert_eq!(period.len(), 1);
        assert_eq!(period.baseline.map(|m| m.id.as_str()), Some("B"));
    }

    #[test]
    fn applicable_baseline_is_latest_not_after_measurement() {
        let list = vec![
            sample("A", 1_000, 0, true),
            sample("B", 2_000, 0, false),
            sample("C", 3_000, 0, true),
            sample("D", 4_000, 0, false),
        ];
        assert_eq!(find_applicable_baseline(&list[1], &list).map(|m| m.id.as_str()), Some("A"));
        assert_eq!(find_applicable_baseline(&list[3], &list).map(|m| m.id.as_str()), Some("C"));
        assert_eq!(find_applicable_baseline(&list[2], &list).map(|m| m.id.as_str()), Some("C"));

        let before_any = sample("Z", 500, 0, false);
        assert!(find_applicable_baseline(&before_any, &list).is_none());
    }
}
