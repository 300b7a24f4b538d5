/// Thresholds used by the accuracy engine.
#[derive(Debug, Clone)]
pub struct AccuracyConfig {
    /// Below this many days since baseline the rate is not reported (~14.4 min)
    pub min_elapsed_days: f64,

    /// Period size at which least-squares replaces the two-point rate
    pub regression_min_points: usize,

    /// |rate| under this many s/day counts as stable
    pub stable_threshold: f64,

    /// Confidence tiers: (days elapsed, measurements in period)
    pub high_confidence_days: f64,
    pub high_confidence_points: usize,
    pub medium_confidence_days: f64,
    pub medium_confidence_points: usize,

    /// Magnitude bands in s/day, inclusive upper bounds
    pub good_max: f64,
    pub fair_max: f64,
}

impl Default for AccuracyConfig {
    fn default() -> Self {
        Self {
            min_elapsed_days: 0.01,
            regression_min_points: 3,
            stable_threshold: 0.5,
            high_confidence_days: 7.0,
            high_confidence_points: 5,
            medium_confidence_days: 1.0,
            medium_confidence_points: 2,
            good_max: 5.0,
            fair_max: 15.0,
        }
    }
}
