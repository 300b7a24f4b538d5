pub mod chart;
pub mod config;
pub mod format;
pub mod period;
pub mod rate;

pub use chart::{get_chart_data, get_chart_data_with, ChartData, ChartPoint, RegressionLine};
pub use config::AccuracyConfig;
pub use format::{
    classify_magnitude, classify_magnitude_with, format_accuracy, format_offset, Magnitude,
};
pub use period::{find_applicable_baseline, resolve_current_period, sort_by_time, CurrentPeriod};
pub use rate::{
    calculate_accuracy, calculate_accuracy_with, drift_from_baseline, measurement_history,
    AccuracyStats, Confidence, DriftSample, MeasurementDrift, Trend,
};

pub(crate) const MS_PER_DAY: f64 = 86_400_000.0;
