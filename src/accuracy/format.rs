use serde::{Deserialize, Serialize};

use super::AccuracyConfig;

/// How good a drift rate is, for colour-coding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Magnitude {
    Good,
    Fair,
    Poor,
    Unknown,
}

impl Magnitude {
    pub fn as_str(&self) -> &'static str {
        match self {
            Magnitude::Good => "good",
            Magnitude::Fair => "fair",
            Magnitude::Poor => "poor",
            Magnitude::Unknown => "unknown",
        }
    }
}

/// `+3.2 s/day`, `-0.7 s/day`, or `--` when there is no rate yet.
pub fn format_accuracy(seconds_per_day: Option<f64>) -> String {
    match seconds_per_day {
        Some(value) => format!("{} s/day", signed_one_decimal(value)),
        None => "--".to_string(),
    }
}

/// Offset in milliseconds as signed seconds, e.g. `-1.5s`.
pub fn format_offset(offset_ms: i64) -> String {
    format!("{}s", signed_one_decimal(offset_ms as f64 / 1000.0))
}

pub fn classify_magnitude(seconds_per_day: Option<f64>) -> Magnitude {
    classify_magnitude_with(seconds_per_day, &AccuracyConfig::default())
}

pub fn classify_magnitude_with(seconds_per_day: Option<f64>, config: &AccuracyConfig) -> Magnitude {
    let Some(value) = seconds_per_day else {
        return Magnitude::Unknown;
    };

    let abs = value.abs();
    if abs <= config.good_max {
        Magnitude::Good
    } else if abs <= config.fair_max {
        Magnitude::Fair
    } else {
        Magnitude::Poor
    }
}

// Non-negative values (negative zero included) get an explicit `+`.
fn signed_one_decimal(value: f64) -> String {
    if value >= 0.0 {
        format!("+{:.1}", value.abs())
    } else {
        format!("{value:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_formatting() {
        assert_eq!(format_accuracy(None), "--");
        assert_eq!(format_accuracy(Some(0.0)), "+0.0 s/day");
        assert_eq!(format_accuracy(Some(-0.0)), "+0.0 s/day");
        assert_eq!(format_accuracy(Some(3.0)), "+3.0 s/day");
        assert_eq!(format_accuracy(Some(-12.4)), "-12.4 s/day");
    }

    #[test]
    fn offset_formatting() {
        assert_eq!(format_offset(0), "+0.0s");
        assert_eq!(format_offset(1500), "+1.5s");
        assert_eq!(format_offset(-5000), "-5.0s");
        assert_eq!(format_offset(-260), "-0.3s");
    }

    #[test]
    fn magnitude_bands() {
        assert_eq!(classify_magnitude(None), Magnitude::Unknown);
        assert_eq!(classify_magnitude(Some(0.0)), Magnitude::Good);
        assert_eq!(classify_magnitude(Some(-5.0)), Magnitude::Good);
        assert_eq!(classify_magnitude(Some(5.1)), Magnitude::Fair);
        assert_eq!(classify_magnitude(Some(-15.0)), Magnitude::Fair);
        assert_eq!(classify_magnitude(Some(15.1)), Magnitude::Poor);
    }
}
