use std::convert::TryFrom;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use crate::db::models::{MovementType, TimeSource};

pub fn to_usize(value: i64, field: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn from_millis(value: i64, field: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value)
        .ok_or_else(|| anyhow!("{field} holds out-of-range timestamp {value}"))
}

pub fn parse_time_source(value: &str) -> Result<TimeSource> {
    match value {
        "ntp" => Ok(TimeSource::Ntp),
        "device" => Ok(TimeSource::Device),
        other => Err(anyhow!("unknown time source {other}")),
    }
}

pub fn parse_movement_type(value: &str) -> Result<MovementType> {
    match value {
        "automatic" => Ok(MovementType::Automatic),
        "manual" => Ok(MovementType::Manual),
        "quartz" => Ok(MovementType::Quartz),
        other => Err(anyhow!("unknown movement type {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_enums() {
        assert_eq!(parse_time_source("ntp").unwrap(), TimeSource::Ntp);
        assert_eq!(parse_movement_type("quartz").unwrap(), MovementType::Quartz);
        assert!(parse_time_source("gps").is_err());
        assert!(parse_movement_type("Quartz").is_err());
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(to_usize(-1, "count").is_err());
        assert_eq!(to_usize(3, "count").unwrap(), 3);
        assert_eq!(from_millis(0, "created_at").unwrap().timestamp_millis(), 0);
        assert!(from_millis(i64::MAX, "created_at").is_err());
    }
}
