use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where the reference timestamp of a measurement came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeSource {
    /// Network time server.
    Ntp,
    /// Local device clock.
    Device,
}

impl TimeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSource::Ntp => "ntp",
            TimeSource::Device => "device",
        }
    }
}

/// A single reading of a watch dial against the reference clock.
///
/// Never mutated after capture. `delta_ms` is `device_time - watch_time`:
/// positive when the watch is behind the reference (slow), negative when it
/// is ahead (fast).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub id: String,
    pub watch_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub watch_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub device_time: DateTime<Utc>,
    pub delta_ms: i64,
    pub time_source: TimeSource,
    pub is_baseline: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Measurement {
    /// Build a fresh measurement from what the dial showed and the trusted
    /// reference instant of the capture. Times are kept to the millisecond,
    /// the resolution they are stored at.
    pub fn capture(
        watch_id: &str,
        watch_time: DateTime<Utc>,
        device_time: DateTime<Utc>,
        time_source: TimeSource,
        is_baseline: bool,
    ) -> Self {
        let watch_time = watch_time.trunc_subsecs(3);
        let device_time = device_time.trunc_subsecs(3);
        Self {
            id: Uuid::new_v4().to_string(),
            watch_id: watch_id.to_string(),
            watch_time,
            device_time,
            delta_ms: (device_time - watch_time).num_milliseconds(),
            time_source,
            is_baseline,
            created_at: Utc::now().trunc_subsecs(3),
        }
    }
}
