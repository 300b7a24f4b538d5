//! Whole-library JSON backup: export every watch with its measurements and
//! import such a file back, either merging or replacing.

pub mod export;
pub mod import;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{Measurement, TimeSource, Watch};

pub use export::to_json;
pub use import::{parse_import, validate_import_data, ImportError, ImportMode, ImportResult};

pub const EXPORT_VERSION: u64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub version: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub exported_at: DateTime<Utc>,
    pub data: ExportBody,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExportBody {
    pub watches: Vec<ExportedWatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportedWatch {
    #[serde(flatten)]
    pub watch: Watch,
    pub measurements: Vec<ExportedMeasurement>,
}

/// A measurement without its owner id; the enclosing watch supplies it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedMeasurement {
    pub id: String,
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

impl From<&Measurement> for ExportedMeasurement {
    fn from(m: &Measurement) -> Self {
        Self {
            id: m.id.clone(),
            watch_time: m.watch_time,
            device_time: m.device_time,
            delta_ms: m.delta_ms,
            time_source: m.time_source,
            is_baseline: m.is_baseline,
            created_at: m.created_at,
        }
    }
}

impl ExportedMeasurement {
    pub fn into_measurement(self, watch_id: &str) -> Measurement {
        Measurement {
            id: self.id,
            watch_id: watch_id.to_string(),
            watch_time: self.watch_time,
            device_time: self.device_time,
            delta_ms: self.delta_ms,
            time_source: self.time_source,
            is_baseline: self.is_baseline,
            created_at: self.created_at,
        }
    }
}
