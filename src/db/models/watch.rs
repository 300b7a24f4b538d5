//! Watch-related data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Measurement;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Automatic,
    Manual,
    Quartz,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Automatic => "automatic",
            MovementType::Manual => "manual",
            MovementType::Quartz => "quartz",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Watch {
    pub id: String,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub movement_type: MovementType,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

/// Input data for registering a watch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWatch {
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub movement_type: MovementType,
}

/// Partial update; `None` leaves the column untouched. `Some(None)` clears
/// an optional column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchUpdate {
    pub name: Option<String>,
    pub brand: Option<Option<String>>,
    pub model: Option<Option<String>>,
    pub movement_type: Option<MovementType>,
}

impl WatchUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.brand.is_none()
            && self.model.is_none()
            && self.movement_type.is_none()
    }
}

/// A watch with the headline numbers of its current tracking period, for
/// list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchSummary {
    #[serde(flatten)]
    pub watch: Watch,
    pub current_baseline: Option<Measurement>,
    pub measurement_count: usize,
    pub latest_offset_ms: Option<i64>,
    pub seconds_per_day: Option<f64>,
}
