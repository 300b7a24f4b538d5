use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::{ExportData, EXPORT_VERSION};
use crate::db::{
    connection::Database,
    repositories::{
        measurements::{insert_measurement_row, measurement_exists_row},
        watches::{clear_all_rows, insert_watch_row, watch_exists_row},
    },
};

const MOVEMENT_TYPES: [&str; 3] = ["automatic", "manual", "quartz"];
const TIME_SOURCES: [&str; 2] = ["ntp", "device"];

#[derive(Debug, Error, PartialEq)]
pub enum ImportError {
    #[error("Invalid JSON format")]
    InvalidJson,
    #[error("Unsupported version: {found}. Maximum supported: {max}", max = EXPORT_VERSION)]
    UnsupportedVersion { found: Number },
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Keep existing data; skip watches and measurements whose id exists.
    Merge,
    /// Wipe everything first.
    Replace,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub watches_imported: usize,
    pub watches_skipped: usize,
    pub measurements_imported: usize,
    pub measurements_skipped: usize,
}

/// Structural check of an export document. The first problem found is
/// reported, naming the offending watch and measurement index.
pub fn validate_import_data(value: &Value) -> Result<(), ImportError> {
    let invalid = |msg: &str| ImportError::Invalid(msg.to_string());

    let root = value
        .as_object()
        .ok_or_else(|| invalid("Invalid JSON data"))?;

    let version = match root.get("version") {
        Some(Value::Number(n)) => n,
        _ => return Err(invalid("Missing or invalid version field")),
    };
    if version.as_f64().is_some_and(|v| v > EXPORT_VERSION as f64) {
        return Err(ImportError::UnsupportedVersion {
            found: version.clone(),
        });
    }

    if !root.get("exportedAt").is_some_and(Value::is_number) {
        return Err(invalid("Missing or invalid exportedAt field"));
    }

    let data = root
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("Missing or invalid data field"))?;

    let watches = data
        .get("watches")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("Missing or invalid watches array"))?;

    for (i, watch) in watches.iter().enumerate() {
        let watch = validate_watch(watch)
            .map_err(|problem| ImportError::Invalid(format!("Watch {i}: {problem}")))?;

        let measurements = watch
            .get("measurements")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ImportError::Invalid(format!("Watch {i}: Missing or invalid measurements array"))
            })?;

        for (j, measurement) in measurements.iter().enumerate() {
            validate_measurement(measurement).map_err(|problem| {
                ImportError::Invalid(format!("Watch {i}, Measurement {j}: {problem}"))
            })?;
        }
    }

    Ok(())
}

fn validate_watch(value: &Value) -> Result<&Map<String, Value>, String> {
    let watch = value
        .as_object()
        .ok_or_else(|| "Invalid watch object".to_string())?;

    require_id(watch)?;
    if !watch
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.is_empty())
    {
        return Err("Missing or invalid name".into());
    }
    require_enum(watch, "movementType", &MOVEMENT_TYPES)?;
    require_number(watch, "createdAt")?;
    require_number(watch, "updatedAt")?;
    Ok(watch)
}

fn validate_measurement(value: &Value) -> Result<(), String> {
    let measurement = value
        .as_object()
        .ok_or_else(|| "Invalid measurement object".to_string())?;

    require_id(measurement)?;
    require_number(measurement, "watchTime")?;
    require_number(measurement, "deviceTime")?;
    require_number(measurement, "deltaMs")?;
    let integer = |field: &str| measurement.get(field).and_then(Value::as_i64);
    match (integer("watchTime"), integer("deviceTime"), integer("deltaMs")) {
        (Some(watch_time), Some(device_time), Some(delta_ms))
            if device_time.checked_sub(watch_time) == Some(delta_ms) => {}
        _ => return Err("deltaMs does not match deviceTime - watchTime".into()),
    }
    require_enum(measurement, "timeSource", &TIME_SOURCES)?;
    if !measurement.get("isBaseline").is_some_and(Value::is_boolean) {
        return Err("Missing or invalid isBaseline".into());
    }
    require_number(measurement, "createdAt")
}

fn require_id(object: &Map<String, Value>) -> Result<(), String> {
    match object.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(()),
        _ => Err("Missing or invalid id".into()),
    }
}

fn require_number(object: &Map<String, Value>, field: &str) -> Result<(), String> {
    if object.get(field).is_some_and(Value::is_number) {
        Ok(())
    } else {
        Err(format!("Missing or invalid {field}"))
    }
}

fn require_enum(object: &Map<String, Value>, field: &str, allowed: &[&str]) -> Result<(), String> {
    let value = object.get(field);
    match value.and_then(Value::as_str) {
        Some(s) if allowed.contains(&s) => Ok(()),
        Some(s) => Err(format!("Invalid {field}: {s}")),
        None => Err(format!(
            "Invalid {field}: {}",
            value.map_or_else(|| "undefined".to_string(), Value::to_string)
        )),
    }
}

/// Parse and validate an export document.
pub fn parse_import(json: &str) -> Result<ExportData, ImportError> {
    let value: Value = serde_json::from_str(json).map_err(|_| ImportError::InvalidJson)?;
    validate_import_data(&value)?;
    serde_json::from_value(value).map_err(|err| ImportError::Invalid(err.to_string()))
}

impl Database {
    /// Write an export document into the store in one transaction; any
    /// failure leaves the store untouched.
    pub async fn import_data(&self, data: ExportData, mode: ImportMode) -> Result<ImportResult> {
        let result = self
            .execute(move |conn| {
                let tx = conn.transaction()?;
                let mut result = ImportResult::default();

                if mode == ImportMode::Replace {
                    clear_all_rows(&tx)?;
                }

                for exported in data.data.watches {
                    let watch = exported.watch;
                    if mode == ImportMode::Merge && watch_exists_row(&tx, &watch.id)? {
                        result.watches_skipped += 1;
                    } else {
                        insert_watch_row(&tx, &watch)
                            .with_context(|| format!("failed to import watch {}", watch.id))?;
                        result.watches_imported += 1;
                    }

                    for measurement in exported.measurements {
                        if mode == ImportMode::Merge && measurement_exists_row(&tx, &measurement.id)? {
                            result.measurements_skipped += 1;
                            continue;
                        }
                        let measurement = measurement.into_measurement(&watch.id);
                        insert_measurement_row(&tx, &measurement).with_context(|| {
                            format!("failed to import measurement {}", measurement.id)
                        })?;
                        result.measurements_imported += 1;
                    }
                }

                tx.commit()?;
                Ok(result)
            })
            .await?;

        info!(
            "Imported {} watches ({} skipped), {} measurements ({} skipped)",
            result.watches_imported,
            result.watches_skipped,
            result.measurements_imported,
            result.measurements_skipped
        );
        Ok(result)
    }
}
