use anyhow::{Context, Result};
use chrono::{SubsecRound, Utc};

use super::{ExportBody, ExportData, ExportedMeasurement, ExportedWatch, EXPORT_VERSION};
use crate::db::{
    connection::Database,
    repositories::{measurements::list_measurement_rows, watches::list_watch_rows},
};

impl Database {
    /// Every watch with its measurements, read in a single pass on the
    /// worker thread so the snapshot is consistent.
    pub async fn export_all(&self) -> Result<ExportData> {
        let watches = self
            .execute(|conn| {
                list_watch_rows(conn)?
                    .into_iter()
                    .map(|watch| -> Result<ExportedWatch> {
                        let measurements = list_measurement_rows(conn, &watch.id)?
                            .iter()
                            .map(ExportedMeasurement::from)
                            .collect();
                        Ok(ExportedWatch {
                            watch,
                            measurements,
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .await?;

        Ok(ExportData {
            version: EXPORT_VERSION,
            exported_at: Utc::now().trunc_subsecs(3),
            data: ExportBody { watches },
        })
    }
}

/// Pretty-printed export document.
pub fn to_json(data: &ExportData) -> Result<String> {
    serde_json::to_string_pretty(data).context("failed to serialise export")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Measurement, MovementType, NewWatch, TimeSource};
    use chrono::{DateTime, Duration};
    use serde_json::Value;
    use tempfile::TempDir;

    #[tokio::test]
    async fn exports_watches_with_measurements() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("test.sqlite3")).unwrap();
        let watch = db
            .insert_watch(NewWatch {
                name: "Seamaster".into(),
                brand: Some("Omega".into()),
                model: None,
                movement_type: MovementType::Automatic,
            })
            .await
            .unwrap();

        let device_time = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let baseline = Measurement::capture(
            &watch.id,
            device_time - Duration::milliseconds(1200),
            device_time,
            TimeSource::Ntp,
            true,
        );
        db.insert_measurement(&baseline).await.unwrap();

        let export = db.export_all().await.unwrap();
        assert_eq!(export.version, 1);
        assert_eq!(export.data.watches.len(), 1);
        assert_eq!(export.data.watches[0].watch, watch);
        assert_eq!(
            export.data.watches[0].measurements[0].clone().into_measurement(&watch.id),
            baseline
        );

        let json: Value = serde_json::from_str(&to_json(&export).unwrap()).unwrap();
        let exported = &json["data"]["watches"][0];
        assert_eq!(exported["name"], "Seamaster");
        assert_eq!(exported["movementType"], "automatic");
        assert_eq!(exported["model"], Value::Null);
        assert!(exported["createdAt"].is_i64());
        let m = &exported["measurements"][0];
        assert_eq!(m["deltaMs"], 1200);
        assert_eq!(m["deviceTime"], 1_700_000_000_000i64);
        assert_eq!(m["timeSource"], "ntp");
        assert_eq!(m["isBaseline"], true);
        assert!(m.get("watchId").is_none());
    }

    #[tokio::test]
    async fn empty_library_exports_empty_list() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("test.sqlite3")).unwrap();
        let export = db.export_all().await.unwrap();
        assert!(export.data.watches.is_empty());
    }
}
