use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{from_millis, parse_time_source, to_usize},
    models::Measurement,
};

fn row_to_measurement(row: &Row) -> Result<Measurement> {
    let watch_time: i64 = row.get("watch_time")?;
    let device_time: i64 = row.get("device_time")?;
    let created_at: i64 = row.get("created_at")?;
    let time_source: String = row.get("time_source")?;

    Ok(Measurement {
        id: row.get("id")?,
        watch_id: row.get("watch_id")?,
        watch_time: from_millis(watch_time, "watch_time")?,
        device_time: from_millis(device_time, "device_time")?,
        delta_ms: row.get("delta_ms")?,
        time_source: parse_time_source(&time_source)?,
        is_baseline: row.get("is_baseline")?,
        created_at: from_millis(created_at, "created_at")?,
    })
}

pub(crate) fn insert_measurement_row(conn: &Connection, measurement: &Measurement) -> Result<()> {
    conn.execute(
        "INSERT INTO measurements (id, watch_id, watch_time, device_time, delta_ms, time_source, is_baseline, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            measurement.id,
            measurement.watch_id,
            measurement.watch_time.timestamp_millis(),
            measurement.device_time.timestamp_millis(),
            measurement.delta_ms,
            measurement.time_source.as_str(),
            measurement.is_baseline,
            measurement.created_at.timestamp_millis(),
        ],
    )?;
    Ok(())
}

pub(crate) fn measurement_exists_row(conn: &Connection, measurement_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM measurements WHERE id = ?1",
        params![measurement_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Measurements of one watch, oldest reference time first.
pub(crate) fn list_measurement_rows(conn: &Connection, watch_id: &str) -> Result<Vec<Measurement>> {
    let mut stmt = conn.prepare(
        "SELECT id, watch_id, watch_time, device_time, delta_ms, time_source, is_baseline, created_at
         FROM measurements
         WHERE watch_id = ?1
         ORDER BY device_time ASC, created_at ASC",
    )?;

    let mut rows = stmt.query(params![watch_id])?;
    let mut measurements = Vec::new();
    while let Some(row) = rows.next()? {
        measurements.push(row_to_measurement(row)?);
    }
    Ok(measurements)
}

impl Database {
    pub async fn insert_measurement(&self, measurement: &Measurement) -> Result<()> {
        let record = measurement.clone();
        self.execute(move |conn| insert_measurement_row(conn, &record))
            .await
    }

    pub async fn get_measurements(&self, watch_id: &str) -> Result<Vec<Measurement>> {
        let watch_id = watch_id.to_string();
        self.execute(move |conn| list_measurement_rows(conn, &watch_id))
            .await
    }

    pub async fn get_measurement(&self, measurement_id: &str) -> Result<Option<Measurement>> {
        let measurement_id = measurement_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, watch_id, watch_time, device_time, delta_ms, time_source, is_baseline, created_at
                 FROM measurements
                 WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![measurement_id])?;
            let measurement = match rows.next()? {
                Some(row) => Some(row_to_measurement(row)?),
                None => None,
            };
            Ok(measurement)
        })
        .await
    }

    pub async fn count_measurements(&self, watch_id: &str) -> Result<usize> {
        let watch_id = watch_id.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM measurements WHERE watch_id = ?1",
                params![watch_id],
                |row| row.get(0),
            )?;
            to_usize(count, "count")
        })
        .await
    }

    /// Hard delete. Accuracy is recomputed from what remains, so removing a
    /// baseline hands its epoch back to the previous baseline.
    pub async fn delete_measurement(&self, measurement_id: &str) -> Result<()> {
        let measurement_id = measurement_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM measurements WHERE id = ?1",
                params![measurement_id],
            )?;
            if rows_affected == 0 {
                return Err(anyhow!("Measurement {measurement_id} not found"));
            }
            Ok(())
        })
        .await
    }
}
