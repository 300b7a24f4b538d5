use anyhow::{anyhow, Result};
use chrono::{SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{from_millis, parse_movement_type},
    models::{NewWatch, Watch, WatchUpdate},
};

fn row_to_watch(row: &Row) -> Result<Watch> {
    let movement_type: String = row.get("movement_type")?;
    let created_at: i64 = row.get("created_at")?;
    let updated_at: i64 = row.get("updated_at")?;

    Ok(Watch {
        id: row.get("id")?,
        name: row.get("name")?,
        brand: row.get("brand")?,
        model: row.get("model")?,
        movement_type: parse_movement_type(&movement_type)?,
        created_at: from_millis(created_at, "created_at")?,
        updated_at: from_millis(updated_at, "updated_at")?,
    })
}

pub(crate) fn insert_watch_row(conn: &Connection, watch: &Watch) -> Result<()> {
    conn.execute(
        "INSERT INTO watches (id, name, brand, model, movement_type, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            watch.id,
            watch.name,
            watch.brand,
            watch.model,
            watch.movement_type.as_str(),
            watch.created_at.timestamp_millis(),
            watch.updated_at.timestamp_millis(),
        ],
    )?;
    Ok(())
}

pub(crate) fn watch_exists_row(conn: &Connection, watch_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM watches WHERE id = ?1",
        params![watch_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn get_watch_row(conn: &Connection, watch_id: &str) -> Result<Option<Watch>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, brand, model, movement_type, created_at, updated_at
         FROM watches
         WHERE id = ?1",
    )?;
    let mut rows = stmt.query(params![watch_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_watch(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn list_watch_rows(conn: &Connection) -> Result<Vec<Watch>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, brand, model, movement_type, created_at, updated_at
         FROM watches
         ORDER BY created_at DESC",
    )?;

    let mut rows = stmt.query([])?;
    let mut watches = Vec::new();
    while let Some(row) = rows.next()? {
        watches.push(row_to_watch(row)?);
    }
    Ok(watches)
}

/// Remove every watch and measurement.
pub(crate) fn clear_all_rows(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM measurements", [])?;
    conn.execute("DELETE FROM watches", [])?;
    Ok(())
}

impl Database {
    pub async fn insert_watch(&self, input: NewWatch) -> Result<Watch> {
        let now = Utc::now().trunc_subsecs(3);
        let watch = Watch {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            brand: input.brand,
            model: input.model,
            movement_type: input.movement_type,
            created_at: now,
            updated_at: now,
        };

        let record = watch.clone();
        self.execute(move |conn| insert_watch_row(conn, &record)).await?;
        Ok(watch)
    }

    pub async fn get_watch(&self, watch_id: &str) -> Result<Option<Watch>> {
        let watch_id = watch_id.to_string();
        self.execute(move |conn| get_watch_row(conn, &watch_id)).await
    }

    pub async fn list_watches(&self) -> Result<Vec<Watch>> {
        self.execute(|conn| list_watch_rows(conn)).await
    }

    pub async fn watch_exists(&self, watch_id: &str) -> Result<bool> {
        let watch_id = watch_id.to_string();
        self.execute(move |conn| watch_exists_row(conn, &watch_id)).await
    }

    /// Apply a partial update and bump `updated_at`. An empty update leaves
    /// the row as is.
    pub async fn update_watch(&self, watch_id: &str, update: WatchUpdate) -> Result<Watch> {
        let watch_id = watch_id.to_string();
        self.execute(move |conn| {
            if !update.is_empty() {
                let mut updates = Vec::new();
                let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

                if let Some(name) = update.name {
                    updates.push("name = ?");
                    params_vec.push(Box::new(name));
                }
                if let Some(brand) = update.brand {
                    updates.push("brand = ?");
                    params_vec.push(Box::new(brand));
                }
                if let Some(model) = update.model {
                    updates.push("model = ?");
                    params_vec.push(Box::new(model));
                }
                if let Some(movement_type) = update.movement_type {
                    updates.push("movement_type = ?");
                    params_vec.push(Box::new(movement_type.as_str()));
                }

                updates.push("updated_at = ?");
                params_vec.push(Box::new(Utc::now().timestamp_millis()));
                params_vec.push(Box::new(watch_id.clone()));

                let query = format!("UPDATE watches SET {} WHERE id = ?", updates.join(", "));
                let params_refs: Vec<&dyn rusqlite::ToSql> =
                    params_vec.iter().map(|b| b.as_ref()).collect();

                let rows_affected = conn.execute(&query, params_refs.as_slice())?;
                if rows_affected == 0 {
                    return Err(anyhow!("Watch {watch_id} not found"));
                }
            }

            get_watch_row(conn, &watch_id)?.ok_or_else(|| anyhow!("Watch {watch_id} not found"))
        })
        .await
    }

    /// Delete a watch. Its measurements go with it (ON DELETE CASCADE).
    pub async fn delete_watch(&self, watch_id: &str) -> Result<()> {
        let watch_id = watch_id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM watches WHERE id = ?1", params![watch_id])?;
            if rows_affected == 0 {
                return Err(anyhow!("Watch {watch_id} not found"));
            }
            Ok(())
        })
        .await
    }

    pub async fn clear_all_data(&self) -> Result<()> {
        self.execute(|conn| {
            let tx = conn.transaction()?;
            clear_all_rows(&tx)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Name lookup used by the CLI to accept a watch name instead of an id.
    pub async fn find_watch_by_name(&self, name: &str) -> Result<Option<Watch>> {
        let name = name.to_string();
        self.execute(move |conn| {
            let id: Option<String> = conn
                .query_row(
                    "SELECT id FROM watches WHERE name = ?1 COLLATE NOCASE
                     ORDER BY created_at DESC LIMIT 1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;
            match id {
                Some(id) => get_watch_row(conn, &id),
                None => Ok(None),
            }
        })
        .await
    }
}
