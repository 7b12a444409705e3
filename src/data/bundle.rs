//! Bundle data access object

use super::models::Bundle;
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::Arc;
use uuid::Uuid;

/// Data access object for Bundle operations
#[derive(Clone)]
pub struct BundleStore {
    conn: Arc<Mutex<Connection>>,
}

impl BundleStore {
    /// Create a new BundleStore
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Attach a bundle to an adventure, replacing any bundle it had
    pub fn create(&self, adventure_id: Uuid, bundle: &Bundle) -> SqliteResult<()> {
        let conn = self.conn.lock();
        Self::insert(&conn, adventure_id, bundle)
    }

    /// Persist a bundle's version and items
    ///
    /// Fails with `QueryReturnedNoRows` when the bundle was never created.
    pub fn update(&self, bundle: &Bundle) -> SqliteResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE bundles SET version = ?2, items = ?3 WHERE id = ?1",
            params![bundle.id.to_string(), bundle.version, items_to_json(bundle)?],
        )?;
        if changed == 0 {
            return Err(rusqlite::Error::QueryReturnedNoRows);
        }
        Ok(())
    }

    /// Get the bundle of an adventure
    pub fn get_by_adventure(&self, adventure_id: Uuid) -> SqliteResult<Option<Bundle>> {
        let conn = self.conn.lock();
        Self::query_by_adventure(&conn, adventure_id)
    }

    pub(super) fn insert(
        conn: &Connection,
        adventure_id: Uuid,
        bundle: &Bundle,
    ) -> SqliteResult<()> {
        conn.execute(
            "INSERT INTO bundles (id, adventure_id, version, items)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(adventure_id) DO UPDATE SET id = ?1, version = ?3, items = ?4",
            params![
                bundle.id.to_string(),
                adventure_id.to_string(),
                bundle.version,
                items_to_json(bundle)?,
            ],
        )?;
        Ok(())
    }

    pub(super) fn query_by_adventure(
        conn: &Connection,
        adventure_id: Uuid,
    ) -> SqliteResult<Option<Bundle>> {
        conn.query_row(
            "SELECT id, version, items FROM bundles WHERE adventure_id = ?1",
            params![adventure_id.to_string()],
            Self::row_to_bundle,
        )
        .optional()
    }

    /// Convert a database row to a Bundle
    fn row_to_bundle(row: &rusqlite::Row) -> SqliteResult<Bundle> {
        let id_str: String = row.get(0)?;
        let items_json: String = row.get(2)?;
        let items = serde_json::from_str(&items_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

        Ok(Bundle {
            id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
            version: row.get(1)?,
            items,
        })
    }
}

fn items_to_json(bundle: &Bundle) -> SqliteResult<String> {
    serde_json::to_string(&bundle.items)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}
