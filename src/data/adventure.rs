//! Adventure data access object

use super::bundle::BundleStore;
use super::models::{Adventure, Bundle};
use super::quest::QuestStore;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::Arc;
use uuid::Uuid;

/// Data access object for Adventure operations
///
/// Reads are eager: every adventure comes back with its ordered quests and
/// its bundle.
#[derive(Clone)]
pub struct AdventureStore {
    conn: Arc<Mutex<Connection>>,
}

impl AdventureStore {
    /// Create a new AdventureStore
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Insert a new adventure together with its bundle
    ///
    /// Quests are attached separately with [`AdventureStore::add_quest`].
    pub fn create(&self, adventure: &Adventure) -> SqliteResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO adventures (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                adventure.id.to_string(),
                adventure.name,
                adventure.created_at.to_rfc3339(),
                adventure.updated_at.to_rfc3339(),
            ],
        )?;
        BundleStore::insert(&tx, adventure.id, &adventure.bundle)?;
        tx.commit()
    }

    /// Append a quest to the end of an adventure
    pub fn add_quest(&self, adventure_id: Uuid, quest_id: Uuid) -> SqliteResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO adventure_quests (adventure_id, quest_id, position)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(position) + 1, 0) FROM adventure_quests WHERE adventure_id = ?1))",
            params![adventure_id.to_string(), quest_id.to_string()],
        )?;
        conn.execute(
            "UPDATE adventures SET updated_at = ?2 WHERE id = ?1",
            params![adventure_id.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Get an adventure by ID
    pub fn get_by_id(&self, id: Uuid) -> SqliteResult<Option<Adventure>> {
        let conn = self.conn.lock();
        let adventure = conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM adventures WHERE id = ?1",
                params![id.to_string()],
                Self::row_to_adventure,
            )
            .optional()?;
        adventure.map(|a| Self::load(&conn, a)).transpose()
    }

    /// Get an adventure by name; the oldest wins when names repeat
    pub fn get_by_name(&self, name: &str) -> SqliteResult<Option<Adventure>> {
        let conn = self.conn.lock();
        let adventure = conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM adventures
                 WHERE name = ?1 ORDER BY created_at, rowid LIMIT 1",
                params![name],
                Self::row_to_adventure,
            )
            .optional()?;
        adventure.map(|a| Self::load(&conn, a)).transpose()
    }

    /// Get all adventures in creation order
    pub fn get_all(&self) -> SqliteResult<Vec<Adventure>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, created_at, updated_at FROM adventures ORDER BY created_at, rowid",
        )?;
        let adventures = stmt
            .query_map([], Self::row_to_adventure)?
            .collect::<SqliteResult<Vec<_>>>()?;
        adventures
            .into_iter()
            .map(|a| Self::load(&conn, a))
            .collect()
    }

    /// Delete an adventure with its bundle and quest memberships
    pub fn delete(&self, id: Uuid) -> SqliteResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM adventures WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    /// Fill in quests and bundle
    fn load(conn: &Connection, mut adventure: Adventure) -> SqliteResult<Adventure> {
        adventure.quests = QuestStore::query_by_adventure(conn, adventure.id)?;
        adventure.bundle = match BundleStore::query_by_adventure(conn, adventure.id)? {
            Some(bundle) => bundle,
            None => {
                tracing::warn!(
                    adventure = %adventure.name,
                    "Adventure has no bundle; using an empty one"
                );
                Bundle::default()
            }
        };
        Ok(adventure)
    }

    /// Convert a database row to an Adventure without quests or bundle
    fn row_to_adventure(row: &rusqlite::Row) -> SqliteResult<Adventure> {
        let id_str: String = row.get(0)?;
        let created_at_str: String = row.get(2)?;
        let updated_at_str: String = row.get(3)?;

        Ok(Adventure {
            id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
            name: row.get(1)?,
            quests: Vec::new(),
            bundle: Bundle::default(),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
