//! Quest data access object

use super::models::Quest;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

const SELECT_QUEST: &str =
    "SELECT q.id, q.name, q.url, q.method, q.data, q.headers, q.spell, q.created_at, q.updated_at
     FROM quests q";

/// Data access object for Quest operations
#[derive(Clone)]
pub struct QuestStore {
    conn: Arc<Mutex<Connection>>,
}

impl QuestStore {
    /// Create a new QuestStore
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Insert a new quest
    pub fn create(&self, quest: &Quest) -> SqliteResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO quests (id, name, url, method, data, headers, spell, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                quest.id.to_string(),
                quest.name,
                quest.url,
                quest.method,
                map_to_json(quest.data.as_ref())?,
                map_to_json(quest.headers.as_ref())?,
                quest.spell,
                quest.created_at.to_rfc3339(),
                quest.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Update every field of a quest
    pub fn update(&self, quest: &Quest) -> SqliteResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE quests SET name = ?2, url = ?3, method = ?4, data = ?5, headers = ?6, spell = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                quest.id.to_string(),
                quest.name,
                quest.url,
                quest.method,
                map_to_json(quest.data.as_ref())?,
                map_to_json(quest.headers.as_ref())?,
                quest.spell,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete a quest (cascades to adventure membership)
    pub fn delete(&self, id: Uuid) -> SqliteResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM quests WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    /// Get a quest by ID
    pub fn get_by_id(&self, id: Uuid) -> SqliteResult<Option<Quest>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("{SELECT_QUEST} WHERE q.id = ?1"),
            params![id.to_string()],
            Self::row_to_quest,
        )
        .optional()
    }

    /// Get all quests across adventures
    pub fn get_all(&self) -> SqliteResult<Vec<Quest>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{SELECT_QUEST} ORDER BY q.name, q.created_at"))?;
        let quests = stmt
            .query_map([], Self::row_to_quest)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(quests)
    }

    /// Get the quests of an adventure in order
    pub fn get_by_adventure(&self, adventure_id: Uuid) -> SqliteResult<Vec<Quest>> {
        let conn = self.conn.lock();
        Self::query_by_adventure(&conn, adventure_id)
    }

    /// Get a quest of an adventure by name; the earliest added wins
    pub fn get_by_name(&self, adventure_id: Uuid, name: &str) -> SqliteResult<Option<Quest>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "{SELECT_QUEST} INNER JOIN adventure_quests aq ON q.id = aq.quest_id
                 WHERE aq.adventure_id = ?1 AND q.name = ?2
                 ORDER BY aq.position LIMIT 1"
            ),
            params![adventure_id.to_string(), name],
            Self::row_to_quest,
        )
        .optional()
    }

    /// Ordered quests of an adventure on an already-locked connection
    pub(super) fn query_by_adventure(
        conn: &Connection,
        adventure_id: Uuid,
    ) -> SqliteResult<Vec<Quest>> {
        let mut stmt = conn.prepare(&format!(
            "{SELECT_QUEST} INNER JOIN adventure_quests aq ON q.id = aq.quest_id
             WHERE aq.adventure_id = ?1 ORDER BY aq.position"
        ))?;
        let quests = stmt
            .query_map(params![adventure_id.to_string()], Self::row_to_quest)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(quests)
    }

    /// Convert a database row to a Quest
    fn row_to_quest(row: &rusqlite::Row) -> SqliteResult<Quest> {
        let id_str: String = row.get(0)?;
        let data: Option<String> = row.get(4)?;
        let headers: Option<String> = row.get(5)?;
        let created_at_str: String = row.get(7)?;
        let updated_at_str: String = row.get(8)?;

        Ok(Quest {
            id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
            name: row.get(1)?,
            url: row.get(2)?,
            method: row.get(3)?,
            data: map_from_json(4, data)?,
            headers: map_from_json(5, headers)?,
            spell: row.get(6)?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

fn map_to_json(map: Option<&BTreeMap<String, String>>) -> SqliteResult<Option<String>> {
    map.map(serde_json::to_string)
        .transpose()
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn map_from_json(
    column: usize,
    raw: Option<String>,
) -> SqliteResult<Option<BTreeMap<String, String>>> {
    raw.map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}
