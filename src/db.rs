use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::models::Event;
use crate::utils;

/// SQLite cache of the last imported catalog. Row order is catalog order.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        utils::ensure_parent(path);
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS events(
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                uid TEXT NOT NULL UNIQUE,
                payload TEXT NOT NULL,
                first_seen_utc TEXT NOT NULL,
                last_seen_utc TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    pub fn upsert_event(&self, event: &Event) -> rusqlite::Result<()> {
        let now = Utc::now().to_rfc3339();
        let payload = serde_json::to_string(event)
            .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
        self.conn.execute(
            "INSERT INTO events (uid, payload, first_seen_utc, last_seen_utc)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(uid) DO UPDATE SET
               payload = excluded.payload,
               last_seen_utc = excluded.last_seen_utc",
            params![event.uid, payload, now],
        )?;
        Ok(())
    }

    /// Swaps the cached catalog for `events` in one transaction. A repeated
    /// uid keeps its first row; returns the number of rows stored.
    pub fn replace_catalog(&mut self, events: &[Event]) -> rusqlite::Result<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM events", [])?;
        let mut stored = 0;
        {
            let mut seen = HashSet::new();
            let mut stmt = tx.prepare(
                "INSERT INTO events (uid, payload, first_seen_utc, last_seen_utc)
                 VALUES (?1, ?2, ?3, ?3)",
            )?;
            for event in events {
                if !seen.insert(event.uid.as_str()) {
                    tracing::warn!(uid = %event.uid, "skipping repeated uid in catalog");
                    continue;
                }
                let payload = serde_json::to_string(event)
                    .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
                stored += stmt.execute(params![event.uid, payload, now])?;
            }
        }
        tx.commit()?;
        tracing::info!(events = stored, skipped = events.len() - stored, "replaced cached catalog");
        Ok(stored)
    }

    pub fn list_events(&self) -> rusqlite::Result<Vec<Event>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM events ORDER BY seq")?;
        let rows = stmt.query_map([], |row| {
            let payload: String = row.get(0)?;
            decode_event(payload)
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_event(&self, uid: &str) -> rusqlite::Result<Event> {
        let payload: String = self.conn.query_row(
            "SELECT payload FROM events WHERE uid = ?1",
            params![uid],
            |row| row.get(0),
        )?;
        decode_event(payload)
    }

    pub fn count_events(&self) -> rusqlite::Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn decode_event(payload: String) -> rusqlite::Result<Event> {
    serde_json::from_str(&payload).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(
            payload.len(),
            rusqlite::types::Type::Text,
            Box::new(err),
        )
    })
}
