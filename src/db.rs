//! Database module
//!
//! Provides persistence for the audit log, override flags and the enquiry
//! ledger.

mod schema;

pub use schema::*;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Audit Log ====================

    /// Append a message; the only write path of the audit log
    pub fn append_message(&self, message: &NewMessage) -> DbResult<MessageRecord> {
        let conn = self.conn()?;
        let now = Utc::now();
        let payload_str = message.payload.as_ref().map(serde_json::Value::to_string);

        conn.execute(
            "INSERT INTO messages (user_id, direction, kind, text, created_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.user_id,
                message.direction.to_string(),
                message.kind.to_string(),
                message.text,
                format_timestamp(&now),
                payload_str,
            ],
        )?;

        Ok(MessageRecord {
            sequence_id: conn.last_insert_rowid(),
            user_id: message.user_id.clone(),
            direction: message.direction,
            kind: message.kind,
            text: message.text.clone(),
            created_at: now,
            payload: message.payload.clone(),
        })
    }

    /// All messages of one user, oldest first
    pub fn get_messages(&self, user_id: &str) -> DbResult<Vec<MessageRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, direction, kind, text, created_at, payload
             FROM messages WHERE user_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![user_id], parse_message_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Most recently active users, each with a preview of their latest message
    pub fn list_conversations(&self, limit: usize) -> DbResult<Vec<ConversationSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT m.user_id, m.created_at, m.text, COALESCE(o.paused, 0)
             FROM messages m
             LEFT JOIN overrides o ON o.user_id = m.user_id
             WHERE m.id = (
                 SELECT latest.id FROM messages latest
                 WHERE latest.user_id = m.user_id
                 ORDER BY latest.created_at DESC, latest.id DESC
                 LIMIT 1
             )
             ORDER BY m.created_at DESC, m.id DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![sql_limit(limit)], |row| {
            let text: String = row.get(2)?;
            Ok(ConversationSummary {
                user_id: row.get(0)?,
                last_timestamp: parse_datetime(&row.get::<_, String>(1)?),
                preview: truncate_chars(&text, PREVIEW_CHARS),
                paused: row.get(3)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    // ==================== Overrides ====================

    /// Paused flag of a user; users never toggled are running
    #[allow(dead_code)] // Used in tests
    pub fn is_paused(&self, user_id: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let paused = conn
            .query_row(
                "SELECT paused FROM overrides WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, bool>(0),
            )
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(false),
                other => Err(other),
            })?;
        Ok(paused)
    }

    pub fn set_paused(&self, user_id: &str, paused: bool) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO overrides (user_id, paused, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET paused = excluded.paused, updated_at = excluded.updated_at",
            params![user_id, paused, format_timestamp(&Utc::now())],
        )?;
        Ok(())
    }

    /// Every stored override flag
    pub fn list_overrides(&self) -> DbResult<HashMap<String, bool>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT user_id, paused FROM overrides")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<HashMap<_, _>, _>>()
            .map_err(DbError::from)
    }

    // ==================== Enquiry Ledger ====================

    pub fn append_lead(&self, lead: &LeadRecord) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO leads (created_at, flow, course, attempt, grp, mode, user_id, profile_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                format_timestamp(&lead.timestamp),
                lead.flow,
                lead.course,
                lead.attempt,
                lead.group,
                lead.mode,
                lead.user_id,
                lead.profile_name,
            ],
        )?;
        Ok(())
    }

    /// Latest leads first
    pub fn recent_leads(&self, limit: usize) -> DbResult<Vec<LeadRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT created_at, flow, course, attempt, grp, mode, user_id, profile_name
             FROM leads ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![sql_limit(limit)], |row| {
            Ok(LeadRecord {
                timestamp: parse_datetime(&row.get::<_, String>(0)?),
                flow: row.get(1)?,
                course: row.get(2)?,
                attempt: row.get(3)?,
                group: row.get(4)?,
                mode: row.get(5)?,
                user_id: row.get(6)?,
                profile_name: row.get(7)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

/// Parse a message row from the database
fn parse_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        sequence_id: row.get(0)?,
        user_id: row.get(1)?,
        direction: parse_direction(&row.get::<_, String>(2)?),
        kind: parse_message_kind(&row.get::<_, String>(3)?),
        text: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        payload: row
            .get::<_, Option<String>>(6)?
            .and_then(|s| serde_json::from_str(&s).ok()),
    })
}

/// Fixed-width UTC timestamps so that text order is time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
