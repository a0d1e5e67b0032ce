//! Database schema and types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    direction TEXT NOT NULL,
    kind TEXT NOT NULL,
    text TEXT NOT NULL,
    created_at TEXT NOT NULL,
    payload TEXT
);

CREATE INDEX IF NOT EXISTS idx_messages_user ON messages(user_id, created_at, id);
CREATE INDEX IF NOT EXISTS idx_messages_recent ON messages(created_at DESC, id DESC);

CREATE TABLE IF NOT EXISTS overrides (
    user_id TEXT PRIMARY KEY,
    paused BOOLEAN NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS leads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    flow TEXT NOT NULL,
    course TEXT NOT NULL,
    attempt TEXT NOT NULL,
    grp TEXT NOT NULL,
    mode TEXT NOT NULL,
    user_id TEXT NOT NULL,
    profile_name TEXT NOT NULL
);
";

/// Flow name recorded on every lead
pub const COACHING_FLOW: &str = "COACHING_ENQUIRY";

/// Longest preview shown in the conversation list
pub const PREVIEW_CHARS: usize = 160;

/// Which way a message travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => write!(f, "in"),
            Direction::Out => write!(f, "out"),
        }
    }
}

/// Shape of a logged message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    Text,
    #[serde(rename = "choice-buttons")]
    Buttons,
    #[serde(rename = "choice-list")]
    List,
    System,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Text => write!(f, "text"),
            MessageKind::Buttons => write!(f, "choice-buttons"),
            MessageKind::List => write!(f, "choice-list"),
            MessageKind::System => write!(f, "system"),
        }
    }
}

/// A message about to be appended to the audit log.
///
/// Sequence id and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub user_id: String,
    pub direction: Direction,
    pub kind: MessageKind,
    pub text: String,
    pub payload: Option<Value>,
}

impl NewMessage {
    pub fn inbound(user_id: impl Into<String>, kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            direction: Direction::In,
            kind,
            text: text.into(),
            payload: None,
        }
    }

    pub fn outbound(
        user_id: impl Into<String>,
        kind: MessageKind,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            direction: Direction::Out,
            kind,
            text: text.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = (!payload.is_null()).then_some(payload);
        self
    }
}

/// Message record as stored in the audit log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRecord {
    pub sequence_id: i64,
    pub user_id: String,
    pub direction: Direction,
    pub kind: MessageKind,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// One row of the admin conversation list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationSummary {
    pub user_id: String,
    pub last_timestamp: DateTime<Utc>,
    pub preview: String,
    pub paused: bool,
}

/// Captured enquiry, as written to the ledger.
///
/// Missing answers are stored as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub timestamp: DateTime<Utc>,
    pub flow: String,
    pub course: String,
    pub attempt: String,
    pub group: String,
    pub mode: String,
    pub user_id: String,
    pub profile_name: String,
}

/// Cut `text` to at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub(crate) fn parse_direction(s: &str) -> Direction {
    match s {
        "in" => Direction::In,
        _ => Direction::Out,
    }
}

pub(crate) fn parse_message_kind(s: &str) -> MessageKind {
    match s {
        "text" => MessageKind::Text,
        "choice-buttons" => MessageKind::Buttons,
        "choice-list" => MessageKind::List,
        _ => MessageKind::System,
    }
}
