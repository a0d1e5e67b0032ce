//! Events that can occur in a conversation

use super::state::{Attempt, Course, Group, InfoTopic, Mode};
use crate::db::MessageKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const KNOW_CHOICE_ID: &str = "KNOW";
pub const COACH_CHOICE_ID: &str = "COACH";

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Top menu
    Know,
    Coach,

    // Coaching enquiry
    CourseChosen(Course),
    AttemptChosen(Attempt),
    GroupChosen(Group),
    ModeChosen(Mode),

    // Informational list
    InfoChosen(InfoTopic),

    /// A tapped option whose id is not in the catalog
    UnknownChoice { id: String },

    /// Free text typed by the user
    Text { body: String },
}

impl Event {
    /// Map a button or list-row id onto a typed event
    pub fn from_choice_id(id: &str) -> Self {
        let id = id.trim();
        match id {
            KNOW_CHOICE_ID => return Event::Know,
            COACH_CHOICE_ID => return Event::Coach,
            _ => {}
        }
        if let Some(course) = Course::from_choice_id(id) {
            Event::CourseChosen(course)
        } else if let Some(attempt) = Attempt::from_choice_id(id) {
            Event::AttemptChosen(attempt)
        } else if let Some(group) = Group::from_choice_id(id) {
            Event::GroupChosen(group)
        } else if let Some(mode) = Mode::from_choice_id(id) {
            Event::ModeChosen(mode)
        } else if let Some(topic) = InfoTopic::from_choice_id(id) {
            Event::InfoChosen(topic)
        } else {
            Event::UnknownChoice { id: id.to_string() }
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Event::Text { body: body.into() }
    }
}

/// What the user sent, reduced to the shapes the flow understands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundPayload {
    /// Tap on a reply button
    Button { id: String, title: String },
    /// Selection of a list row
    List { id: String, title: String },
    Text { body: String },
}

/// One inbound message extracted from a webhook delivery
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub user_id: String,
    /// Sender profile name, used only to enrich lead records
    pub display_name: Option<String>,
    pub payload: InboundPayload,
    /// Message object exactly as delivered, kept for diagnostics
    pub raw: Value,
}

impl InboundMessage {
    pub fn new(user_id: impl Into<String>, payload: InboundPayload) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            payload,
            raw: Value::Null,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    pub fn event(&self) -> Event {
        match &self.payload {
            InboundPayload::Button { id, .. } | InboundPayload::List { id, .. } => {
                Event::from_choice_id(id)
            }
            InboundPayload::Text { body } => Event::text(body.trim()),
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self.payload {
            InboundPayload::Button { .. } => MessageKind::Buttons,
            InboundPayload::List { .. } => MessageKind::List,
            InboundPayload::Text { .. } => MessageKind::Text,
        }
    }

    /// Line shown to the human operator in the audit log
    pub fn display_text(&self) -> String {
        match &self.payload {
            InboundPayload::Button { id, title } => format!("[User tapped] {title} ({id})"),
            InboundPayload::List { id, title } => format!("[User chose] {title} ({id})"),
            InboundPayload::Text { body } => body.trim().to_string(),
        }
    }
}
