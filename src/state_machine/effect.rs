//! Effects produced by state transitions

use super::state::{Attempt, Course, Group, Mode};
use serde::{Deserialize, Serialize};

/// One selectable option of a button or list message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub title: String,
}

impl ChoiceOption {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Answers of a completed enquiry, ready to be written to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadCapture {
    pub course: Course,
    pub attempt: Attempt,
    pub group: Option<Group>,
    pub mode: Mode,
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a plain text message
    SendText { text: String },

    /// Send up to three reply buttons
    SendButtons {
        body: String,
        options: Vec<ChoiceOption>,
    },

    /// Send a selectable list
    SendList {
        header: String,
        body: String,
        rows: Vec<ChoiceOption>,
    },

    /// Append a lead to the enquiry ledger
    RecordLead(LeadCapture),
}

impl Effect {
    pub fn text(text: impl Into<String>) -> Self {
        Effect::SendText { text: text.into() }
    }

    pub fn buttons(body: impl Into<String>, options: Vec<ChoiceOption>) -> Self {
        Effect::SendButtons {
            body: body.into(),
            options,
        }
    }

    pub fn list(
        header: impl Into<String>,
        body: impl Into<String>,
        rows: Vec<ChoiceOption>,
    ) -> Self {
        Effect::SendList {
            header: header.into(),
            body: body.into(),
            rows,
        }
    }

    /// Whether executing this effect sends something to the user
    pub fn is_outbound(&self) -> bool {
        !matches!(self, Effect::RecordLead(_))
    }
}
