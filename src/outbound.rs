//! Outbound sender
//!
//! Renders logical replies, hands them to the transport under a timeout and
//! records every attempt in the audit log. A logged message proves the send
//! was attempted, not that it arrived.

use crate::db::{truncate_chars, MessageKind, NewMessage};
use crate::runtime::{MessageLog, RuntimeError};
use crate::state_machine::{ChoiceOption, Effect};
use crate::transport::Transport;
use serde::Serialize;
use std::time::Duration;

/// Reply buttons allowed per message
pub const MAX_BUTTONS: usize = 3;
pub const BUTTON_TITLE_CHARS: usize = 20;
pub const LIST_ROW_CHARS: usize = 24;

/// A reply in the shapes the provider accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Text {
        body: String,
    },
    Buttons {
        body: String,
        options: Vec<ChoiceOption>,
    },
    List {
        header: String,
        body: String,
        rows: Vec<ChoiceOption>,
    },
}

impl OutboundMessage {
    pub fn text(body: impl Into<String>) -> Self {
        OutboundMessage::Text { body: body.into() }
    }

    /// Button message, keeping the first three options with shortened titles
    pub fn buttons(body: impl Into<String>, options: Vec<ChoiceOption>) -> Self {
        let options = options
            .into_iter()
            .take(MAX_BUTTONS)
            .map(|o| ChoiceOption {
                title: truncate_chars(&o.title, BUTTON_TITLE_CHARS),
                id: o.id,
            })
            .collect();
        OutboundMessage::Buttons {
            body: body.into(),
            options,
        }
    }

    pub fn list(
        header: impl Into<String>,
        body: impl Into<String>,
        rows: Vec<ChoiceOption>,
    ) -> Self {
        let rows = rows
            .into_iter()
            .map(|r| ChoiceOption {
                title: truncate_chars(&r.title, LIST_ROW_CHARS),
                id: r.id,
            })
            .collect();
        OutboundMessage::List {
            header: header.into(),
            body: body.into(),
            rows,
        }
    }

    /// Render a send effect; `None` for effects that send nothing
    pub fn from_effect(effect: &Effect) -> Option<Self> {
        match effect {
            Effect::SendText { text } => Some(Self::text(text.clone())),
            Effect::SendButtons { body, options } => {
                Some(Self::buttons(body.clone(), options.clone()))
            }
            Effect::SendList { header, body, rows } => {
                Some(Self::list(header.clone(), body.clone(), rows.clone()))
            }
            Effect::RecordLead(_) => None,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            OutboundMessage::Text { .. } => MessageKind::Text,
            OutboundMessage::Buttons { .. } => MessageKind::Buttons,
            OutboundMessage::List { .. } => MessageKind::List,
        }
    }

    /// Line shown to the human operator in the audit log
    pub fn log_text(&self) -> String {
        fn labels(options: &[ChoiceOption]) -> String {
            options
                .iter()
                .map(|o| o.title.as_str())
                .collect::<Vec<_>>()
                .join(" | ")
        }

        match self {
            OutboundMessage::Text { body } => body.clone(),
            OutboundMessage::Buttons { body, options } => {
                format!("[Buttons] {body}  :: {}", labels(options))
            }
            OutboundMessage::List { header, body, rows } => {
                format!("[List] {header} — {body}  :: {}", labels(rows))
            }
        }
    }
}

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SendOutcome {
    Delivered,
    Failed(String),
    TimedOut,
}

/// Sends through a transport and records each attempt
#[derive(Clone)]
pub struct OutboundSender<S, T> {
    log: S,
    transport: T,
    timeout: Duration,
}

impl<S: MessageLog, T: Transport> OutboundSender<S, T> {
    pub fn new(log: S, transport: T, timeout: Duration) -> Self {
        Self {
            log,
            transport,
            timeout,
        }
    }

    /// Deliver one message.
    ///
    /// Transport problems come back as a [`SendOutcome`]; only a failure to
    /// write the audit record is an error.
    pub async fn send(
        &self,
        to: &str,
        message: OutboundMessage,
    ) -> Result<SendOutcome, RuntimeError> {
        let outcome = match tokio::time::timeout(self.timeout, self.transport.deliver(to, &message))
            .await
        {
            Ok(Ok(())) => SendOutcome::Delivered,
            Ok(Err(e)) => {
                tracing::warn!(user_id = %to, error = %e, "Outbound delivery failed");
                SendOutcome::Failed(e.to_string())
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %to,
                    timeout_secs = self.timeout.as_secs(),
                    "Outbound delivery timed out"
                );
                SendOutcome::TimedOut
            }
        };

        let payload = serde_json::to_value(&message).unwrap_or_default();
        let record = NewMessage::outbound(to, message.kind(), message.log_text())
            .with_payload(payload);
        self.log.append(record).await.map_err(RuntimeError::Storage)?;

        Ok(outcome)
    }

    pub async fn send_text(&self, to: &str, text: &str) -> Result<SendOutcome, RuntimeError> {
        self.send(to, OutboundMessage::text(text)).await
    }

    #[allow(dead_code)] // Used in tests
    pub async fn send_buttons(
        &self,
        to: &str,
        body: &str,
        options: Vec<ChoiceOption>,
    ) -> Result<SendOutcome, RuntimeError> {
        self.send(to, OutboundMessage::buttons(body, options)).await
    }

    #[allow(dead_code)] // Used in tests
    pub async fn send_list(
        &self,
        to: &str,
        header: &str,
        body: &str,
        rows: Vec<ChoiceOption>,
    ) -> Result<SendOutcome, RuntimeError> {
        self.send(to, OutboundMessage::list(header, body, rows))
            .await
    }
}
