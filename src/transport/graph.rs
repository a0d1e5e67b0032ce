//! WhatsApp Cloud API transport

use super::{Transport, TransportError};
use crate::content::INSTITUTE_NAME;
use crate::outbound::OutboundMessage;
use async_trait::async_trait;
use serde_json::{json, Value};

const LIST_BUTTON: &str = "Open Menu";
const LIST_SECTION_TITLE: &str = "Options";

/// Posts messages to the Graph API `/messages` endpoint of one phone number
pub struct GraphTransport {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl GraphTransport {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl Transport for GraphTransport {
    async fn deliver(&self, to: &str, message: &OutboundMessage) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&graph_payload(to, message))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "Graph API error response");
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Cloud API request body for one message
pub fn graph_payload(to: &str, message: &OutboundMessage) -> Value {
    match message {
        OutboundMessage::Text { body } => json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": body },
        }),
        OutboundMessage::Buttons { body, options } => {
            let buttons: Vec<Value> = options
                .iter()
                .map(|o| json!({ "type": "reply", "reply": { "id": o.id, "title": o.title } }))
                .collect();
            json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "interactive",
                "interactive": {
                    "type": "button",
                    "body": { "text": body },
                    "action": { "buttons": buttons },
                },
            })
        }
        OutboundMessage::List { header, body, rows } => {
            let rows: Vec<Value> = rows
                .iter()
                .map(|r| json!({ "id": r.id, "title": r.title }))
                .collect();
            json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "interactive",
                "interactive": {
                    "type": "list",
                    "header": { "type": "text", "text": header },
                    "body": { "text": body },
                    "footer": { "text": INSTITUTE_NAME },
                    "action": {
                        "button": LIST_BUTTON,
                        "sections": [{ "title": LIST_SECTION_TITLE, "rows": rows }],
                    },
                },
            })
        }
    }
}
