//! Event dispatcher
//!
//! Turns a webhook delivery into inbound messages and routes each to its
//! user's runtime. Messages of one user are handed over in delivery order and
//! one at a time; different users are handled concurrently.

use crate::runtime::{InboundOutcome, RuntimeManager, Storage};
use crate::state_machine::{InboundMessage, InboundPayload};
use crate::transport::Transport;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Tally of one webhook delivery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Messages extracted from the delivery
    pub received: usize,
    pub handled: usize,
    pub paused: usize,
    pub failed: usize,
    /// Changes or messages that could not be understood
    pub ignored: usize,
}

/// Answer the provider's subscription handshake.
///
/// Returns the challenge to echo back, or `None` if verification fails.
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    verify_token: &str,
) -> Option<String> {
    if mode == Some("subscribe") && token == Some(verify_token) {
        Some(challenge.unwrap_or_default().to_string())
    } else {
        None
    }
}

/// Pull inbound messages out of a webhook body.
///
/// Only the first message of each change is considered. Returns the
/// messages and how many changes were skipped as malformed or unsupported.
pub fn extract_messages(body: &Value) -> (Vec<InboundMessage>, usize) {
    let mut messages = Vec::new();
    let mut ignored = 0;

    let changes = body
        .get("entry")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("changes").and_then(Value::as_array))
        .flatten();

    for change in changes {
        let Some(value) = change.get("value") else {
            ignored += 1;
            continue;
        };
        // Status callbacks and other changes without messages
        let Some(first) = value
            .get("messages")
            .and_then(Value::as_array)
            .and_then(|m| m.first())
        else {
            continue;
        };

        let display_name = value
            .get("contacts")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .and_then(|c| c.pointer("/profile/name"))
            .and_then(Value::as_str);

        match parse_message(first, display_name) {
            Some(message) => messages.push(message),
            None => {
                tracing::debug!(message = %first, "Skipping unsupported inbound message");
                ignored += 1;
            }
        }
    }

    (messages, ignored)
}

fn parse_message(message: &Value, display_name: Option<&str>) -> Option<InboundMessage> {
    let user_id = message.get("from").and_then(Value::as_str)?.trim();
    if user_id.is_empty() {
        return None;
    }

    let payload = match message.get("type").and_then(Value::as_str)? {
        "interactive" => {
            let interactive = message.get("interactive")?;
            let reply_type = interactive.get("type").and_then(Value::as_str)?;
            let reply = interactive.get(reply_type)?;
            let id = string_field(reply, "id");
            if id.is_empty() {
                return None;
            }
            let title = string_field(reply, "title");
            match reply_type {
                "button_reply" => InboundPayload::Button { id, title },
                "list_reply" => InboundPayload::List { id, title },
                _ => return None,
            }
        }
        "text" => InboundPayload::Text {
            body: message
                .pointer("/text/body")
                .and_then(Value::as_str)?
                .to_string(),
        },
        _ => return None,
    };

    let mut inbound = InboundMessage::new(user_id, payload).with_raw(message.clone());
    if let Some(name) = display_name.filter(|n| !n.trim().is_empty()) {
        inbound = inbound.with_display_name(name.trim());
    }
    Some(inbound)
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Dispatch one webhook delivery.
///
/// Never fails: problems are logged and counted so the provider always gets
/// its acknowledgment.
pub async fn dispatch<S, T>(runtime: &RuntimeManager<S, T>, body: &[u8]) -> DispatchReport
where
    S: Storage + Clone + 'static,
    T: Transport + Clone + 'static,
{
    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "Webhook body is not JSON");
            return DispatchReport {
                ignored: 1,
                ..DispatchReport::default()
            };
        }
    };

    let (messages, ignored) = extract_messages(&value);
    let mut report = DispatchReport {
        received: messages.len(),
        ignored,
        ..DispatchReport::default()
    };

    let per_user = join_all(group_by_user(messages).into_iter().map(|batch| async move {
        let mut outcomes = Vec::with_capacity(batch.len());
        for message in batch {
            let user_id = message.user_id.clone();
            let result = runtime.submit_inbound(message).await;
            if let Err(e) = &result {
                tracing::error!(user_id = %user_id, error = %e, "Inbound message failed");
            }
            outcomes.push(result);
        }
        outcomes
    }))
    .await;

    for result in per_user.into_iter().flatten() {
        match result {
            Ok(InboundOutcome::Handled { .. }) => report.handled += 1,
            Ok(InboundOutcome::Paused) => report.paused += 1,
            Err(_) => report.failed += 1,
        }
    }

    tracing::debug!(
        received = report.received,
        handled = report.handled,
        paused = report.paused,
        failed = report.failed,
        ignored = report.ignored,
        "Webhook dispatched"
    );
    report
}

/// Split messages into per-user batches, keeping delivery order in each
fn group_by_user(messages: Vec<InboundMessage>) -> Vec<Vec<InboundMessage>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut batches: Vec<Vec<InboundMessage>> = Vec::new();

    for message in messages {
        match index.get(&message.user_id) {
            Some(&i) => batches[i].push(message),
            None => {
                index.insert(message.user_id.clone(), batches.len());
                batches.push(vec![message]);
            }
        }
    }
    batches
}
