//! API request and response types

use crate::db::{ConversationSummary, LeadRecord, MessageRecord};
use crate::outbound::SendOutcome;
use crate::state_machine::ConvState;
use serde::{Deserialize, Serialize};

/// Query of the webhook subscription handshake
#[derive(Debug, Deserialize)]
pub struct SubscriptionQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// `?limit=N` on list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// Request to pause or resume automated replies
#[derive(Debug, Deserialize)]
pub struct PauseRequest {
    pub paused: bool,
}

/// Operator-written reply
#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub text: String,
}

/// Response with a list of conversations
#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummary>,
}

/// Response with one conversation and its full log
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub user_id: String,
    pub stage: &'static str,
    pub state: ConvState,
    pub paused: bool,
    pub messages: Vec<MessageRecord>,
}

#[derive(Debug, Serialize)]
pub struct PauseResponse {
    pub user_id: String,
    pub paused: bool,
}

/// Response for an operator reply
#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub outcome: SendOutcome,
}

#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    pub leads: Vec<LeadRecord>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
