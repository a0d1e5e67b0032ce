//! HTTP request handlers

use super::types::{
    ConversationListResponse, ConversationResponse, ErrorResponse, LeadListResponse, ListQuery,
    PauseRequest, PauseResponse, ReplyRequest, ReplyResponse, SubscriptionQuery,
};
use super::AppState;
use crate::dispatch::{dispatch, verify_subscription, DispatchReport};
use crate::runtime::RuntimeError;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 500;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Provider webhook
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        // Operator console
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversations/:user_id", get(get_conversation))
        .route("/api/conversations/:user_id/pause", post(set_paused))
        .route("/api/conversations/:user_id/reply", post(send_reply))
        .route("/api/leads", get(list_leads))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Webhook
// ============================================================

async fn verify_webhook(
    State(state): State<AppState>,
    Query(query): Query<SubscriptionQuery>,
) -> Response {
    match verify_subscription(
        query.mode.as_deref(),
        query.verify_token.as_deref(),
        query.challenge.as_deref(),
        &state.verify_token,
    ) {
        Some(challenge) => {
            tracing::info!("Webhook subscription verified");
            (StatusCode::OK, challenge).into_response()
        }
        None => {
            tracing::warn!(mode = ?query.mode, "Webhook verification failed");
            (StatusCode::FORBIDDEN, "Verification failed").into_response()
        }
    }
}

/// Always acknowledged, so the provider does not redeliver. Each send is
/// bounded by `BOT_SEND_TIMEOUT_SECS`.
async fn receive_webhook(State(state): State<AppState>, body: Bytes) -> Json<DispatchReport> {
    Json(dispatch(state.runtime.as_ref(), &body).await)
}

// ============================================================
// Conversations
// ============================================================

async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ConversationListResponse>, AppError> {
    let conversations = state
        .runtime
        .list_conversations(list_limit(&query))
        .await?;
    Ok(Json(ConversationListResponse { conversations }))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let messages = state.runtime.messages(&user_id).await?;
    if messages.is_empty() {
        return Err(AppError::NotFound(format!("No conversation with {user_id}")));
    }

    let conv_state = state.runtime.current_state(&user_id).await?;
    let paused = state.runtime.is_paused(&user_id).await?;

    Ok(Json(ConversationResponse {
        stage: conv_state.stage_name(),
        state: conv_state,
        paused,
        messages,
        user_id,
    }))
}

async fn set_paused(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<PauseRequest>,
) -> Result<Json<PauseResponse>, AppError> {
    state.runtime.set_paused(&user_id, req.paused).await?;
    Ok(Json(PauseResponse {
        user_id,
        paused: req.paused,
    }))
}

async fn send_reply(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<ReplyRequest>,
) -> Result<Json<ReplyResponse>, AppError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("Reply text is empty".to_string()));
    }

    let outcome = state.runtime.admin_reply(&user_id, text).await?;
    Ok(Json(ReplyResponse { outcome }))
}

// ============================================================
// Leads
// ============================================================

async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<LeadListResponse>, AppError> {
    let leads = state.runtime.recent_leads(list_limit(&query)).await?;
    Ok(Json(LeadListResponse { leads }))
}

async fn get_version() -> &'static str {
    concat!("enquiry-bot ", env!("CARGO_PKG_VERSION"))
}

fn list_limit(query: &ListQuery) -> usize {
    query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT)
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        tracing::error!(error = %e, "Request failed");
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
