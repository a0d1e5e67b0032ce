//! Enquiry bot - WhatsApp front desk for a coaching institute
//!
//! Walks each user through a fixed enquiry flow, records every exchange for
//! the front-desk team and lets an operator take over any conversation.

mod api;
mod config;
mod content;
mod db;
mod dispatch;
mod outbound;
mod runtime;
mod state_machine;
mod transport;

use api::{create_router, AppState};
use config::BotConfig;
use db::Database;
use runtime::{DatabaseStorage, RuntimeManager};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::{GraphTransport, Transport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional .env next to the binary's working directory
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "enquiry_bot=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = BotConfig::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;
    let storage = DatabaseStorage::load(db)?;

    let transport: Arc<dyn Transport> = Arc::new(GraphTransport::new(
        config.graph_url(),
        config.whatsapp_token.clone(),
    ));
    tracing::info!(
        api_version = %config.graph_api_version,
        phone_number_id = %config.phone_number_id,
        "Graph API transport ready"
    );

    let runtime = RuntimeManager::new(storage, transport, config.runtime_settings());
    let state = AppState::new(runtime, &config.verify_token);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Enquiry bot listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
