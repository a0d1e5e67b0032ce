//! HTTP API: provider webhook and operator endpoints

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::BotRuntime;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<BotRuntime>,
    /// Expected `hub.verify_token` of the subscription handshake
    pub verify_token: Arc<str>,
}

impl AppState {
    pub fn new(runtime: BotRuntime, verify_token: &str) -> Self {
        Self {
            runtime: Arc::new(runtime),
            verify_token: Arc::from(verify_token),
        }
    }
}
