//! Delivery of outbound messages to the messaging provider

mod graph;

pub use graph::GraphTransport;

use crate::outbound::OutboundMessage;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Provider rejected message ({status}): {body}")]
    Status { status: u16, body: String },
}

/// Hands a rendered message to the provider
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, to: &str, message: &OutboundMessage) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn deliver(&self, to: &str, message: &OutboundMessage) -> Result<(), TransportError> {
        (**self).deliver(to, message).await
    }
}
