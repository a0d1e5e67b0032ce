//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::db::{ConversationSummary, Database, LeadRecord, MessageRecord, NewMessage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Append-only record of every message exchanged with a user
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// Append a message, returning it with its sequence id and timestamp
    async fn append(&self, message: NewMessage) -> Result<MessageRecord, String>;

    /// All messages of one user, oldest first
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<MessageRecord>, String>;

    /// Most recently active users
    async fn list_conversations(&self, limit: usize)
        -> Result<Vec<ConversationSummary>, String>;
}

/// Operator flag that suspends automated replies for a user
#[async_trait]
pub trait OverrideStore: Send + Sync {
    async fn is_paused(&self, user_id: &str) -> Result<bool, String>;

    async fn set_paused(&self, user_id: &str, paused: bool) -> Result<(), String>;
}

/// Sink for captured enquiries
#[async_trait]
pub trait LeadLedger: Send + Sync {
    async fn append_lead(&self, lead: &LeadRecord) -> Result<(), String>;

    /// Latest leads first
    async fn recent_leads(&self, limit: usize) -> Result<Vec<LeadRecord>, String>;
}

/// Combined storage trait for convenience
pub trait Storage: MessageLog + OverrideStore + LeadLedger {}
impl<T: MessageLog + OverrideStore + LeadLedger> Storage for T {}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: MessageLog + ?Sized> MessageLog for Arc<T> {
    async fn append(&self, message: NewMessage) -> Result<MessageRecord, String> {
        (**self).append(message).await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<MessageRecord>, String> {
        (**self).list_by_user(user_id).await
    }

    async fn list_conversations(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, String> {
        (**self).list_conversations(limit).await
    }
}

#[async_trait]
impl<T: OverrideStore + ?Sized> OverrideStore for Arc<T> {
    async fn is_paused(&self, user_id: &str) -> Result<bool, String> {
        (**self).is_paused(user_id).await
    }

    async fn set_paused(&self, user_id: &str, paused: bool) -> Result<(), String> {
        (**self).set_paused(user_id, paused).await
    }
}

#[async_trait]
impl<T: LeadLedger + ?Sized> LeadLedger for Arc<T> {
    async fn append_lead(&self, lead: &LeadRecord) -> Result<(), String> {
        (**self).append_lead(lead).await
    }

    async fn recent_leads(&self, limit: usize) -> Result<Vec<LeadRecord>, String> {
        (**self).recent_leads(limit).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as Storage.
///
/// Pause flags are read on every inbound message, so they are served from an
/// in-process map that is written through to SQLite.
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
    overrides: Arc<RwLock<HashMap<String, bool>>>,
}

impl DatabaseStorage {
    /// Wrap the database and warm the override cache from it
    pub fn load(db: Database) -> Result<Self, String> {
        let overrides = db.list_overrides().map_err(|e| e.to_string())?;
        tracing::info!(count = overrides.len(), "Loaded override flags");
        Ok(Self {
            db,
            overrides: Arc::new(RwLock::new(overrides)),
        })
    }
}

#[async_trait]
impl MessageLog for DatabaseStorage {
    async fn append(&self, message: NewMessage) -> Result<MessageRecord, String> {
        self.db.append_message(&message).map_err(|e| e.to_string())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<MessageRecord>, String> {
        self.db.get_messages(user_id).map_err(|e| e.to_string())
    }

    async fn list_conversations(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, String> {
        self.db.list_conversations(limit).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl OverrideStore for DatabaseStorage {
    async fn is_paused(&self, user_id: &str) -> Result<bool, String> {
        let cache = self
            .overrides
            .read()
            .map_err(|_| "override cache lock poisoned".to_string())?;
        Ok(cache.get(user_id).copied().unwrap_or(false))
    }

    async fn set_paused(&self, user_id: &str, paused: bool) -> Result<(), String> {
        // Durable first, so the cache never claims a flag the table lacks
        self.db
            .set_paused(user_id, paused)
            .map_err(|e| e.to_string())?;
        self.overrides
            .write()
            .map_err(|_| "override cache lock poisoned".to_string())?
            .insert(user_id.to_string(), paused);
        Ok(())
    }
}

#[async_trait]
impl LeadLedger for DatabaseStorage {
    async fn append_lead(&self, lead: &LeadRecord) -> Result<(), String> {
        self.db.append_lead(lead).map_err(|e| e.to_string())
    }

    async fn recent_leads(&self, limit: usize) -> Result<Vec<LeadRecord>, String> {
        self.db.recent_leads(limit).map_err(|e| e.to_string())
    }
}
