//! Runtime for executing conversations
//!
//! Every user gets a single-owner task that holds their conversation state
//! and handles their commands one at a time. Different users run in
//! parallel.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;
pub use traits::*;

use crate::db::{ConversationSummary, LeadRecord, MessageRecord};
use crate::outbound::{OutboundSender, SendOutcome};
use crate::state_machine::{ConvState, Disposition, InboundMessage};
use crate::transport::Transport;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, RwLock};

/// Type alias for production runtime with concrete implementations
pub type BotRuntime = RuntimeManager<DatabaseStorage, Arc<dyn Transport>>;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Conversation runtime for {0} stopped")]
    RuntimeStopped(String),
}

/// Tunables for the per-user runtimes
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    /// Upper bound on a single transport call
    pub send_timeout: Duration,
    /// How long an idle runtime lingers before shutting down
    pub idle_timeout: Duration,
    /// How long a conversation left mid-flow is kept
    pub abandon_timeout: Duration,
    pub mailbox_capacity: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(900),
            abandon_timeout: Duration::from_secs(24 * 60 * 60),
            mailbox_capacity: 32,
        }
    }
}

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InboundOutcome {
    /// Logged only; an operator has taken over
    Paused,
    Handled {
        disposition: Disposition,
        stage: &'static str,
        sends: Vec<SendOutcome>,
    },
}

/// Commands accepted by a conversation runtime
#[derive(Debug)]
pub enum Command {
    Inbound {
        message: InboundMessage,
        respond_to: oneshot::Sender<Result<InboundOutcome, RuntimeError>>,
    },
    AdminReply {
        text: String,
        respond_to: oneshot::Sender<Result<SendOutcome, RuntimeError>>,
    },
    Inspect {
        respond_to: oneshot::Sender<ConvState>,
    },
}

/// Handle to interact with a running conversation
#[derive(Clone)]
pub struct ConversationHandle {
    pub command_tx: mpsc::Sender<Command>,
    /// Identifies the task behind the handle
    pub generation: u64,
}

pub type Registry = Arc<RwLock<HashMap<String, ConversationHandle>>>;

/// Manager for all conversation runtimes
pub struct RuntimeManager<S, T>
where
    S: Storage + Clone + 'static,
    T: Transport + Clone + 'static,
{
    storage: S,
    sender: OutboundSender<S, T>,
    settings: RuntimeSettings,
    runtimes: Registry,
    next_generation: AtomicU64,
}

impl<S, T> RuntimeManager<S, T>
where
    S: Storage + Clone + 'static,
    T: Transport + Clone + 'static,
{
    pub fn new(storage: S, transport: T, settings: RuntimeSettings) -> Self {
        let sender = OutboundSender::new(storage.clone(), transport, settings.send_timeout);
        Self {
            storage,
            sender,
            settings,
            runtimes: Arc::new(RwLock::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Get or create a runtime for a user
    async fn get_or_create(&self, user_id: &str) -> mpsc::Sender<Command> {
        {
            let runtimes = self.runtimes.read().await;
            if let Some(handle) = runtimes.get(user_id) {
                if !handle.command_tx.is_closed() {
                    return handle.command_tx.clone();
                }
            }
        }

        let mut runtimes = self.runtimes.write().await;
        // Another request may have started it while we waited for the lock
        if let Some(handle) = runtimes.get(user_id) {
            if !handle.command_tx.is_closed() {
                return handle.command_tx.clone();
            }
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (command_tx, command_rx) = mpsc::channel(self.settings.mailbox_capacity);

        let runtime = ConversationRuntime::new(
            user_id.to_string(),
            generation,
            ConvState::Idle,
            self.storage.clone(),
            self.sender.clone(),
            command_rx,
            self.runtimes.clone(),
            self.settings.idle_timeout,
            self.settings.abandon_timeout,
        );

        let uid = user_id.to_string();
        tokio::spawn(async move {
            runtime.run().await;
            tracing::debug!(user_id = %uid, "Conversation runtime finished");
        });

        runtimes.insert(
            user_id.to_string(),
            ConversationHandle {
                command_tx: command_tx.clone(),
                generation,
            },
        );
        command_tx
    }

    /// Send a command and wait for its reply.
    ///
    /// A runtime may shut down between lookup and send; the command then goes
    /// to a fresh runtime.
    async fn request<R>(
        &self,
        user_id: &str,
        make: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, RuntimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let mut command = make(reply_tx);

        for _ in 0..2 {
            let command_tx = self.get_or_create(user_id).await;
            match command_tx.send(command).await {
                Ok(()) => {
                    return reply_rx
                        .await
                        .map_err(|_| RuntimeError::RuntimeStopped(user_id.to_string()));
                }
                Err(mpsc::error::SendError(returned)) => {
                    tracing::debug!(user_id = %user_id, "Mailbox closed, restarting runtime");
                    command = returned;
                }
            }
        }

        Err(RuntimeError::RuntimeStopped(user_id.to_string()))
    }

    /// Route an inbound message through the user's runtime
    pub async fn submit_inbound(
        &self,
        message: InboundMessage,
    ) -> Result<InboundOutcome, RuntimeError> {
        let user_id = message.user_id.clone();
        self.request(&user_id, |respond_to| Command::Inbound {
            message,
            respond_to,
        })
        .await?
    }

    /// Send an operator-written text, serialized with the user's own messages
    pub async fn admin_reply(&self, user_id: &str, text: &str) -> Result<SendOutcome, RuntimeError> {
        let text = text.to_string();
        self.request(user_id, |respond_to| Command::AdminReply { text, respond_to })
            .await?
    }

    /// Current stage of a user; users without a live runtime are idle
    pub async fn current_state(&self, user_id: &str) -> Result<ConvState, RuntimeError> {
        let live = {
            let runtimes = self.runtimes.read().await;
            runtimes
                .get(user_id)
                .is_some_and(|h| !h.command_tx.is_closed())
        };
        if !live {
            return Ok(ConvState::Idle);
        }
        self.request(user_id, |respond_to| Command::Inspect { respond_to })
            .await
    }

    pub async fn is_paused(&self, user_id: &str) -> Result<bool, RuntimeError> {
        self.storage
            .is_paused(user_id)
            .await
            .map_err(RuntimeError::Storage)
    }

    pub async fn set_paused(&self, user_id: &str, paused: bool) -> Result<(), RuntimeError> {
        self.storage
            .set_paused(user_id, paused)
            .await
            .map_err(RuntimeError::Storage)?;
        tracing::info!(user_id = %user_id, paused, "Override updated");
        Ok(())
    }

    pub async fn list_conversations(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, RuntimeError> {
        self.storage
            .list_conversations(limit)
            .await
            .map_err(RuntimeError::Storage)
    }

    pub async fn messages(&self, user_id: &str) -> Result<Vec<MessageRecord>, RuntimeError> {
        self.storage
            .list_by_user(user_id)
            .await
            .map_err(RuntimeError::Storage)
    }

    pub async fn recent_leads(&self, limit: usize) -> Result<Vec<LeadRecord>, RuntimeError> {
        self.storage
            .recent_leads(limit)
            .await
            .map_err(RuntimeError::Storage)
    }

    /// Number of runtimes with an open mailbox
    #[allow(dead_code)] // Used in tests
    pub async fn live_runtimes(&self) -> usize {
        self.runtimes
            .read()
            .await
            .values()
            .filter(|h| !h.command_tx.is_closed())
            .count()
    }
}
