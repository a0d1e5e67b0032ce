//! Conversation runtime executor

use super::traits::Storage;
use super::{Command, InboundOutcome, Registry, RuntimeError};

use crate::db::{LeadRecord, NewMessage, COACHING_FLOW};
use crate::outbound::{OutboundMessage, OutboundSender};
use crate::state_machine::{transition, ConvState, Effect, InboundMessage, LeadCapture};
use crate::transport::Transport;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Single owner of one user's conversation state
pub struct ConversationRuntime<S, T>
where
    S: Storage + Clone + 'static,
    T: Transport + Clone + 'static,
{
    user_id: String,
    generation: u64,
    state: ConvState,
    /// Latest profile name seen for this user
    display_name: Option<String>,
    storage: S,
    sender: OutboundSender<S, T>,
    command_rx: mpsc::Receiver<Command>,
    registry: Registry,
    idle_timeout: Duration,
    /// Mid-flow conversations untouched this long are dropped
    abandon_timeout: Duration,
    last_activity: Instant,
}

impl<S, T> ConversationRuntime<S, T>
where
    S: Storage + Clone + 'static,
    T: Transport + Clone + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        generation: u64,
        state: ConvState,
        storage: S,
        sender: OutboundSender<S, T>,
        command_rx: mpsc::Receiver<Command>,
        registry: Registry,
        idle_timeout: Duration,
        abandon_timeout: Duration,
    ) -> Self {
        Self {
            user_id,
            generation,
            state,
            display_name: None,
            storage,
            sender,
            command_rx,
            registry,
            idle_timeout,
            abandon_timeout,
            last_activity: Instant::now(),
        }
    }

    pub async fn run(mut self) {
        tracing::debug!(user_id = %self.user_id, generation = self.generation, "Starting conversation runtime");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                () = tokio::time::sleep(self.idle_timeout) => {
                    if self.should_retire() && self.retire().await {
                        break;
                    }
                }
            }
        }

        tracing::debug!(user_id = %self.user_id, "Conversation runtime stopped");
    }

    /// Idle conversations go after one quiet period. A stage reached
    /// mid-flow is kept until the much longer abandon window runs out.
    fn should_retire(&self) -> bool {
        if self.state.is_idle() {
            return true;
        }
        let abandoned = self.last_activity.elapsed() >= self.abandon_timeout;
        if abandoned {
            tracing::info!(
                user_id = %self.user_id,
                stage = self.state.stage_name(),
                "Dropping abandoned conversation"
            );
        }
        abandoned
    }

    /// Try to shut down. Returns false if work arrived in the meantime.
    ///
    /// Runs under the registry write lock so no new handle is given out while
    /// the mailbox closes. Commands that slipped in before the close are
    /// moved to a fresh mailbox owned by this same task.
    async fn retire(&mut self) -> bool {
        let mut runtimes = self.registry.write().await;
        self.command_rx.close();

        let mut pending = Vec::new();
        while let Ok(command) = self.command_rx.try_recv() {
            pending.push(command);
        }

        let ours = runtimes
            .get(&self.user_id)
            .is_some_and(|h| h.generation == self.generation);

        if pending.is_empty() {
            if ours {
                runtimes.remove(&self.user_id);
            }
            tracing::debug!(user_id = %self.user_id, "Idle runtime retired");
            return true;
        }

        let (command_tx, command_rx) = mpsc::channel(pending.len().max(32));
        for command in pending {
            // Capacity covers every pending command
            let _ = command_tx.try_send(command);
        }
        self.command_rx = command_rx;
        if ours {
            if let Some(handle) = runtimes.get_mut(&self.user_id) {
                handle.command_tx = command_tx;
            }
        }
        false
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Inbound {
                message,
                respond_to,
            } => {
                self.last_activity = Instant::now();
                let result = self.handle_inbound(message).await;
                if let Err(e) = &result {
                    tracing::error!(user_id = %self.user_id, error = %e, "Failed to handle inbound message");
                }
                let _ = respond_to.send(result);
            }
            Command::AdminReply { text, respond_to } => {
                self.last_activity = Instant::now();
                let result = self.sender.send_text(&self.user_id, &text).await;
                if let Err(e) = &result {
                    tracing::error!(user_id = %self.user_id, error = %e, "Failed to record operator reply");
                }
                let _ = respond_to.send(result);
            }
            Command::Inspect { respond_to } => {
                let _ = respond_to.send(self.state.clone());
            }
        }
    }

    async fn handle_inbound(
        &mut self,
        message: InboundMessage,
    ) -> Result<InboundOutcome, RuntimeError> {
        // Every inbound message is recorded, paused or not
        let record = NewMessage::inbound(&self.user_id, message.kind(), message.display_text())
            .with_payload(message.raw.clone());
        self.storage
            .append(record)
            .await
            .map_err(RuntimeError::Storage)?;

        if let Some(name) = &message.display_name {
            self.display_name = Some(name.clone());
        }

        if self
            .storage
            .is_paused(&self.user_id)
            .await
            .map_err(RuntimeError::Storage)?
        {
            tracing::debug!(user_id = %self.user_id, "Conversation paused, skipping flow");
            return Ok(InboundOutcome::Paused);
        }

        let result = transition(&self.state, message.event());

        tracing::info!(
            user_id = %self.user_id,
            from = self.state.stage_name(),
            to = result.new_state.stage_name(),
            disposition = ?result.disposition,
            "Transition"
        );

        let (outbound, ledger): (Vec<_>, Vec<_>) =
            result.effects.into_iter().partition(Effect::is_outbound);

        // The lead must be on record before the stage moves past it
        for effect in ledger {
            if let Effect::RecordLead(capture) = effect {
                self.record_lead(capture).await?;
            }
        }

        // Sends below may fail; the stage still advances
        self.state = result.new_state;

        let mut sends = Vec::new();
        for effect in &outbound {
            if let Some(message) = OutboundMessage::from_effect(effect) {
                sends.push(self.sender.send(&self.user_id, message).await?);
            }
        }

        Ok(InboundOutcome::Handled {
            disposition: result.disposition,
            stage: self.state.stage_name(),
            sends,
        })
    }

    async fn record_lead(&self, capture: LeadCapture) -> Result<(), RuntimeError> {
        let lead = self.lead_record(capture);
        self.storage
            .append_lead(&lead)
            .await
            .map_err(RuntimeError::Storage)?;
        tracing::info!(
            user_id = %self.user_id,
            course = %lead.course,
            attempt = %lead.attempt,
            mode = %lead.mode,
            "Lead captured"
        );
        Ok(())
    }

    fn lead_record(&self, capture: LeadCapture) -> LeadRecord {
        LeadRecord {
            timestamp: Utc::now(),
            flow: COACHING_FLOW.to_string(),
            course: capture.course.code().to_string(),
            attempt: capture.attempt.code().to_string(),
            group: capture
                .group
                .map(|g| g.code().to_string())
                .unwrap_or_default(),
            mode: capture.mode.label().to_string(),
            user_id: self.user_id.clone(),
            profile_name: self.display_name.clone().unwrap_or_default(),
        }
    }
}
