//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::db::{
    truncate_chars, ConversationSummary, LeadRecord, MessageRecord, NewMessage, PREVIEW_CHARS,
};
use crate::outbound::OutboundMessage;
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// In-memory Storage
// ============================================================================

/// Storage kept entirely in memory
#[derive(Default)]
pub struct MemoryStorage {
    messages: Mutex<Vec<MessageRecord>>,
    overrides: Mutex<HashMap<String, bool>>,
    leads: Mutex<Vec<LeadRecord>>,
    next_id: AtomicI64,
    fail_appends: AtomicBool,
    fail_leads: AtomicBool,
}

#[allow(dead_code)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent message append fail
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent lead append fail
    pub fn fail_leads(&self, fail: bool) {
        self.fail_leads.store(fail, Ordering::SeqCst);
    }

    pub fn messages_for(&self, user_id: &str) -> Vec<MessageRecord> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn leads(&self) -> Vec<LeadRecord> {
        self.leads.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageLog for MemoryStorage {
    async fn append(&self, message: NewMessage) -> Result<MessageRecord, String> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err("disk full".to_string());
        }
        let record = MessageRecord {
            sequence_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id: message.user_id,
            direction: message.direction,
            kind: message.kind,
            text: message.text,
            created_at: Utc::now(),
            payload: message.payload,
        };
        self.messages.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<MessageRecord>, String> {
        Ok(self.messages_for(user_id))
    }

    async fn list_conversations(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, String> {
        let messages = self.messages.lock().unwrap();
        let overrides = self.overrides.lock().unwrap();

        let mut latest: HashMap<&str, &MessageRecord> = HashMap::new();
        for message in messages.iter() {
            latest.insert(&message.user_id, message);
        }

        let mut summaries: Vec<_> = latest
            .into_values()
            .map(|m| ConversationSummary {
                user_id: m.user_id.clone(),
                last_timestamp: m.created_at,
                preview: truncate_chars(&m.text, PREVIEW_CHARS),
                paused: overrides.get(&m.user_id).copied().unwrap_or(false),
            })
            .collect();
        summaries.sort_by(|a, b| b.last_timestamp.cmp(&a.last_timestamp));
        summaries.truncate(limit);
        Ok(summaries)
    }
}

#[async_trait]
impl OverrideStore for MemoryStorage {
    async fn is_paused(&self, user_id: &str) -> Result<bool, String> {
        Ok(self
            .overrides
            .lock()
            .unwrap()
            .get(user_id)
            .copied()
            .unwrap_or(false))
    }

    async fn set_paused(&self, user_id: &str, paused: bool) -> Result<(), String> {
        self.overrides
            .lock()
            .unwrap()
            .insert(user_id.to_string(), paused);
        Ok(())
    }
}

#[async_trait]
impl LeadLedger for MemoryStorage {
    async fn append_lead(&self, lead: &LeadRecord) -> Result<(), String> {
        if self.fail_leads.load(Ordering::SeqCst) {
            return Err("leads table locked".to_string());
        }
        self.leads.lock().unwrap().push(lead.clone());
        Ok(())
    }

    async fn recent_leads(&self, limit: usize) -> Result<Vec<LeadRecord>, String> {
        Ok(self
            .leads
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Mock Transport
// ============================================================================

/// Transport that records what it was asked to deliver
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<(String, OutboundMessage)>>,
    fail: bool,
    delay: Option<Duration>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every message with a provider error
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Wait this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<(String, OutboundMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, user_id: &str) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == user_id)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn deliver(&self, to: &str, message: &OutboundMessage) -> Result<(), TransportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), message.clone()));
        if self.fail {
            return Err(TransportError::Status {
                status: 500,
                body: "upstream unavailable".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Runtime Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content;
    use crate::db::{Direction, MessageKind};
    use crate::outbound::SendOutcome;
    use crate::runtime::{InboundOutcome, RuntimeManager, RuntimeSettings};
    use crate::state_machine::state::{Attempt, Course, Mode};
    use crate::state_machine::{ConvState, Disposition, InboundMessage, InboundPayload};
    use std::sync::Arc;

    type TestRuntime = RuntimeManager<Arc<MemoryStorage>, Arc<MockTransport>>;

    fn settings() -> RuntimeSettings {
        RuntimeSettings {
            send_timeout: Duration::from_secs(1),
            ..RuntimeSettings::default()
        }
    }

    fn setup_with(
        transport: MockTransport,
        settings: RuntimeSettings,
    ) -> (Arc<MemoryStorage>, Arc<MockTransport>, TestRuntime) {
        let storage = Arc::new(MemoryStorage::new());
        let transport = Arc::new(transport);
        let manager = RuntimeManager::new(storage.clone(), transport.clone(), settings);
        (storage, transport, manager)
    }

    fn setup() -> (Arc<MemoryStorage>, Arc<MockTransport>, TestRuntime) {
        setup_with(MockTransport::new(), settings())
    }

    fn tap(user_id: &str, id: &str) -> InboundMessage {
        InboundMessage::new(
            user_id,
            InboundPayload::Button {
                id: id.to_string(),
                title: id.to_string(),
            },
        )
    }

    fn text(user_id: &str, body: &str) -> InboundMessage {
        InboundMessage::new(
            user_id,
            InboundPayload::Text {
                body: body.to_string(),
            },
        )
    }

    async fn stage(manager: &TestRuntime, user_id: &str) -> &'static str {
        manager.current_state(user_id).await.unwrap().stage_name()
    }

    fn handled_stage(outcome: &InboundOutcome) -> &'static str {
        match outcome {
            InboundOutcome::Handled { stage, .. } => *stage,
            InboundOutcome::Paused => panic!("Expected handled outcome, got paused"),
        }
    }

    #[tokio::test]
    async fn test_foundation_enquiry_captures_one_lead() {
        let (storage, transport, manager) = setup();
        let user = "919800000001";

        let mut stages = vec![stage(&manager, user).await];
        for id in ["COACH", "COURSE_FOUNDATION", "ATTEMPT_MAY", "MODE_ONLINE"] {
            let outcome = manager.submit_inbound(tap(user, id)).await.unwrap();
            stages.push(handled_stage(&outcome));
        }
        assert_eq!(
            stages,
            vec!["idle", "course_choice", "attempt_choice", "mode_choice", "idle"]
        );

        let leads = storage.leads();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].flow, "COACHING_ENQUIRY");
        assert_eq!(leads[0].course, "FOUNDATION");
        assert_eq!(leads[0].attempt, "MAY");
        assert_eq!(leads[0].group, "");
        assert_eq!(leads[0].mode, "Online");
        assert_eq!(leads[0].user_id, user);

        let sent = transport.sent_to(user);
        assert!(sent.contains(&OutboundMessage::text(content::mode_features(Mode::Online))));
        assert_eq!(
            sent.last(),
            Some(&OutboundMessage::text(content::CLOSING_THANKS))
        );
    }

    #[tokio::test]
    async fn test_test_series_schedule_precedes_group_buttons() {
        let (_storage, transport, manager) = setup();
        let user = "919800000002";

        for id in ["COACH", "COURSE_FINAL_TS", "ATTEMPT_SEP"] {
            manager.submit_inbound(tap(user, id)).await.unwrap();
        }

        let sent = transport.sent_to(user);
        let tail = &sent[sent.len() - 2..];
        assert_eq!(
            tail[0],
            OutboundMessage::text(content::test_series_schedule(Attempt::September))
        );
        assert!(matches!(
            &tail[1],
            OutboundMessage::Buttons { body, .. } if body == content::GROUP_PROMPT
        ));
        assert_eq!(
            manager.current_state(user).await.unwrap(),
            ConvState::GroupChoice {
                course: Course::FinalTestSeries,
                attempt: Attempt::September,
            }
        );
    }

    #[tokio::test]
    async fn test_attempt_without_course_prompts_restart() {
        let (storage, transport, manager) = setup();
        let user = "919800000003";

        let outcome = manager
            .submit_inbound(tap(user, "ATTEMPT_MAY"))
            .await
            .unwrap();
        match outcome {
            InboundOutcome::Handled {
                disposition, stage, ..
            } => {
                assert_eq!(disposition, Disposition::InvalidSequence);
                assert_eq!(stage, "idle");
            }
            InboundOutcome::Paused => panic!("Not paused"),
        }
        assert_eq!(
            transport.sent_to(user),
            vec![OutboundMessage::text(content::RESTART_COACHING)]
        );
        assert!(storage.leads().is_empty());
    }

    #[tokio::test]
    async fn test_paused_user_is_logged_but_not_answered() {
        let (storage, transport, manager) = setup();
        let user = "919800000004";
        manager.set_paused(user, true).await.unwrap();

        let outcome = manager.submit_inbound(tap(user, "KNOW")).await.unwrap();
        assert_eq!(outcome, InboundOutcome::Paused);

        let log = storage.messages_for(user);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].direction, Direction::In);
        assert_eq!(log[0].text, "[User tapped] KNOW (KNOW)");
        assert!(transport.sent_to(user).is_empty());
    }

    #[tokio::test]
    async fn test_resume_continues_from_preserved_stage() {
        let (_storage, _transport, manager) = setup();
        let user = "919800000005";

        manager.submit_inbound(tap(user, "COACH")).await.unwrap();
        manager.set_paused(user, true).await.unwrap();
        manager
            .submit_inbound(tap(user, "COURSE_INTERMEDIATE"))
            .await
            .unwrap();
        assert_eq!(stage(&manager, user).await, "course_choice");

        manager.set_paused(user, false).await.unwrap();
        let outcome = manager
            .submit_inbound(tap(user, "COURSE_INTERMEDIATE"))
            .await
            .unwrap();
        assert_eq!(handled_stage(&outcome), "attempt_choice");
    }

    #[tokio::test]
    async fn test_unknown_choice_gets_single_acknowledgment() {
        let (_storage, transport, manager) = setup();
        let user = "919800000006";

        manager.submit_inbound(tap(user, "COACH")).await.unwrap();
        let before = transport.sent_to(user).len();

        let outcome = manager
            .submit_inbound(tap(user, "SUMMER_PROMO"))
            .await
            .unwrap();
        assert_eq!(handled_stage(&outcome), "course_choice");

        let sent = transport.sent_to(user);
        assert_eq!(sent.len(), before + 1);
        assert_eq!(sent[before], OutboundMessage::text(content::GENERIC_ACK));
    }

    #[tokio::test]
    async fn test_transport_failure_still_logged_and_advances() {
        let (storage, _transport, manager) = setup_with(MockTransport::new().failing(), settings());
        let user = "919800000007";

        let outcome = manager.submit_inbound(tap(user, "COACH")).await.unwrap();
        match outcome {
            InboundOutcome::Handled { stage, sends, .. } => {
                assert_eq!(stage, "course_choice");
                assert_eq!(sends.len(), 1);
                assert!(matches!(sends[0], SendOutcome::Failed(_)));
            }
            InboundOutcome::Paused => panic!("Not paused"),
        }

        let log = storage.messages_for(user);
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].direction, Direction::Out);
        assert_eq!(log[1].kind, MessageKind::Buttons);
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported() {
        let (storage, transport, manager) = setup();
        storage.fail_appends(true);

        let result = manager.submit_inbound(tap("919800000008", "COACH")).await;
        assert!(matches!(result, Err(crate::runtime::RuntimeError::Storage(_))));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failed_lead_write_keeps_mode_choice() {
        let (storage, transport, manager) = setup();
        let user = "919800000013";

        for id in ["COACH", "COURSE_FOUNDATION", "ATTEMPT_MAY"] {
            manager.submit_inbound(tap(user, id)).await.unwrap();
        }
        let sent_before = transport.sent_to(user).len();

        storage.fail_leads(true);
        let result = manager.submit_inbound(tap(user, "MODE_ONLINE")).await;
        assert!(matches!(result, Err(crate::runtime::RuntimeError::Storage(_))));
        assert_eq!(stage(&manager, user).await, "mode_choice");
        assert_eq!(transport.sent_to(user).len(), sent_before);
        assert!(storage.leads().is_empty());

        // Repeating the pick once the ledger is back completes the enquiry
        storage.fail_leads(false);
        let outcome = manager.submit_inbound(tap(user, "MODE_ONLINE")).await.unwrap();
        assert!(matches!(
            outcome,
            InboundOutcome::Handled { disposition: Disposition::Completed, .. }
        ));
        assert_eq!(storage.leads().len(), 1);
        assert_eq!(transport.sent_to(user).len(), sent_before + 2);
    }

    #[tokio::test]
    async fn test_redelivery_is_processed_twice() {
        let (storage, _transport, manager) = setup();
        let user = "919800000009";

        manager
            .submit_inbound(tap(user, "COURSE_FOUNDATION"))
            .await
            .unwrap();
        manager
            .submit_inbound(tap(user, "ATTEMPT_JAN"))
            .await
            .unwrap();
        // The same mode tap delivered twice
        let first = manager
            .submit_inbound(tap(user, "MODE_VIRTUAL"))
            .await
            .unwrap();
        let second = manager
            .submit_inbound(tap(user, "MODE_VIRTUAL"))
            .await
            .unwrap();

        assert!(matches!(
            first,
            InboundOutcome::Handled { disposition: Disposition::Completed, .. }
        ));
        assert!(matches!(
            second,
            InboundOutcome::Handled { disposition: Disposition::InvalidSequence, .. }
        ));

        let inbound: Vec<_> = storage
            .messages_for(user)
            .into_iter()
            .filter(|m| m.direction == Direction::In && m.text.contains("MODE_VIRTUAL"))
            .collect();
        assert_eq!(inbound.len(), 2);
        assert_eq!(storage.leads().len(), 1);
    }

    #[tokio::test]
    async fn test_log_order_is_non_decreasing() {
        let (storage, _transport, manager) = setup();
        let user = "919800000010";

        for id in ["KNOW", "KNOW_SOCIAL", "KNOW_RESULTS", "COACH"] {
            manager.submit_inbound(tap(user, id)).await.unwrap();
        }
        manager.submit_inbound(text(user, "hi")).await.unwrap();

        let log = storage.messages_for(user);
        assert!(log.len() >= 10);
        for pair in log.windows(2) {
            assert!(
                (pair[0].created_at, pair[0].sequence_id)
                    <= (pair[1].created_at, pair[1].sequence_id)
            );
        }
    }

    #[tokio::test]
    async fn test_admin_reply_goes_through_runtime() {
        let (storage, transport, manager) = setup();
        let user = "919800000011";

        manager.submit_inbound(tap(user, "COACH")).await.unwrap();
        manager.set_paused(user, true).await.unwrap();

        let outcome = manager
            .admin_reply(user, "Our counsellor will call you shortly.")
            .await
            .unwrap();
        assert_eq!(outcome, SendOutcome::Delivered);
        assert_eq!(
            transport.sent_to(user).last(),
            Some(&OutboundMessage::text("Our counsellor will call you shortly."))
        );

        let log = storage.messages_for(user);
        assert_eq!(log.last().unwrap().text, "Our counsellor will call you shortly.");
        assert_eq!(stage(&manager, user).await, "course_choice");
    }

    #[tokio::test]
    async fn test_display_name_recorded_on_lead() {
        let (storage, _transport, manager) = setup();
        let user = "919800000012";

        manager
            .submit_inbound(tap(user, "COURSE_INTERMEDIATE").with_display_name("Asha"))
            .await
            .unwrap();
        for id in ["ATTEMPT_MAY", "GROUP_BOTH", "MODE_FACE"] {
            manager.submit_inbound(tap(user, id)).await.unwrap();
        }

        let leads = storage.leads();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].profile_name, "Asha");
        assert_eq!(leads[0].group, "BOTH");
        assert_eq!(leads[0].mode, "Face to Face");
    }

    #[tokio::test]
    async fn test_users_progress_independently() {
        let (storage, _transport, manager) = setup();
        let manager = Arc::new(manager);

        let tasks = (0..8).map(|i| {
            let manager = manager.clone();
            async move {
                let user = format!("91980000010{i}");
                for id in ["COACH", "COURSE_FOUNDATION", "ATTEMPT_SEP", "MODE_ONLINE"] {
                    manager.submit_inbound(tap(&user, id)).await.unwrap();
                }
            }
        });
        futures::future::join_all(tasks).await;

        assert_eq!(storage.leads().len(), 8);
        assert_eq!(manager.list_conversations(100).await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_simultaneous_taps_from_one_user_are_serialized() {
        let transport = MockTransport::new().with_delay(Duration::from_millis(30));
        let (storage, _transport, manager) = setup_with(transport, settings());
        let user = "919800000014";

        for id in ["COURSE_FOUNDATION", "ATTEMPT_SEP"] {
            manager.submit_inbound(tap(user, id)).await.unwrap();
        }
        assert_eq!(stage(&manager, user).await, "mode_choice");

        let taps = (0..2).map(|_| manager.submit_inbound(tap(user, "MODE_ONLINE")));
        let mut dispositions: Vec<_> = futures::future::join_all(taps)
            .await
            .into_iter()
            .map(|result| match result.unwrap() {
                InboundOutcome::Handled { disposition, .. } => disposition,
                InboundOutcome::Paused => panic!("Not paused"),
            })
            .collect();
        dispositions.sort_by_key(|d| *d == Disposition::InvalidSequence);

        assert_eq!(
            dispositions,
            vec![Disposition::Completed, Disposition::InvalidSequence]
        );
        assert_eq!(storage.leads().len(), 1);
        assert_eq!(stage(&manager, user).await, "idle");
    }

    #[tokio::test]
    async fn test_idle_runtime_retires_and_restarts() {
        let settings = RuntimeSettings {
            idle_timeout: Duration::from_millis(50),
            ..settings()
        };
        let (_storage, _transport, manager) = setup_with(MockTransport::new(), settings);

        // Unknown choice leaves the user idle
        manager.submit_inbound(tap("9101", "PROMO")).await.unwrap();
        // Mid-flow users are kept
        manager.submit_inbound(tap("9202", "COACH")).await.unwrap();
        assert_eq!(manager.live_runtimes().await, 2);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(manager.live_runtimes().await, 1);
        assert_eq!(stage(&manager, "9202").await, "course_choice");
        assert_eq!(stage(&manager, "9101").await, "idle");

        let outcome = manager.submit_inbound(tap("9101", "COACH")).await.unwrap();
        assert_eq!(handled_stage(&outcome), "course_choice");
    }

    #[tokio::test]
    async fn test_abandoned_mid_flow_runtime_is_dropped() {
        let settings = RuntimeSettings {
            idle_timeout: Duration::from_millis(30),
            abandon_timeout: Duration::from_millis(300),
            ..settings()
        };
        let (_storage, _transport, manager) = setup_with(MockTransport::new(), settings);

        manager.submit_inbound(tap("9303", "COACH")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(manager.live_runtimes().await, 1);

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(manager.live_runtimes().await, 0);
        assert_eq!(stage(&manager, "9303").await, "idle");
    }
}
