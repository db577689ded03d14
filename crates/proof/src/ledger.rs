//! The proof ledger: event emission, queries, and chain verification.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use agenttrust_types::AgentId;

use crate::chain::{content_hash, verify_content, verify_events, ChainVerification};
use crate::event::{ProofEvent, ProofEventType};
use crate::store::EventStore;
use crate::{ProofError, Result};

/// What a hook tells the emitter to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// Keep invoking later hooks
    Continue,
    /// Skip the remaining hooks for this event
    Abort,
}

/// Synchronous subscriber invoked after every emission.
///
/// A hook may abort downstream hook processing, but the event is already
/// persisted: the ledger is append-only and nothing un-writes an emission.
pub trait ProofHook: Send + Sync {
    fn on_event_emitted(&self, event: &ProofEvent) -> HookOutcome;
}

/// Aggregate ledger statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_events: usize,
    pub by_type: HashMap<String, usize>,
    pub by_agent: HashMap<String, usize>,
    pub first_event_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
}

/// The append-only, hash-chained audit ledger.
pub struct ProofLedger {
    store: Arc<dyn EventStore>,
    /// Serializes appends so chain position is strictly monotonic.
    append_lock: Mutex<()>,
    hooks: RwLock<Vec<Arc<dyn ProofHook>>>,
}

impl ProofLedger {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            append_lock: Mutex::new(()),
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Register an emission hook, invoked in registration order.
    pub fn register_hook(&self, hook: Arc<dyn ProofHook>) {
        self.hooks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(hook);
    }

    /// Emit one event: construct, chain, persist, then notify hooks.
    pub async fn log_event(
        &self,
        event_type: ProofEventType,
        correlation_id: impl Into<String>,
        payload: serde_json::Value,
        agent_id: Option<AgentId>,
    ) -> Result<ProofEvent> {
        let correlation_id = correlation_id.into();

        let event = {
            let _guard = self.append_lock.lock().await;
            let prev_hash = self.store.last().await?.map(|e| e.hash);

            let mut event = ProofEvent {
                event_id: Uuid::new_v4(),
                event_type,
                correlation_id,
                agent_id,
                payload,
                occurred_at: Utc::now(),
                prev_hash,
                hash: String::new(),
            };
            event.hash = content_hash(&event);

            self.store.append(event.clone()).await?;
            event
        };

        debug!(
            event = %event.event_id,
            kind = %event.event_type,
            correlation = %event.correlation_id,
            "proof event emitted"
        );

        self.run_hooks(&event);
        Ok(event)
    }

    /// Typed wrapper: an intent entered the pipeline.
    pub async fn log_intent_received(
        &self,
        correlation_id: &str,
        agent_id: &AgentId,
        intent: serde_json::Value,
    ) -> Result<ProofEvent> {
        self.log_event(
            ProofEventType::IntentReceived,
            correlation_id,
            serde_json::json!({ "intent": intent }),
            Some(agent_id.clone()),
        )
        .await
    }

    /// Typed wrapper: an authorization decision was made.
    pub async fn log_decision(
        &self,
        correlation_id: &str,
        agent_id: &AgentId,
        permitted: bool,
        reason: &str,
    ) -> Result<ProofEvent> {
        self.log_event(
            ProofEventType::DecisionMade,
            correlation_id,
            serde_json::json!({ "permitted": permitted, "reason": reason }),
            Some(agent_id.clone()),
        )
        .await
    }

    /// Typed wrapper: an agent's trust score moved.
    pub async fn log_trust_delta(
        &self,
        correlation_id: &str,
        agent_id: &AgentId,
        previous_score: f64,
        new_score: f64,
    ) -> Result<ProofEvent> {
        self.log_event(
            ProofEventType::TrustDelta,
            correlation_id,
            serde_json::json!({ "previous_score": previous_score, "new_score": new_score }),
            Some(agent_id.clone()),
        )
        .await
    }

    /// Typed wrapper: execution phase transitions.
    pub async fn log_execution_started(
        &self,
        correlation_id: &str,
        agent_id: &AgentId,
        action: &str,
    ) -> Result<ProofEvent> {
        self.log_event(
            ProofEventType::ExecutionStarted,
            correlation_id,
            serde_json::json!({ "action": action }),
            Some(agent_id.clone()),
        )
        .await
    }

    pub async fn log_execution_completed(
        &self,
        correlation_id: &str,
        agent_id: &AgentId,
        action: &str,
        duration_ms: u64,
    ) -> Result<ProofEvent> {
        self.log_event(
            ProofEventType::ExecutionCompleted,
            correlation_id,
            serde_json::json!({ "action": action, "duration_ms": duration_ms }),
            Some(agent_id.clone()),
        )
        .await
    }

    pub async fn log_execution_failed(
        &self,
        correlation_id: &str,
        agent_id: &AgentId,
        action: &str,
        error: &str,
    ) -> Result<ProofEvent> {
        self.log_event(
            ProofEventType::ExecutionFailed,
            correlation_id,
            serde_json::json!({ "action": action, "error": error }),
            Some(agent_id.clone()),
        )
        .await
    }

    /// Fetch one event by id.
    pub async fn get_event(&self, event_id: &Uuid) -> Result<ProofEvent> {
        self.store
            .get(event_id)
            .await?
            .ok_or_else(|| ProofError::EventNotFound(event_id.to_string()))
    }

    /// Every event of one logical request, ascending in chain order.
    pub async fn get_trace(&self, correlation_id: &str) -> Result<Vec<ProofEvent>> {
        self.store.by_correlation(correlation_id).await
    }

    /// Every event naming one agent, ascending in chain order.
    pub async fn get_agent_history(&self, agent_id: &AgentId) -> Result<Vec<ProofEvent>> {
        self.store.by_agent(agent_id).await
    }

    pub async fn get_by_type(&self, event_type: ProofEventType) -> Result<Vec<ProofEvent>> {
        self.store.by_type(event_type).await
    }

    /// Aggregate statistics over the whole ledger.
    pub async fn stats(&self) -> Result<LedgerStats> {
        let events = self.store.all().await?;
        let mut by_type: HashMap<String, usize> = HashMap::new();
        let mut by_agent: HashMap<String, usize> = HashMap::new();

        for event in &events {
            *by_type.entry(event.event_type.to_string()).or_insert(0) += 1;
            if let Some(agent) = &event.agent_id {
                *by_agent.entry(agent.to_string()).or_insert(0) += 1;
            }
        }

        Ok(LedgerStats {
            total_events: events.len(),
            by_type,
            by_agent,
            first_event_at: events.first().map(|e| e.occurred_at),
            last_event_at: events.last().map(|e| e.occurred_at),
        })
    }

    /// Walk the stored chain and recompute every hash link.
    ///
    /// `from_event_id` starts the walk at a given event (its link to its
    /// actual predecessor is still checked); `limit` caps the number of
    /// events inspected.
    pub async fn verify_chain(
        &self,
        from_event_id: Option<Uuid>,
        limit: Option<usize>,
    ) -> Result<ChainVerification> {
        let events = self.store.all().await?;

        let start = match from_event_id {
            Some(id) => events
                .iter()
                .position(|e| e.event_id == id)
                .ok_or_else(|| ProofError::EventNotFound(id.to_string()))?,
            None => 0,
        };

        let end = limit
            .map(|l| (start + l).min(events.len()))
            .unwrap_or(events.len());

        let prev = if start > 0 {
            Some(&events[start - 1])
        } else {
            None
        };

        Ok(verify_events(&events[start..end], prev))
    }

    /// Verify the events of one logical request.
    ///
    /// Correlated events are not adjacent in the global chain, so this
    /// recomputes content hashes; link continuity is the full chain's
    /// concern.
    pub async fn verify_correlation_chain(
        &self,
        correlation_id: &str,
    ) -> Result<ChainVerification> {
        let events = self.store.by_correlation(correlation_id).await?;
        Ok(verify_content(&events))
    }

    fn run_hooks(&self, event: &ProofEvent) {
        let hooks: Vec<Arc<dyn ProofHook>> = self
            .hooks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for hook in hooks {
            match std::panic::catch_unwind(AssertUnwindSafe(|| hook.on_event_emitted(event))) {
                Ok(HookOutcome::Continue) => {}
                Ok(HookOutcome::Abort) => {
                    debug!(event = %event.event_id, "hook aborted downstream processing");
                    break;
                }
                Err(_) => {
                    warn!(event = %event.event_id, "proof hook panicked; skipping it");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryEventStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ledger_with_store() -> (ProofLedger, Arc<InMemoryEventStore>) {
        let store = Arc::new(InMemoryEventStore::new());
        (ProofLedger::new(store.clone()), store)
    }

    fn agent(name: &str) -> AgentId {
        AgentId::new(name)
    }

    async fn emit_sequence(ledger: &ProofLedger, count: usize) {
        for i in 0..count {
            ledger
                .log_event(
                    ProofEventType::DecisionMade,
                    format!("corr-{}", i % 2),
                    serde_json::json!({ "seq": i }),
                    Some(agent("a")),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_emitted_events_chain_and_verify() {
        let (ledger, _store) = ledger_with_store();
        emit_sequence(&ledger, 6).await;

        let verification = ledger.verify_chain(None, None).await.unwrap();
        assert!(verification.valid);
        assert_eq!(verification.checked, 6);
    }

    #[tokio::test]
    async fn test_tampered_store_reports_first_broken_link() {
        let (ledger, store) = ledger_with_store();
        emit_sequence(&ledger, 5).await;

        store
            .tamper_payload(3, serde_json::json!({ "seq": "edited" }))
            .await;

        let verification = ledger.verify_chain(None, None).await.unwrap();
        assert!(!verification.valid);
        assert_eq!(verification.first_invalid.unwrap().index, 3);
    }

    #[tokio::test]
    async fn test_verify_chain_from_offset_and_limit() {
        let (ledger, _store) = ledger_with_store();
        emit_sequence(&ledger, 8).await;
        let events = ledger.store.all().await.unwrap();

        let from_third = ledger
            .verify_chain(Some(events[3].event_id), None)
            .await
            .unwrap();
        assert!(from_third.valid);
        assert_eq!(from_third.checked, 5);

        let limited = ledger.verify_chain(None, Some(4)).await.unwrap();
        assert!(limited.valid);
        assert_eq!(limited.checked, 4);

        let missing = ledger.verify_chain(Some(Uuid::new_v4()), None).await;
        assert!(matches!(missing, Err(ProofError::EventNotFound(_))));
    }

    #[tokio::test]
    async fn test_correlation_trace_is_scoped_and_ascending() {
        let (ledger, _store) = ledger_with_store();
        emit_sequence(&ledger, 6).await;

        let trace = ledger.get_trace("corr-0").await.unwrap();
        assert_eq!(trace.len(), 3);
        let sequence: Vec<u64> = trace
            .iter()
            .map(|e| e.payload["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(sequence, vec![0, 2, 4]);

        let verification = ledger.verify_correlation_chain("corr-0").await.unwrap();
        assert!(verification.valid);
    }

    #[tokio::test]
    async fn test_correlation_verification_detects_tamper() {
        let (ledger, store) = ledger_with_store();
        emit_sequence(&ledger, 4).await;

        store.tamper_payload(2, serde_json::json!({ "x": 1 })).await;

        // corr-0 holds global indices 0 and 2; the fault is its second.
        let verification = ledger.verify_correlation_chain("corr-0").await.unwrap();
        assert!(!verification.valid);
        assert_eq!(verification.first_invalid.unwrap().index, 1);
    }

    #[tokio::test]
    async fn test_typed_wrappers_and_queries() {
        let (ledger, _store) = ledger_with_store();
        let alpha = agent("alpha");
        let beta = agent("beta");

        ledger
            .log_intent_received("corr-1", &alpha, serde_json::json!({ "action": "deploy" }))
            .await
            .unwrap();
        ledger
            .log_decision("corr-1", &alpha, true, "default allow")
            .await
            .unwrap();
        ledger
            .log_execution_started("corr-1", &alpha, "deploy")
            .await
            .unwrap();
        ledger
            .log_execution_completed("corr-1", &alpha, "deploy", 42)
            .await
            .unwrap();
        ledger
            .log_trust_delta("corr-2", &beta, 500.0, 450.0)
            .await
            .unwrap();

        let history = ledger.get_agent_history(&alpha).await.unwrap();
        assert_eq!(history.len(), 4);

        let decisions = ledger
            .get_by_type(ProofEventType::DecisionMade)
            .await
            .unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].payload["permitted"], serde_json::json!(true));

        let stats = ledger.stats().await.unwrap();
        assert_eq!(stats.total_events, 5);
        assert_eq!(stats.by_type["decision_made"], 1);
        assert_eq!(stats.by_agent["alpha"], 4);
        assert!(stats.first_event_at.unwrap() <= stats.last_event_at.unwrap());
    }

    #[tokio::test]
    async fn test_get_event_not_found() {
        let (ledger, _store) = ledger_with_store();
        let result = ledger.get_event(&Uuid::new_v4()).await;
        assert!(matches!(result, Err(ProofError::EventNotFound(_))));
    }

    struct CountingHook {
        calls: AtomicUsize,
        outcome: HookOutcome,
    }

    impl CountingHook {
        fn new(outcome: HookOutcome) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome,
            })
        }
    }

    impl ProofHook for CountingHook {
        fn on_event_emitted(&self, _event: &ProofEvent) -> HookOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
        }
    }

    #[tokio::test]
    async fn test_hook_abort_skips_later_hooks_but_event_persists() {
        let (ledger, store) = ledger_with_store();
        let first = CountingHook::new(HookOutcome::Abort);
        let second = CountingHook::new(HookOutcome::Continue);
        ledger.register_hook(first.clone());
        ledger.register_hook(second.clone());

        ledger
            .log_event(
                ProofEventType::PolicyChanged,
                "corr",
                serde_json::json!({}),
                None,
            )
            .await
            .unwrap();

        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
        // Abort affects hooks only; the ledger kept the event.
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
