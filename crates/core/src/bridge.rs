//! Bridges from the notification seams into the proof plane.
//!
//! The trust and canary services only know their listener traits; these
//! adapters turn their notifications into ledger events so out-of-band
//! activity (decay sweeps, probe failures, breaker trips) lands in the
//! same audit chain as intent processing.

use std::sync::Arc;

use async_trait::async_trait;

use agenttrust_canary::{CanaryFailureListener, CanaryProbe, ProbeResult};
use agenttrust_proof::{ProofEventType, ProofLedger};
use agenttrust_trust::{TrustChange, TrustListener, TrustViolation};

/// Mirrors trust changes and violations into the ledger.
pub struct LedgerTrustListener {
    ledger: Arc<ProofLedger>,
}

impl LedgerTrustListener {
    pub fn new(ledger: Arc<ProofLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl TrustListener for LedgerTrustListener {
    async fn on_trust_change(
        &self,
        change: &TrustChange,
    ) -> Result<(), agenttrust_trust::ListenerError> {
        self.ledger
            .log_trust_delta(
                "trust-lifecycle",
                &change.agent_id,
                change.previous_score,
                change.new_score,
            )
            .await?;
        Ok(())
    }

    async fn on_trust_violation(
        &self,
        violation: &TrustViolation,
    ) -> Result<(), agenttrust_trust::ListenerError> {
        self.ledger
            .log_event(
                ProofEventType::TrustDelta,
                "trust-violation",
                serde_json::json!({
                    "kind": violation.kind,
                    "severity": violation.severity,
                    "details": violation.details,
                }),
                Some(violation.agent_id.clone()),
            )
            .await?;
        Ok(())
    }
}

/// Mirrors probe failures and breaker trips into the ledger.
pub struct LedgerCanaryListener {
    ledger: Arc<ProofLedger>,
}

impl LedgerCanaryListener {
    pub fn new(ledger: Arc<ProofLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl CanaryFailureListener for LedgerCanaryListener {
    async fn on_probe_failure(
        &self,
        result: &ProbeResult,
        probe: &CanaryProbe,
    ) -> Result<(), agenttrust_canary::ListenerError> {
        let correlation = format!("canary-{}", result.probe_id);
        self.ledger
            .log_event(
                ProofEventType::ProbeExecuted,
                correlation.as_str(),
                serde_json::json!({
                    "probe_id": result.probe_id,
                    "category": probe.category,
                    "passed": result.passed,
                    "response": result.response,
                    "latency_ms": result.latency_ms,
                }),
                Some(result.agent_id.clone()),
            )
            .await?;

        if result.triggered_circuit_breaker {
            self.ledger
                .log_event(
                    ProofEventType::CircuitBreakerTripped,
                    correlation.as_str(),
                    serde_json::json!({
                        "probe_id": result.probe_id,
                        "critical": probe.critical,
                    }),
                    Some(result.agent_id.clone()),
                )
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenttrust_canary::{AgentResponder, CanaryProbeService, ResponderError};
    use agenttrust_proof::InMemoryEventStore;
    use agenttrust_trust::CircuitBreaker;
    use agenttrust_types::AgentId;

    struct WrongAnswer;

    #[async_trait]
    impl AgentResponder for WrongAnswer {
        async fn respond(&self, _prompt: &str) -> Result<String, ResponderError> {
            Ok("42".to_string())
        }
    }

    #[tokio::test]
    async fn test_probe_failure_lands_in_ledger() {
        let ledger = Arc::new(ProofLedger::new(Arc::new(InMemoryEventStore::new())));
        let service = CanaryProbeService::new(Arc::new(CircuitBreaker::new()));
        service.register_failure_listener(Arc::new(LedgerCanaryListener::new(ledger.clone())));

        let probe = service.library().get("CANARY-FACT-0001").unwrap().clone();
        let agent = AgentId::new("drifting");
        let result = service.execute_probe(&agent, &WrongAnswer, &probe).await;
        assert!(result.triggered_circuit_breaker);

        let probes = ledger
            .get_by_type(ProofEventType::ProbeExecuted)
            .await
            .unwrap();
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].payload["passed"], serde_json::json!(false));

        let trips = ledger
            .get_by_type(ProofEventType::CircuitBreakerTripped)
            .await
            .unwrap();
        assert_eq!(trips.len(), 1);

        let verification = ledger.verify_chain(None, None).await.unwrap();
        assert!(verification.valid);
    }
}
