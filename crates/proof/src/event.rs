//! Proof event model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use agenttrust_types::AgentId;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofEventType {
    /// An intent entered the pipeline
    IntentReceived,
    /// The role gate produced a decision
    DecisionMade,
    /// A trust score changed
    TrustDelta,
    ExecutionStarted,
    ExecutionCompleted,
    ExecutionFailed,
    /// A canary probe ran
    ProbeExecuted,
    /// An agent was halted
    CircuitBreakerTripped,
    /// Rules or exceptions changed
    PolicyChanged,
}

impl ProofEventType {
    /// Stable wire name, also used in the hash preimage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IntentReceived => "intent_received",
            Self::DecisionMade => "decision_made",
            Self::TrustDelta => "trust_delta",
            Self::ExecutionStarted => "execution_started",
            Self::ExecutionCompleted => "execution_completed",
            Self::ExecutionFailed => "execution_failed",
            Self::ProbeExecuted => "probe_executed",
            Self::CircuitBreakerTripped => "circuit_breaker_tripped",
            Self::PolicyChanged => "policy_changed",
        }
    }
}

impl fmt::Display for ProofEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable, hash-chained audit record.
///
/// `hash` covers the event content plus `prev_hash`; `prev_hash` is the
/// hash of the immediately preceding event in emission order (`None` only
/// for the first event in the ledger).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofEvent {
    pub event_id: Uuid,
    pub event_type: ProofEventType,
    /// Groups every event belonging to one logical request
    pub correlation_id: String,
    pub agent_id: Option<AgentId>,
    /// Typed payload, structured per event type
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    pub prev_hash: Option<String>,
    pub hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names_are_stable() {
        assert_eq!(ProofEventType::IntentReceived.as_str(), "intent_received");
        assert_eq!(ProofEventType::ExecutionFailed.as_str(), "execution_failed");
        assert_eq!(
            ProofEventType::CircuitBreakerTripped.to_string(),
            "circuit_breaker_tripped"
        );
    }
}
