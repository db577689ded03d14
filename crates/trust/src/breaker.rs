//! Per-agent circuit breaker.
//!
//! A tripped breaker is a hard stop: the orchestrator refuses further
//! actions for the agent until an operator resets it. The canary service
//! trips it on critical probe failure; the registry itself lives alongside
//! the trust service so both share one view of halted agents.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use agenttrust_types::AgentId;

/// Record of one breaker trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerTrip {
    pub agent_id: AgentId,
    pub reason: String,
    pub tripped_at: DateTime<Utc>,
}

/// Registry of halted agents.
#[derive(Debug, Default)]
pub struct CircuitBreaker {
    tripped: RwLock<HashMap<AgentId, BreakerTrip>>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the breaker for an agent. Returns false if it was already
    /// tripped (the original trip record is kept).
    pub fn trip(&self, agent_id: &AgentId, reason: impl Into<String>) -> bool {
        let mut tripped = self.write_tripped();
        if tripped.contains_key(agent_id) {
            return false;
        }
        let reason = reason.into();
        warn!(agent = %agent_id, %reason, "circuit breaker tripped");
        tripped.insert(
            agent_id.clone(),
            BreakerTrip {
                agent_id: agent_id.clone(),
                reason,
                tripped_at: Utc::now(),
            },
        );
        true
    }

    pub fn is_tripped(&self, agent_id: &AgentId) -> bool {
        self.read_tripped().contains_key(agent_id)
    }

    pub fn get(&self, agent_id: &AgentId) -> Option<BreakerTrip> {
        self.read_tripped().get(agent_id).cloned()
    }

    /// Operator reset; returns whether the agent was tripped.
    pub fn reset(&self, agent_id: &AgentId) -> bool {
        self.write_tripped().remove(agent_id).is_some()
    }

    pub fn tripped_agents(&self) -> Vec<BreakerTrip> {
        let mut trips: Vec<BreakerTrip> = self.read_tripped().values().cloned().collect();
        trips.sort_by(|a, b| a.tripped_at.cmp(&b.tripped_at));
        trips
    }

    fn read_tripped(&self) -> std::sync::RwLockReadGuard<'_, HashMap<AgentId, BreakerTrip>> {
        self.tripped.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_tripped(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<AgentId, BreakerTrip>> {
        self.tripped.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
