//! Event persistence boundary.
//!
//! The in-memory vector is the default backend; durable implementations
//! swap in behind the trait and must preserve emission order, since chain
//! position is the ordering the verifier walks.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use agenttrust_types::AgentId;

use crate::event::{ProofEvent, ProofEventType};
use crate::Result;

/// Storage interface for proof events, append-only in chain order.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: ProofEvent) -> Result<()>;

    async fn get(&self, event_id: &Uuid) -> Result<Option<ProofEvent>>;

    /// Every event in chain order.
    async fn all(&self) -> Result<Vec<ProofEvent>>;

    /// Events of one correlation, in chain order.
    async fn by_correlation(&self, correlation_id: &str) -> Result<Vec<ProofEvent>>;

    /// Events naming one agent, in chain order.
    async fn by_agent(&self, agent_id: &AgentId) -> Result<Vec<ProofEvent>>;

    async fn by_type(&self, event_type: ProofEventType) -> Result<Vec<ProofEvent>>;

    /// The most recently appended event.
    async fn last(&self) -> Result<Option<ProofEvent>>;

    async fn count(&self) -> Result<usize>;
}

/// Default in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<ProofEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite one stored event's payload in place, without rehashing.
    ///
    /// Exists only so integrity tests can simulate after-the-fact
    /// tampering with the backing store.
    #[cfg(test)]
    pub async fn tamper_payload(&self, index: usize, payload: serde_json::Value) {
        let mut events = self.events.write().await;
        if let Some(event) = events.get_mut(index) {
            event.payload = payload;
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: ProofEvent) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }

    async fn get(&self, event_id: &Uuid) -> Result<Option<ProofEvent>> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .find(|e| e.event_id == *event_id)
            .cloned())
    }

    async fn all(&self) -> Result<Vec<ProofEvent>> {
        Ok(self.events.read().await.clone())
    }

    async fn by_correlation(&self, correlation_id: &str) -> Result<Vec<ProofEvent>> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .filter(|e| e.correlation_id == correlation_id)
            .cloned()
            .collect())
    }

    async fn by_agent(&self, agent_id: &AgentId) -> Result<Vec<ProofEvent>> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .filter(|e| e.agent_id.as_ref() == Some(agent_id))
            .cloned()
            .collect())
    }

    async fn by_type(&self, event_type: ProofEventType) -> Result<Vec<ProofEvent>> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn last(&self) -> Result<Option<ProofEvent>> {
        Ok(self.events.read().await.last().cloned())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.events.read().await.len())
    }
}
