//! The intent: one requested action entering the kernel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use agenttrust_types::{AgentId, Role, Tier};

use crate::{OrchestratorError, Result};

/// A requested action, validated structurally before any side effect.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Intent {
    /// Unique intent id; doubles as the correlation id for audit events
    pub intent_id: String,
    pub agent_id: AgentId,
    /// The action type, resolved against the executor registry
    #[validate(length(min = 1, message = "action must not be empty"))]
    pub action: String,
    /// Opaque parameters passed through to the executor
    #[serde(default)]
    pub params: serde_json::Value,
    /// The role the agent claims for this action
    pub role: Role,
    /// The operational tier the action requires
    pub tier: Tier,
    /// Optional policy domain (e.g. "payments")
    pub domain: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Intent {
    pub fn new(agent_id: AgentId, action: impl Into<String>, role: Role, tier: Tier) -> Self {
        Self {
            intent_id: Uuid::new_v4().to_string(),
            agent_id,
            action: action.into(),
            params: serde_json::Value::Null,
            role,
            tier,
            domain: None,
            submitted_at: Utc::now(),
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Structural validation; fails fast with no side effects.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| OrchestratorError::InvalidIntent(e.to_string()))
    }
}
