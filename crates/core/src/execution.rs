//! The execution boundary: per-action executors behind a registry.
//!
//! The orchestrator treats executors as opaque: it passes the intent,
//! decision, and profile through, and only measures duration and success.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agenttrust_rolegate::PolicyDecision;
use agenttrust_trust::TrustProfile;

use crate::intent::Intent;
use crate::{OrchestratorError, Result};

/// Executor error type; classified for retry by the orchestrator.
pub type ExecutorError = Box<dyn std::error::Error + Send + Sync>;

/// An external action handler registered per action type.
#[async_trait]
pub trait IntentExecutor: Send + Sync {
    async fn execute(
        &self,
        intent: &Intent,
        decision: &PolicyDecision,
        profile: &TrustProfile,
        params: &serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ExecutorError>;
}

/// What the orchestrator records about one execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub action: String,
    pub success: bool,
    /// Executor output on success
    pub output: Option<serde_json::Value>,
    /// Error text on failure
    pub error: Option<String>,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

/// Open registry of executors keyed by action type.
///
/// Registration guards against duplicate keys; lookups are lock-free
/// clones of the `Arc` handle.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: RwLock<HashMap<String, Arc<dyn IntentExecutor>>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor for an action type; duplicates are rejected.
    pub fn register(
        &self,
        action: impl Into<String>,
        executor: Arc<dyn IntentExecutor>,
    ) -> Result<()> {
        let action = action.into();
        let mut executors = self.write_executors();
        if executors.contains_key(&action) {
            return Err(OrchestratorError::DuplicateExecutor(action));
        }
        executors.insert(action, executor);
        Ok(())
    }

    pub fn get(&self, action: &str) -> Option<Arc<dyn IntentExecutor>> {
        self.read_executors().get(action).cloned()
    }

    pub fn registered_actions(&self) -> Vec<String> {
        let mut actions: Vec<String> = self.read_executors().keys().cloned().collect();
        actions.sort();
        actions
    }

    fn read_executors(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<dyn IntentExecutor>>> {
        self.executors
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_executors(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<dyn IntentExecutor>>> {
        self.executors
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
