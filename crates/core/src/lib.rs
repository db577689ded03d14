//! Orchestration layer of the agenttrust kernel.
//!
//! `process_intent` sequences the full decision flow for one request:
//! trust profile lookup, role-gate and policy authorization, proof-plane
//! logging, and the hand-off to the registered executor, returning a
//! unified result with per-phase timings.

use thiserror::Error;

pub mod bridge;
pub mod execution;
pub mod intent;
pub mod orchestrator;
pub mod retry;

pub use bridge::{LedgerCanaryListener, LedgerTrustListener};
pub use execution::{ExecutionOutcome, ExecutorError, ExecutorRegistry, IntentExecutor};
pub use intent::Intent;
pub use orchestrator::{
    OrchestrationResult, Orchestrator, OrchestratorConfig, PhaseTimings, ProcessOptions,
};
pub use retry::{ErrorClass, RetryPolicy};

/// Errors that can occur during orchestration
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Invalid intent: {0}")]
    InvalidIntent(String),

    #[error("Executor already registered for action: {0}")]
    DuplicateExecutor(String),

    #[error("Trust error: {0}")]
    Trust(#[from] agenttrust_trust::TrustError),

    #[error("Proof plane error: {0}")]
    Proof(#[from] agenttrust_proof::ProofError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidIntent(_) => "VALIDATION",
            Self::DuplicateExecutor(_) => "CONFLICT",
            Self::Trust(inner) => inner.code(),
            Self::Proof(inner) => inner.code(),
            Self::Internal(_) => "INTERNAL",
        }
    }
}

/// Operator-facing error report with a stable code and trace id.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
    pub trace_id: String,
}

impl ErrorReport {
    pub fn from_error(error: &OrchestratorError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;
