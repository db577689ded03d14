//! Canary probe verification for the agenttrust kernel
//!
//! Trend analysis catches slow degradation; it misses an agent that is
//! confidently wrong. Canary probes are known-answer adversarial checks
//! injected at random intervals. A failing critical probe trips the
//! shared circuit breaker immediately, halting the agent.

mod error;
mod probe;
mod scheduler;
mod service;
mod stats;
mod validation;

pub use error::CanaryError;
pub use probe::{CanaryProbe, ProbeCategory, ProbeLibrary, ValidationMode};
pub use scheduler::{ProbeScheduler, SchedulerConfig};
pub use service::{
    AgentResponder, CanaryConfig, CanaryFailureListener, CanaryProbeService, ListenerError,
    ProbeResult, ResponderError,
};
pub use stats::{AgentProbeStats, CategoryStats};
pub use validation::{validate_response, SemanticJudge};

/// Result type for canary operations
pub type Result<T> = std::result::Result<T, CanaryError>;
