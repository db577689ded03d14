//! Trust change and violation notifications.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agenttrust_types::{AgentId, TrustBand};

/// Payload delivered to listeners on every saved profile change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustChange {
    pub agent_id: AgentId,
    pub previous_score: f64,
    pub new_score: f64,
    pub previous_band: TrustBand,
    pub new_band: TrustBand,
    pub version: u64,
    pub occurred_at: DateTime<Utc>,
}

/// What kind of drop triggered a violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Band dropped by at least the configured number of levels
    BandDrop { from: TrustBand, to: TrustBand },
    /// Adjusted score dropped by at least the configured percentage
    ScoreDrop { percent: f64 },
}

/// Severity scaled by the size of the drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Medium,
    High,
    Critical,
}

/// A detected trust violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustViolation {
    pub agent_id: AgentId,
    pub kind: ViolationKind,
    pub severity: ViolationSeverity,
    pub details: String,
    pub detected_at: DateTime<Utc>,
}

/// Listener error type; failures are logged by the emitter, never raised.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Sink for trust notifications.
///
/// Implementations must tolerate being called concurrently. Returning an
/// error only produces a log line on the emitting side; it never affects
/// the profile operation that triggered the notification or any sibling
/// listener.
#[async_trait]
pub trait TrustListener: Send + Sync {
    async fn on_trust_change(&self, change: &TrustChange) -> Result<(), ListenerError>;

    async fn on_trust_violation(&self, violation: &TrustViolation) -> Result<(), ListenerError>;
}
