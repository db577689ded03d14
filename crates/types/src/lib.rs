//! Shared types for the agenttrust kernel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier for an agent, assigned by the surrounding platform.
///
/// The kernel treats this as an opaque key: profiles, probe stats, breaker
/// state, and ledger history are all keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Agent autonomy role, ordered from least to most autonomous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only observation, no actions
    Observer,
    /// May produce reports and summaries
    Reporter,
    /// Acts only under direct instruction
    Assistant,
    /// Executes routine operations unattended
    Operator,
    /// Oversees and corrects other agents
    Supervisor,
    /// Plans and delegates work
    Manager,
    /// Sets objectives across agent groups
    Director,
    /// Commits resources on behalf of the organization
    Executive,
    /// Full self-directed autonomy
    Sovereign,
}

impl Role {
    /// All roles in ascending autonomy order.
    pub const ALL: [Role; 9] = [
        Role::Observer,
        Role::Reporter,
        Role::Assistant,
        Role::Operator,
        Role::Supervisor,
        Role::Manager,
        Role::Director,
        Role::Executive,
        Role::Sovereign,
    ];

    /// Zero-based position in the autonomy ordering.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Operational scope tier, ordered from narrowest to broadest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Isolated sandbox, no external effects
    Sandbox,
    /// Internal systems only
    Internal,
    /// Limited external scope with guardrails
    Limited,
    /// Standard production scope
    Standard,
    /// Broad cross-system scope
    Broad,
    /// Unrestricted operational scope
    Unrestricted,
}

impl Tier {
    /// All tiers in ascending scope order.
    pub const ALL: [Tier; 6] = [
        Tier::Sandbox,
        Tier::Internal,
        Tier::Limited,
        Tier::Standard,
        Tier::Broad,
        Tier::Unrestricted,
    ];

    /// Zero-based position in the scope ordering.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Trust classification derived from an agent's adjusted score.
///
/// Bands are never assigned directly; they are always the threshold bucket
/// of the adjusted composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustBand {
    /// No established trust
    T0Untrusted,
    /// Minimal operating history
    T1Provisional,
    /// Basic track record
    T2Basic,
    /// Established reliable behavior
    T3Established,
    /// Consistently trusted
    T4Trusted,
    /// Certified at the highest level
    T5Certified,
}

impl TrustBand {
    /// Zero-based band position (T0 = 0).
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl Default for TrustBand {
    fn default() -> Self {
        Self::T0Untrusted
    }
}

impl fmt::Display for TrustBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T0Untrusted => write!(f, "T0 Untrusted"),
            Self::T1Provisional => write!(f, "T1 Provisional"),
            Self::T2Basic => write!(f, "T2 Basic"),
            Self::T3Established => write!(f, "T3 Established"),
            Self::T4Trusted => write!(f, "T4 Trusted"),
            Self::T5Certified => write!(f, "T5 Certified"),
        }
    }
}

/// How much visibility exists into an agent's behavior.
///
/// Less-observed agents are discounted: a high raw composite from an agent
/// nobody can inspect is worth less than the same composite from a fully
/// instrumented one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationTier {
    /// No visibility beyond inputs and outputs
    BlackBox,
    /// Agent self-reports its activity
    SelfReported,
    /// Periodic sampling of behavior
    Sampled,
    /// Continuous monitoring of actions
    Monitored,
    /// Full instrumentation and traceability
    Instrumented,
}

impl ObservationTier {
    /// Multiplicative discount applied to the composite score.
    pub fn discount_factor(&self) -> f64 {
        match self {
            Self::BlackBox => 0.60,
            Self::SelfReported => 0.70,
            Self::Sampled => 0.80,
            Self::Monitored => 0.90,
            Self::Instrumented => 1.00,
        }
    }
}

impl Default for ObservationTier {
    fn default() -> Self {
        Self::BlackBox
    }
}

/// The five trust scoring dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustDimension {
    /// CT: cumulative earned trust from observed behavior
    Cumulative,
    /// BT: burned trust from violations and failures (penalty dimension)
    Burned,
    /// GT: granted trust from certifications and attestations
    Granted,
    /// XT: exceptional trust awarded by peers
    Exceptional,
    /// AC: base trust of the agent's class
    AgentClass,
}

impl TrustDimension {
    /// All dimensions in canonical order.
    pub const ALL: [TrustDimension; 5] = [
        TrustDimension::Cumulative,
        TrustDimension::Burned,
        TrustDimension::Granted,
        TrustDimension::Exceptional,
        TrustDimension::AgentClass,
    ];

    /// Stable metric key used in weight configuration.
    pub fn metric_key(&self) -> &'static str {
        match self {
            Self::Cumulative => "CT",
            Self::Burned => "BT",
            Self::Granted => "GT",
            Self::Exceptional => "XT",
            Self::AgentClass => "AC",
        }
    }

    /// Whether this dimension counts against the composite.
    pub fn is_penalty(&self) -> bool {
        matches!(self, Self::Burned)
    }
}

impl fmt::Display for TrustDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.metric_key())
    }
}

/// A timestamped trust signal attached to a profile.
///
/// Evidence is append-only: once attached it is never edited or removed,
/// only folded into the dimension scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    /// Unique evidence id
    pub id: String,
    /// The dimension this signal nudges
    pub dimension: TrustDimension,
    /// Signed magnitude applied to the dimension score
    pub delta: f64,
    /// Human-readable description of the signal
    pub description: String,
    /// Where the signal came from
    pub source: String,
    /// When the signal was recorded
    pub recorded_at: DateTime<Utc>,
}

impl Evidence {
    pub fn new(
        dimension: TrustDimension,
        delta: f64,
        description: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            dimension,
            delta,
            description: description.into(),
            source: source.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Nominal sum of a weight vector.
pub const WEIGHT_VECTOR_NOMINAL_SUM: f64 = 1000.0;

/// Tolerance around the nominal sum (fraction).
pub const WEIGHT_VECTOR_TOLERANCE: f64 = 0.10;

/// Non-negative weight per trust dimension, nominal sum 1000 (±10%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    pub cumulative: f64,
    pub burned: f64,
    pub granted: f64,
    pub exceptional: f64,
    pub agent_class: f64,
}

impl WeightVector {
    /// Construct a weight vector, validating bounds and sum tolerance.
    pub fn new(
        cumulative: f64,
        burned: f64,
        granted: f64,
        exceptional: f64,
        agent_class: f64,
    ) -> Result<Self> {
        let vector = Self {
            cumulative,
            burned,
            granted,
            exceptional,
            agent_class,
        };
        vector.validate()?;
        Ok(vector)
    }

    /// Weight for a single dimension.
    pub fn get(&self, dimension: TrustDimension) -> f64 {
        match dimension {
            TrustDimension::Cumulative => self.cumulative,
            TrustDimension::Burned => self.burned,
            TrustDimension::Granted => self.granted,
            TrustDimension::Exceptional => self.exceptional,
            TrustDimension::AgentClass => self.agent_class,
        }
    }

    /// Set the weight for a single dimension.
    pub fn set(&mut self, dimension: TrustDimension, weight: f64) {
        match dimension {
            TrustDimension::Cumulative => self.cumulative = weight,
            TrustDimension::Burned => self.burned = weight,
            TrustDimension::Granted => self.granted = weight,
            TrustDimension::Exceptional => self.exceptional = weight,
            TrustDimension::AgentClass => self.agent_class = weight,
        }
    }

    /// Sum of all dimension weights.
    pub fn total(&self) -> f64 {
        TrustDimension::ALL.iter().map(|d| self.get(*d)).sum()
    }

    /// Check non-negativity and the nominal-sum tolerance.
    pub fn validate(&self) -> Result<()> {
        for dimension in TrustDimension::ALL {
            let weight = self.get(dimension);
            if weight < 0.0 || !weight.is_finite() {
                return Err(TypesError::InvalidWeight(format!(
                    "weight for {} must be finite and non-negative, got {}",
                    dimension.metric_key(),
                    weight
                )));
            }
        }
        let total = self.total();
        let lower = WEIGHT_VECTOR_NOMINAL_SUM * (1.0 - WEIGHT_VECTOR_TOLERANCE);
        let upper = WEIGHT_VECTOR_NOMINAL_SUM * (1.0 + WEIGHT_VECTOR_TOLERANCE);
        if total < lower || total > upper {
            return Err(TypesError::InvalidWeight(format!(
                "weight sum {} outside tolerance [{}, {}]",
                total, lower, upper
            )));
        }
        Ok(())
    }
}

/// A domain-specific adjustment to one dimension's canonical weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightDelta {
    /// The dimension being adjusted
    pub dimension: TrustDimension,
    /// Signed adjustment added to the canonical weight
    pub adjustment: f64,
    /// Why the adjustment exists
    pub reason: String,
    /// When the adjustment was applied
    pub applied_at: DateTime<Utc>,
    /// Optional expiry; an expired delta is equivalent to an omitted one
    pub expires_at: Option<DateTime<Utc>>,
}

impl WeightDelta {
    pub fn new(dimension: TrustDimension, adjustment: f64, reason: impl Into<String>) -> Self {
        Self {
            dimension,
            adjustment,
            reason: reason.into(),
            applied_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the delta has lapsed as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// How domain deltas combine with the canonical weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Ignore deltas, use canonical weights as-is
    Canonical,
    /// Apply each delta directly, clamped at zero
    DeltaOverride,
    /// Average overlapping deltas per dimension before applying
    Blended,
}

/// Errors for shared type construction and validation
#[derive(Error, Debug)]
pub enum TypesError {
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),

    #[error("Invalid evidence: {0}")]
    InvalidEvidence(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Result type for shared type operations
pub type Result<T> = std::result::Result<T, TypesError>;
