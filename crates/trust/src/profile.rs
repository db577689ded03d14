//! The trust profile: per-agent scoring state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use agenttrust_types::{AgentId, Evidence, ObservationTier, TrustBand, TrustDimension, WeightVector};

/// Bound on every dimension score prior to weighting.
pub const DIMENSION_SCORE_MAX: f64 = 100.0;

/// Per-dimension raw scores, each bounded to 0–100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub cumulative: f64,
    pub burned: f64,
    pub granted: f64,
    pub exceptional: f64,
    pub agent_class: f64,
}

impl DimensionScores {
    /// Baseline scores for a new profile: everything at zero except the
    /// agent-class base.
    pub fn baseline(agent_class_base: f64) -> Self {
        Self {
            cumulative: 0.0,
            burned: 0.0,
            granted: 0.0,
            exceptional: 0.0,
            agent_class: agent_class_base.clamp(0.0, DIMENSION_SCORE_MAX),
        }
    }

    pub fn get(&self, dimension: TrustDimension) -> f64 {
        match dimension {
            TrustDimension::Cumulative => self.cumulative,
            TrustDimension::Burned => self.burned,
            TrustDimension::Granted => self.granted,
            TrustDimension::Exceptional => self.exceptional,
            TrustDimension::AgentClass => self.agent_class,
        }
    }

    /// Nudge a dimension by a signed delta, clamped to the valid range.
    pub fn apply(&mut self, dimension: TrustDimension, delta: f64) {
        let next = (self.get(dimension) + delta).clamp(0.0, DIMENSION_SCORE_MAX);
        match dimension {
            TrustDimension::Cumulative => self.cumulative = next,
            TrustDimension::Burned => self.burned = next,
            TrustDimension::Granted => self.granted = next,
            TrustDimension::Exceptional => self.exceptional = next,
            TrustDimension::AgentClass => self.agent_class = next,
        }
    }

    /// Scale the decaying dimensions by a factor in (0, 1].
    ///
    /// The agent-class base does not decay; old penalties fade on the same
    /// curve as old merit.
    pub fn decay(&mut self, factor: f64) {
        self.cumulative *= factor;
        self.burned *= factor;
        self.granted *= factor;
        self.exceptional *= factor;
    }
}

/// The trust state of one agent.
///
/// `band` is always derived from `adjusted_score` by thresholding — it is
/// never written independently of a recalculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustProfile {
    pub agent_id: AgentId,
    /// Raw per-dimension scores
    pub dimensions: DimensionScores,
    /// Weight vector the composite was computed with
    pub weights: WeightVector,
    /// Weighted composite, normalized to 0–1000
    pub composite_score: f64,
    /// Visibility level the adjustment was computed for
    pub observation_tier: ObservationTier,
    /// Composite after the observation-tier discount
    pub adjusted_score: f64,
    /// Threshold bucket of the adjusted score
    pub band: TrustBand,
    /// Every signal that has contributed to this profile, append-only
    pub evidence: Vec<Evidence>,
    pub calculated_at: DateTime<Utc>,
    /// Monotonically increasing profile version
    pub version: u64,
}

impl TrustProfile {
    /// Age of the profile relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.calculated_at
    }

    /// Whether the profile is older than the given staleness window.
    pub fn is_stale(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        self.age(now) > window
    }
}

impl fmt::Display for TrustProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (adjusted {:.1}, v{})",
            self.agent_id, self.band, self.adjusted_score, self.version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_scores_clamp() {
        let mut scores = DimensionScores::baseline(50.0);
        scores.apply(TrustDimension::Cumulative, 150.0);
        assert_eq!(scores.cumulative, DIMENSION_SCORE_MAX);

        scores.apply(TrustDimension::Cumulative, -500.0);
        assert_eq!(scores.cumulative, 0.0);

        scores.apply(TrustDimension::Burned, 30.0);
        assert_eq!(scores.burned, 30.0);
    }

    #[test]
    fn test_decay_spares_agent_class() {
        let mut scores = DimensionScores::baseline(60.0);
        scores.apply(TrustDimension::Cumulative, 80.0);
        scores.apply(TrustDimension::Burned, 40.0);

        scores.decay(0.5);
        assert_eq!(scores.cumulative, 40.0);
        assert_eq!(scores.burned, 20.0);
        assert_eq!(scores.agent_class, 60.0);
    }

    #[test]
    fn test_baseline_clamps_class_base() {
        let scores = DimensionScores::baseline(250.0);
        assert_eq!(scores.agent_class, DIMENSION_SCORE_MAX);
    }
}
