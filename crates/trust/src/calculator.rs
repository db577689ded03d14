//! Pure trust scoring: evidence in, profile out.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use agenttrust_types::{AgentId, Evidence, ObservationTier, TrustBand, WeightVector};

use crate::profile::{DimensionScores, TrustProfile};
use crate::weights::canonical_weights;
use crate::Result;

/// Adjusted-score thresholds for each band, ascending.
pub const BAND_THRESHOLDS: [(TrustBand, f64); 6] = [
    (TrustBand::T0Untrusted, 0.0),
    (TrustBand::T1Provisional, 150.0),
    (TrustBand::T2Basic, 300.0),
    (TrustBand::T3Established, 500.0),
    (TrustBand::T4Trusted, 700.0),
    (TrustBand::T5Certified, 850.0),
];

/// Upper bound of the composite scale.
pub const COMPOSITE_SCORE_MAX: f64 = 1000.0;

/// Determine the band for an adjusted score.
pub fn band_for_score(adjusted_score: f64) -> TrustBand {
    let mut band = TrustBand::T0Untrusted;
    for (candidate, threshold) in BAND_THRESHOLDS {
        if adjusted_score >= threshold {
            band = candidate;
        } else {
            break;
        }
    }
    band
}

/// Calculator configuration.
#[derive(Debug, Clone)]
pub struct CalculatorConfig {
    /// Baseline AC score for a freshly created profile
    pub agent_class_base: f64,
    /// Half-life for score decay when an agent goes quiet
    pub decay_half_life: Duration,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            agent_class_base: 50.0,
            decay_half_life: Duration::days(30),
        }
    }
}

/// Stateless trust calculator.
///
/// Every method is an immutable-in/immutable-out computation; persistence
/// and notifications live in the service layer.
#[derive(Debug, Clone, Default)]
pub struct TrustCalculator {
    config: CalculatorConfig,
}

impl TrustCalculator {
    pub fn new(config: CalculatorConfig) -> Self {
        Self { config }
    }

    /// Produce a fresh profile from scratch.
    pub fn calculate(
        &self,
        agent_id: AgentId,
        observation_tier: ObservationTier,
        evidence: Vec<Evidence>,
        weights: Option<WeightVector>,
    ) -> Result<TrustProfile> {
        let weights = match weights {
            Some(vector) => {
                vector.validate()?;
                vector
            }
            None => canonical_weights(),
        };

        let mut dimensions = DimensionScores::baseline(self.config.agent_class_base);
        for item in &evidence {
            dimensions.apply(item.dimension, item.delta);
        }

        Ok(self.compose(
            agent_id,
            dimensions,
            weights,
            observation_tier,
            evidence,
            1,
            Utc::now(),
        ))
    }

    /// Fold new evidence into an existing profile.
    ///
    /// Prior evidence is retained; the new items are appended and their
    /// deltas applied on top of the existing dimension scores.
    pub fn recalculate(
        &self,
        existing: &TrustProfile,
        new_evidence: Vec<Evidence>,
    ) -> TrustProfile {
        let mut dimensions = existing.dimensions.clone();
        for item in &new_evidence {
            dimensions.apply(item.dimension, item.delta);
        }

        let mut evidence = existing.evidence.clone();
        evidence.extend(new_evidence);

        self.compose(
            existing.agent_id.clone(),
            dimensions,
            existing.weights.clone(),
            existing.observation_tier,
            evidence,
            existing.version + 1,
            Utc::now(),
        )
    }

    /// Apply time decay with no new evidence.
    ///
    /// Scores halve every `decay_half_life`; the band is re-derived from
    /// the decayed composite.
    pub fn apply_decay(&self, existing: &TrustProfile, now: DateTime<Utc>) -> TrustProfile {
        let elapsed = (now - existing.calculated_at).num_seconds().max(0) as f64;
        let half_life = self.config.decay_half_life.num_seconds() as f64;
        let factor = 0.5_f64.powf(elapsed / half_life);

        debug!(
            agent = %existing.agent_id,
            elapsed_secs = elapsed,
            factor,
            "applying trust decay"
        );

        let mut dimensions = existing.dimensions.clone();
        dimensions.decay(factor);

        self.compose(
            existing.agent_id.clone(),
            dimensions,
            existing.weights.clone(),
            existing.observation_tier,
            existing.evidence.clone(),
            existing.version + 1,
            now,
        )
    }

    /// Derive composite, adjusted score, and band from dimension scores.
    #[allow(clippy::too_many_arguments)]
    fn compose(
        &self,
        agent_id: AgentId,
        dimensions: DimensionScores,
        weights: WeightVector,
        observation_tier: ObservationTier,
        evidence: Vec<Evidence>,
        version: u64,
        calculated_at: DateTime<Utc>,
    ) -> TrustProfile {
        let total_weight = weights.total();
        let weighted = dimensions.cumulative * weights.cumulative
            + dimensions.granted * weights.granted
            + dimensions.exceptional * weights.exceptional
            + dimensions.agent_class * weights.agent_class
            - dimensions.burned * weights.burned;

        // Dimension scores run 0-100, so the weighted mean does too;
        // scale to the 0-1000 composite range.
        let composite_score = if total_weight > 0.0 {
            ((weighted / total_weight) * 10.0).clamp(0.0, COMPOSITE_SCORE_MAX)
        } else {
            0.0
        };

        let adjusted_score = composite_score * observation_tier.discount_factor();
        let band = band_for_score(adjusted_score);

        TrustProfile {
            agent_id,
            dimensions,
            weights,
            composite_score,
            observation_tier,
            adjusted_score,
            band,
            evidence,
            calculated_at,
            version,
        }
    }
}
