//! Weight merging: canonical dimension weights plus domain deltas.

use chrono::{DateTime, Utc};
use tracing::debug;

use agenttrust_types::{MergeStrategy, TrustDimension, WeightDelta, WeightVector};

use crate::Result;

/// The canonical weight vector (sum 1000).
pub fn canonical_weights() -> WeightVector {
    WeightVector {
        cumulative: 350.0,
        burned: 200.0,
        granted: 200.0,
        exceptional: 100.0,
        agent_class: 150.0,
    }
}

/// Named domain presets as delta lists over the canonical vector.
///
/// Returns `None` for an unknown preset name.
pub fn domain_preset(name: &str) -> Option<Vec<WeightDelta>> {
    match name {
        "healthcare" => Some(vec![
            WeightDelta::new(
                TrustDimension::Burned,
                50.0,
                "clinical settings weigh violations more heavily",
            ),
            WeightDelta::new(
                TrustDimension::Exceptional,
                -40.0,
                "peer endorsement carries less weight than safety record",
            ),
        ]),
        "finance" => Some(vec![
            WeightDelta::new(
                TrustDimension::Granted,
                60.0,
                "regulatory certification dominates",
            ),
            WeightDelta::new(
                TrustDimension::Exceptional,
                -50.0,
                "peer awards are not an audit",
            ),
        ]),
        _ => None,
    }
}

/// Merge domain deltas into the canonical weights.
///
/// Expired deltas are equivalent to omitted ones. Adjusted weights are
/// clamped at zero; the merged vector keeps the canonical value for any
/// dimension without an unexpired delta.
pub fn merge_weights(
    deltas: &[WeightDelta],
    strategy: MergeStrategy,
    now: DateTime<Utc>,
) -> Result<WeightVector> {
    let mut merged = canonical_weights();

    if strategy == MergeStrategy::Canonical {
        return Ok(merged);
    }

    let active: Vec<&WeightDelta> = deltas.iter().filter(|d| !d.is_expired(now)).collect();
    debug!(
        total = deltas.len(),
        active = active.len(),
        ?strategy,
        "merging weight deltas"
    );

    for dimension in TrustDimension::ALL {
        let matching: Vec<&&WeightDelta> =
            active.iter().filter(|d| d.dimension == dimension).collect();
        if matching.is_empty() {
            continue;
        }

        let adjustment = match strategy {
            MergeStrategy::Canonical => 0.0,
            // Each delta lands in full.
            MergeStrategy::DeltaOverride => matching.iter().map(|d| d.adjustment).sum(),
            // Overlapping deltas are averaged with equal weight.
            MergeStrategy::Blended => {
                matching.iter().map(|d| d.adjustment).sum::<f64>() / matching.len() as f64
            }
        };

        let adjusted = (merged.get(dimension) + adjustment).max(0.0);
        merged.set(dimension, adjusted);
    }

    merged.validate()?;
    Ok(merged)
}
