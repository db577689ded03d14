//! Response validation per probe mode.

use async_trait::async_trait;
use regex::RegexBuilder;

use crate::probe::{CanaryProbe, ValidationMode};
use crate::{CanaryError, Result};

/// External similarity judge backing the semantic validation mode.
#[async_trait]
pub trait SemanticJudge: Send + Sync {
    /// Whether `actual` means the same thing as `expected`.
    async fn is_equivalent(&self, expected: &str, actual: &str) -> Result<bool>;
}

/// Check a response against a probe's expected answers.
///
/// Returns an error only for misconfiguration (bad regex, semantic mode
/// without a judge); the caller records those as probe failures.
pub async fn validate_response(
    probe: &CanaryProbe,
    response: &str,
    judge: Option<&dyn SemanticJudge>,
) -> Result<bool> {
    let response_trimmed = response.trim();
    let response_lower = response_trimmed.to_lowercase();

    match probe.validation_mode {
        ValidationMode::Exact => {
            let expected = probe.expected[0].trim();
            Ok(response_trimmed.eq_ignore_ascii_case(expected))
        }
        ValidationMode::Contains => Ok(probe
            .expected
            .iter()
            .any(|e| response_lower.contains(&e.trim().to_lowercase()))),
        ValidationMode::NotContains => Ok(!probe
            .expected
            .iter()
            .any(|e| response_lower.contains(&e.trim().to_lowercase()))),
        ValidationMode::OneOf => Ok(probe
            .expected
            .iter()
            .any(|e| response_trimmed.eq_ignore_ascii_case(e.trim()))),
        ValidationMode::Regex => {
            let pattern = &probe.expected[0];
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    CanaryError::InvalidProbe(format!(
                        "{}: bad validation pattern: {}",
                        probe.probe_id, e
                    ))
                })?;
            Ok(regex.is_match(response_trimmed))
        }
        ValidationMode::Semantic => {
            let judge = judge.ok_or_else(|| {
                CanaryError::ValidationError(format!(
                    "{}: semantic validation requires a judge",
                    probe.probe_id
                ))
            })?;
            for expected in &probe.expected {
                if judge.is_equivalent(expected, response_trimmed).await? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}
