//! Profile lifecycle service: create, update, refresh, decay, notify.

use std::sync::{Arc, RwLock};

use chrono::{Duration, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use agenttrust_types::{AgentId, Evidence, ObservationTier, WeightVector};

use crate::breaker::CircuitBreaker;
use crate::calculator::{CalculatorConfig, TrustCalculator};
use crate::notify::{
    TrustChange, TrustListener, TrustViolation, ViolationKind, ViolationSeverity,
};
use crate::profile::TrustProfile;
use crate::store::{ProfileQuery, ProfileStore};
use crate::{Result, TrustError};

/// Service configuration.
#[derive(Debug, Clone)]
pub struct TrustServiceConfig {
    /// Profiles older than this are due for a decay refresh
    pub staleness_window: Duration,
    /// Band levels an agent must drop to count as a violation
    pub band_drop_threshold: usize,
    /// Fractional adjusted-score drop that counts as a violation
    pub score_drop_threshold: f64,
    /// Calculator settings
    pub calculator: CalculatorConfig,
}

impl Default for TrustServiceConfig {
    fn default() -> Self {
        Self {
            staleness_window: Duration::hours(24),
            band_drop_threshold: 1,
            score_drop_threshold: 0.20,
            calculator: CalculatorConfig::default(),
        }
    }
}

/// Result of a refresh request.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// Whether decay was actually applied and saved
    pub refreshed: bool,
    pub profile: TrustProfile,
}

/// Owns profile lifecycle on top of the calculator and a pluggable store.
pub struct TrustProfileService {
    store: Arc<dyn ProfileStore>,
    calculator: TrustCalculator,
    config: TrustServiceConfig,
    breaker: Arc<CircuitBreaker>,
    listeners: RwLock<Vec<Arc<dyn TrustListener>>>,
}

impl TrustProfileService {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self::with_config(store, TrustServiceConfig::default())
    }

    pub fn with_config(store: Arc<dyn ProfileStore>, config: TrustServiceConfig) -> Self {
        Self {
            store,
            calculator: TrustCalculator::new(config.calculator.clone()),
            config,
            breaker: Arc::new(CircuitBreaker::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// The breaker registry shared with the canary service.
    pub fn breaker(&self) -> Arc<CircuitBreaker> {
        Arc::clone(&self.breaker)
    }

    /// Register a notification sink.
    pub fn register_listener(&self, listener: Arc<dyn TrustListener>) {
        self.write_listeners().push(listener);
    }

    /// Create a profile for an agent that has none.
    pub async fn create(
        &self,
        agent_id: AgentId,
        observation_tier: ObservationTier,
        evidence: Vec<Evidence>,
        weights: Option<WeightVector>,
    ) -> Result<TrustProfile> {
        if self.store.exists(&agent_id).await? {
            return Err(TrustError::ProfileExists(agent_id.to_string()));
        }

        let profile =
            self.calculator
                .calculate(agent_id.clone(), observation_tier, evidence, weights)?;
        self.store.save(profile.clone()).await?;
        info!(agent = %agent_id, band = %profile.band, "trust profile created");

        self.notify_change(None, &profile).await;
        Ok(profile)
    }

    /// Fold new evidence into an existing profile.
    pub async fn update(
        &self,
        agent_id: &AgentId,
        new_evidence: Vec<Evidence>,
    ) -> Result<TrustProfile> {
        let existing = self
            .store
            .get(agent_id)
            .await?
            .ok_or_else(|| TrustError::ProfileNotFound(agent_id.to_string()))?;

        let updated = self.calculator.recalculate(&existing, new_evidence);
        self.store.save(updated.clone()).await?;
        debug!(
            agent = %agent_id,
            from = existing.adjusted_score,
            to = updated.adjusted_score,
            "trust profile updated"
        );

        self.emit_all(&existing, &updated).await;
        Ok(updated)
    }

    /// Apply decay if the profile is stale (or `force` is set).
    pub async fn refresh(&self, agent_id: &AgentId, force: bool) -> Result<RefreshOutcome> {
        let existing = self
            .store
            .get(agent_id)
            .await?
            .ok_or_else(|| TrustError::ProfileNotFound(agent_id.to_string()))?;

        let now = Utc::now();
        if !force && !existing.is_stale(now, self.config.staleness_window) {
            return Ok(RefreshOutcome {
                refreshed: false,
                profile: existing,
            });
        }

        let decayed = self.calculator.apply_decay(&existing, now);
        self.store.save(decayed.clone()).await?;
        debug!(agent = %agent_id, score = decayed.adjusted_score, "trust profile refreshed");

        self.emit_all(&existing, &decayed).await;
        Ok(RefreshOutcome {
            refreshed: true,
            profile: decayed,
        })
    }

    /// Decay every profile past the staleness window. Returns the number
    /// of profiles refreshed.
    pub async fn refresh_stale(&self) -> Result<usize> {
        let cutoff = Utc::now() - self.config.staleness_window;
        let stale = self
            .store
            .query(ProfileQuery {
                calculated_before: Some(cutoff),
                ..ProfileQuery::default()
            })
            .await?;

        let mut refreshed = 0;
        for profile in stale {
            // Re-read through refresh so each agent gets its own
            // optimistic save; a conflict means someone else updated the
            // profile concurrently, which supersedes the decay.
            match self.refresh(&profile.agent_id, true).await {
                Ok(outcome) if outcome.refreshed => refreshed += 1,
                Ok(_) => {}
                Err(TrustError::VersionConflict(_)) | Err(TrustError::ProfileNotFound(_)) => {}
                Err(other) => return Err(other),
            }
        }
        info!(refreshed, "stale profile sweep complete");
        Ok(refreshed)
    }

    pub async fn get(&self, agent_id: &AgentId) -> Result<Option<TrustProfile>> {
        self.store.get(agent_id).await
    }

    /// Administrative removal; profiles are never deleted otherwise.
    pub async fn delete(&self, agent_id: &AgentId) -> Result<bool> {
        self.store.delete(agent_id).await
    }

    /// Violations implied by the transition from `previous` to `current`.
    fn detect_violations(
        &self,
        previous: &TrustProfile,
        current: &TrustProfile,
    ) -> Vec<TrustViolation> {
        let mut violations = Vec::new();
        let now = Utc::now();

        let band_drop = previous.band.index().saturating_sub(current.band.index());
        if band_drop >= self.config.band_drop_threshold && band_drop > 0 {
            let severity = if band_drop >= 2 {
                ViolationSeverity::Critical
            } else {
                ViolationSeverity::High
            };
            violations.push(TrustViolation {
                agent_id: current.agent_id.clone(),
                kind: ViolationKind::BandDrop {
                    from: previous.band,
                    to: current.band,
                },
                severity,
                details: format!("band dropped from {} to {}", previous.band, current.band),
                detected_at: now,
            });
        }

        if previous.adjusted_score > 0.0 {
            let drop_pct =
                (previous.adjusted_score - current.adjusted_score) / previous.adjusted_score;
            if drop_pct >= self.config.score_drop_threshold {
                let severity = if drop_pct >= 0.50 {
                    ViolationSeverity::Critical
                } else if drop_pct >= 0.35 {
                    ViolationSeverity::High
                } else {
                    ViolationSeverity::Medium
                };
                violations.push(TrustViolation {
                    agent_id: current.agent_id.clone(),
                    kind: ViolationKind::ScoreDrop {
                        percent: drop_pct * 100.0,
                    },
                    severity,
                    details: format!(
                        "adjusted score dropped {:.1}% ({:.1} to {:.1})",
                        drop_pct * 100.0,
                        previous.adjusted_score,
                        current.adjusted_score
                    ),
                    detected_at: now,
                });
            }
        }

        violations
    }

    async fn emit_all(&self, previous: &TrustProfile, current: &TrustProfile) {
        self.notify_change(Some(previous), current).await;
        for violation in self.detect_violations(previous, current) {
            self.notify_violation(&violation).await;
        }
    }

    async fn notify_change(&self, previous: Option<&TrustProfile>, current: &TrustProfile) {
        let change = TrustChange {
            agent_id: current.agent_id.clone(),
            previous_score: previous.map(|p| p.adjusted_score).unwrap_or(0.0),
            new_score: current.adjusted_score,
            previous_band: previous.map(|p| p.band).unwrap_or_default(),
            new_band: current.band,
            version: current.version,
            occurred_at: Utc::now(),
        };

        let listeners = self.snapshot_listeners();
        let results = join_all(
            listeners
                .iter()
                .map(|listener| listener.on_trust_change(&change)),
        )
        .await;
        for error in results.into_iter().filter_map(|r| r.err()) {
            warn!(agent = %change.agent_id, %error, "trust-change listener failed");
        }
    }

    async fn notify_violation(&self, violation: &TrustViolation) {
        warn!(
            agent = %violation.agent_id,
            severity = ?violation.severity,
            details = %violation.details,
            "trust violation detected"
        );

        let listeners = self.snapshot_listeners();
        let results = join_all(
            listeners
                .iter()
                .map(|listener| listener.on_trust_violation(violation)),
        )
        .await;
        for error in results.into_iter().filter_map(|r| r.err()) {
            warn!(agent = %violation.agent_id, %error, "trust-violation listener failed");
        }
    }

    fn snapshot_listeners(&self) -> Vec<Arc<dyn TrustListener>> {
        self.read_listeners().clone()
    }

    fn read_listeners(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<dyn TrustListener>>> {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_listeners(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<dyn TrustListener>>> {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
