//! Probe execution service.
//!
//! Runs probes against an agent's response function, keeps per-agent
//! stats, and trips the shared circuit breaker on critical failure.

use std::collections::HashMap;
use std::sync::{Arc, RwLock as SyncRwLock};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use agenttrust_trust::CircuitBreaker;
use agenttrust_types::AgentId;

use crate::probe::{CanaryProbe, ProbeLibrary};
use crate::scheduler::{ProbeScheduler, SchedulerConfig};
use crate::stats::AgentProbeStats;
use crate::validation::{validate_response, SemanticJudge};
use crate::Result;

/// Responder error type.
pub type ResponderError = Box<dyn std::error::Error + Send + Sync>;

/// The agent under test: prompt in, answer out.
///
/// Errors propagate as probe failures, never as exceptions to the caller.
#[async_trait]
pub trait AgentResponder: Send + Sync {
    async fn respond(&self, prompt: &str) -> std::result::Result<String, ResponderError>;
}

/// Listener error type; failures are logged, never raised.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Sink notified when a probe fails. Never called on success.
#[async_trait]
pub trait CanaryFailureListener: Send + Sync {
    async fn on_probe_failure(
        &self,
        result: &ProbeResult,
        probe: &CanaryProbe,
    ) -> std::result::Result<(), ListenerError>;
}

/// Outcome of one probe execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub probe_id: String,
    pub agent_id: AgentId,
    pub passed: bool,
    /// The agent's actual response, or a synthetic error marker
    pub response: String,
    pub latency_ms: u64,
    /// Whether this execution tripped the circuit breaker
    pub triggered_circuit_breaker: bool,
    pub executed_at: DateTime<Utc>,
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct CanaryConfig {
    /// Consecutive failures before a critical probe trips the breaker.
    /// The default of 1 is zero tolerance: any single critical failure
    /// halts the agent.
    pub max_consecutive_failures: u64,
    /// Timeout for the agent's response function
    pub response_timeout: std::time::Duration,
    pub scheduler: SchedulerConfig,
}

impl Default for CanaryConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 1,
            response_timeout: std::time::Duration::from_secs(30),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Continuous out-of-band verification for agents.
pub struct CanaryProbeService {
    library: ProbeLibrary,
    config: CanaryConfig,
    scheduler: ProbeScheduler,
    breaker: Arc<CircuitBreaker>,
    stats: RwLock<HashMap<AgentId, AgentProbeStats>>,
    listeners: SyncRwLock<Vec<Arc<dyn CanaryFailureListener>>>,
    judge: Option<Arc<dyn SemanticJudge>>,
}

impl CanaryProbeService {
    pub fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self::with_config(breaker, CanaryConfig::default())
    }

    pub fn with_config(breaker: Arc<CircuitBreaker>, config: CanaryConfig) -> Self {
        Self {
            library: ProbeLibrary::seeded(),
            scheduler: ProbeScheduler::new(config.scheduler.clone()),
            config,
            breaker,
            stats: RwLock::new(HashMap::new()),
            listeners: SyncRwLock::new(Vec::new()),
            judge: None,
        }
    }

    /// Attach the external similarity judge for semantic probes.
    pub fn with_judge(mut self, judge: Arc<dyn SemanticJudge>) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn library(&self) -> &ProbeLibrary {
        &self.library
    }

    /// Add a probe to the library; duplicate ids are rejected.
    pub fn add_probe(&mut self, probe: CanaryProbe) -> Result<()> {
        self.library.add(probe)
    }

    /// Register a failure sink.
    pub fn register_failure_listener(&self, listener: Arc<dyn CanaryFailureListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    /// Whether the agent is due for a probe.
    ///
    /// Always true for an agent with no probe history; otherwise a
    /// Poisson-gated draw behind the hard minimum interval.
    pub async fn should_inject_probe(&self, agent_id: &AgentId) -> bool {
        let last = self
            .stats
            .read()
            .await
            .get(agent_id)
            .and_then(|s| s.last_probe_at);
        self.scheduler.should_inject(last, Utc::now())
    }

    /// Send a probe through the agent's response function and validate.
    ///
    /// A responder error or timeout is recorded as a failed probe with a
    /// synthetic response. On a disqualifying failure the breaker trips
    /// before failure listeners are notified.
    pub async fn execute_probe(
        &self,
        agent_id: &AgentId,
        responder: &dyn AgentResponder,
        probe: &CanaryProbe,
    ) -> ProbeResult {
        let started = Instant::now();
        let outcome =
            tokio::time::timeout(self.config.response_timeout, responder.respond(&probe.prompt))
                .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let (passed, response) = match outcome {
            Ok(Ok(text)) => {
                let passed = match validate_response(probe, &text, self.judge.as_deref()).await {
                    Ok(passed) => passed,
                    Err(error) => {
                        warn!(probe = %probe.probe_id, %error, "probe validation misconfigured");
                        false
                    }
                };
                (passed, text)
            }
            Ok(Err(error)) => (false, format!("[responder error: {}]", error)),
            Err(_) => (false, "[responder timed out]".to_string()),
        };

        let executed_at = Utc::now();

        // Stats and breaker state move together under one write lock so a
        // concurrent probe cannot interleave between them.
        let triggered_circuit_breaker = {
            let mut stats = self.stats.write().await;
            let entry = stats
                .entry(agent_id.clone())
                .or_insert_with(|| AgentProbeStats::new(agent_id.clone()));
            entry.record(probe.category, passed, executed_at);

            if !passed
                && probe.critical
                && entry.consecutive_failures >= self.config.max_consecutive_failures
            {
                self.breaker.trip(
                    agent_id,
                    format!("critical canary probe {} failed", probe.probe_id),
                );
                true
            } else {
                false
            }
        };

        let result = ProbeResult {
            probe_id: probe.probe_id.clone(),
            agent_id: agent_id.clone(),
            passed,
            response,
            latency_ms,
            triggered_circuit_breaker,
            executed_at,
        };

        debug!(
            agent = %agent_id,
            probe = %probe.probe_id,
            passed,
            latency_ms,
            "probe executed"
        );

        if !passed {
            self.notify_failure(&result, probe).await;
        }

        result
    }

    pub async fn stats(&self, agent_id: &AgentId) -> Option<AgentProbeStats> {
        self.stats.read().await.get(agent_id).cloned()
    }

    /// Reset an agent's stats to empty; returns whether any existed.
    pub async fn clear_stats(&self, agent_id: &AgentId) -> bool {
        self.stats.write().await.remove(agent_id).is_some()
    }

    async fn notify_failure(&self, result: &ProbeResult, probe: &CanaryProbe) {
        let listeners: Vec<Arc<dyn CanaryFailureListener>> = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        let results = join_all(
            listeners
                .iter()
                .map(|listener| listener.on_probe_failure(result, probe)),
        )
        .await;
        for error in results.into_iter().filter_map(|r| r.err()) {
            warn!(probe = %result.probe_id, %error, "canary failure listener failed");
        }
    }
}
