//! The intent pipeline: authorize, log, execute, log.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use agenttrust_rolegate::{PolicyDecision, RoleGatePolicy};
use agenttrust_proof::{ProofError, ProofLedger};
use agenttrust_trust::{CircuitBreaker, TrustProfile, TrustProfileService};
use agenttrust_types::{Evidence, TrustDimension};

use crate::execution::{ExecutionOutcome, ExecutorRegistry, IntentExecutor};
use crate::intent::Intent;
use crate::retry::{ErrorClass, RetryPolicy};
use crate::Result;

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Stop after the authorization phase; never execute
    pub authorize_only: bool,
    /// Override the configured execution timeout
    pub execution_timeout: Option<Duration>,
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Per-attempt timeout for the execution boundary
    pub execution_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            execution_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Wall-clock spent in each pipeline phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub profile_ms: u64,
    pub authorization_ms: u64,
    pub execution_ms: Option<u64>,
    pub total_ms: u64,
}

/// The unified outcome of one `process_intent` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub intent_id: String,
    /// Groups this request's audit events
    pub correlation_id: String,
    pub trace_id: String,
    /// Whether the agent was allowed to act
    pub permitted: bool,
    /// Why not, when denied (breaker, missing profile, or policy)
    pub denial_reason: Option<String>,
    /// The policy layer's decision
    pub decision: PolicyDecision,
    pub profile: Option<TrustProfile>,
    pub execution: Option<ExecutionOutcome>,
    /// Permitted and executed without error
    pub success: bool,
    pub timings: PhaseTimings,
}

/// Sequences authorization, trust lookup, execution, and audit logging
/// into one transaction-like flow per intent.
pub struct Orchestrator {
    policy: Arc<RoleGatePolicy>,
    trust: Arc<TrustProfileService>,
    breaker: Arc<CircuitBreaker>,
    ledger: Arc<ProofLedger>,
    executors: ExecutorRegistry,
    config: OrchestratorConfig,
    /// Count of audit writes that failed; logging is best-effort and
    /// failures land here instead of aborting the pipeline.
    log_failures: AtomicU64,
}

impl Orchestrator {
    pub fn new(
        policy: Arc<RoleGatePolicy>,
        trust: Arc<TrustProfileService>,
        ledger: Arc<ProofLedger>,
    ) -> Self {
        Self::with_config(policy, trust, ledger, OrchestratorConfig::default())
    }

    pub fn with_config(
        policy: Arc<RoleGatePolicy>,
        trust: Arc<TrustProfileService>,
        ledger: Arc<ProofLedger>,
        config: OrchestratorConfig,
    ) -> Self {
        let breaker = trust.breaker();
        Self {
            policy,
            trust,
            breaker,
            ledger,
            executors: ExecutorRegistry::new(),
            config,
            log_failures: AtomicU64::new(0),
        }
    }

    /// Register an executor for an action type.
    pub fn register_executor(
        &self,
        action: impl Into<String>,
        executor: Arc<dyn IntentExecutor>,
    ) -> Result<()> {
        self.executors.register(action, executor)
    }

    /// Audit writes that failed since construction.
    pub fn logging_failures(&self) -> u64 {
        self.log_failures.load(Ordering::Relaxed)
    }

    /// Run one intent through the full pipeline.
    ///
    /// Authorization denials are not errors: they come back as a result
    /// with `permitted = false`. Errors are reserved for validation
    /// failures and infrastructure trouble.
    pub async fn process_intent(
        &self,
        intent: Intent,
        options: ProcessOptions,
    ) -> Result<OrchestrationResult> {
        // Structural validation rejects before any side effect.
        intent.check()?;

        let correlation_id = intent.intent_id.clone();
        let trace_id = Uuid::new_v4().to_string();
        let total_start = Instant::now();

        let intent_json = serde_json::to_value(&intent).unwrap_or(serde_json::Value::Null);
        self.note_log(
            self.ledger
                .log_intent_received(&correlation_id, &intent.agent_id, intent_json)
                .await,
        );

        // Phase 1: trust profile lookup.
        let profile_start = Instant::now();
        let profile = self.trust.get(&intent.agent_id).await?;
        let profile_ms = profile_start.elapsed().as_millis() as u64;

        // Phase 2: role gate and policy.
        let auth_start = Instant::now();
        let decision = self.policy.evaluate(
            &intent.agent_id,
            intent.role,
            intent.tier,
            intent.domain.as_deref(),
        );

        let (permitted, denial_reason) = if let Some(trip) = self.breaker.get(&intent.agent_id) {
            (false, Some(format!("circuit breaker open: {}", trip.reason)))
        } else if profile.is_none() {
            (false, Some("agent has no trust profile".to_string()))
        } else if !decision.permitted {
            (false, Some(decision.reason.clone()))
        } else {
            (true, None)
        };
        let authorization_ms = auth_start.elapsed().as_millis() as u64;

        self.note_log(
            self.ledger
                .log_decision(
                    &correlation_id,
                    &intent.agent_id,
                    permitted,
                    denial_reason.as_deref().unwrap_or(&decision.reason),
                )
                .await,
        );

        if !permitted || options.authorize_only {
            info!(
                intent = %correlation_id,
                agent = %intent.agent_id,
                permitted,
                authorize_only = options.authorize_only,
                "intent stopped before execution"
            );
            return Ok(OrchestrationResult {
                intent_id: intent.intent_id.clone(),
                correlation_id,
                trace_id,
                permitted,
                denial_reason,
                decision,
                profile,
                execution: None,
                success: false,
                timings: PhaseTimings {
                    profile_ms,
                    authorization_ms,
                    execution_ms: None,
                    total_ms: total_start.elapsed().as_millis() as u64,
                },
            });
        }

        // Phase 3: execution. The profile is present on this path.
        let profile_ref = profile.as_ref().ok_or_else(|| {
            crate::OrchestratorError::Internal("permitted intent without profile".to_string())
        })?;

        self.note_log(
            self.ledger
                .log_execution_started(&correlation_id, &intent.agent_id, &intent.action)
                .await,
        );

        let exec_start = Instant::now();
        let outcome = self
            .run_execution(&intent, &decision, profile_ref, &options)
            .await;
        let execution_ms = exec_start.elapsed().as_millis() as u64;

        // Terminal execution event, always emitted.
        if outcome.success {
            self.note_log(
                self.ledger
                    .log_execution_completed(
                        &correlation_id,
                        &intent.agent_id,
                        &intent.action,
                        outcome.duration_ms,
                    )
                    .await,
            );
        } else {
            let error_text = outcome.error.as_deref().unwrap_or("unknown");
            self.note_log(
                self.ledger
                    .log_execution_failed(
                        &correlation_id,
                        &intent.agent_id,
                        &intent.action,
                        error_text,
                    )
                    .await,
            );
            self.record_trust_signal(&intent, error_text).await;
        }

        let success = outcome.success;
        Ok(OrchestrationResult {
            intent_id: intent.intent_id.clone(),
            correlation_id,
            trace_id,
            permitted: true,
            denial_reason: None,
            decision,
            profile,
            execution: Some(outcome),
            success,
            timings: PhaseTimings {
                profile_ms,
                authorization_ms,
                execution_ms: Some(execution_ms),
                total_ms: total_start.elapsed().as_millis() as u64,
            },
        })
    }

    /// Run the executor with per-attempt timeout and transient-only retry.
    async fn run_execution(
        &self,
        intent: &Intent,
        decision: &PolicyDecision,
        profile: &TrustProfile,
        options: &ProcessOptions,
    ) -> ExecutionOutcome {
        let started = Instant::now();
        let executor = match self.executors.get(&intent.action) {
            Some(executor) => executor,
            None => {
                return ExecutionOutcome {
                    action: intent.action.clone(),
                    success: false,
                    output: None,
                    error: Some(format!("no executor registered for action {}", intent.action)),
                    duration_ms: 0,
                    completed_at: chrono::Utc::now(),
                };
            }
        };

        let timeout = options
            .execution_timeout
            .unwrap_or(self.config.execution_timeout);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let run = tokio::time::timeout(
                timeout,
                executor.execute(intent, decision, profile, &intent.params),
            )
            .await;

            let (error_text, class) = match run {
                Ok(Ok(output)) => {
                    return ExecutionOutcome {
                        action: intent.action.clone(),
                        success: true,
                        output: Some(output),
                        error: None,
                        duration_ms: started.elapsed().as_millis() as u64,
                        completed_at: chrono::Utc::now(),
                    };
                }
                Ok(Err(error)) => {
                    let text = error.to_string();
                    let class = ErrorClass::classify(&text);
                    (text, class)
                }
                Err(_) => (
                    "execution timed out".to_string(),
                    ErrorClass::Timeout,
                ),
            };

            if self.config.retry.allows_retry(attempt, class) {
                let delay = self.config.retry.backoff_delay(attempt, None);
                warn!(
                    intent = %intent.intent_id,
                    attempt,
                    ?class,
                    delay_ms = delay.as_millis() as u64,
                    "execution attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return ExecutionOutcome {
                action: intent.action.clone(),
                success: false,
                output: None,
                error: Some(error_text),
                duration_ms: started.elapsed().as_millis() as u64,
                completed_at: chrono::Utc::now(),
            };
        }
    }

    /// Non-retryable execution failures count against the agent's trust.
    async fn record_trust_signal(&self, intent: &Intent, error_text: &str) {
        let class = ErrorClass::classify(error_text);
        if !class.is_trust_affecting() {
            return;
        }

        let evidence = Evidence::new(
            TrustDimension::Burned,
            5.0,
            format!("non-retryable execution failure: {}", error_text),
            "orchestrator",
        );
        if let Err(error) = self.trust.update(&intent.agent_id, vec![evidence]).await {
            warn!(agent = %intent.agent_id, %error, "failed to record trust signal");
        }
    }

    fn note_log(&self, result: std::result::Result<agenttrust_proof::ProofEvent, ProofError>) {
        if let Err(error) = result {
            self.log_failures.fetch_add(1, Ordering::Relaxed);
            warn!(%error, "audit write failed; continuing");
        }
    }
}
