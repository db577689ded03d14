use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use agenttrust_canary::{AgentResponder, CanaryProbeService, ResponderError};
use agenttrust_core::{
    ExecutorError, Intent, IntentExecutor, LedgerCanaryListener, LedgerTrustListener,
    Orchestrator, ProcessOptions,
};
use agenttrust_proof::{InMemoryEventStore, ProofLedger};
use agenttrust_rolegate::RoleGatePolicy;
use agenttrust_trust::{InMemoryProfileStore, TrustProfile, TrustProfileService};
use agenttrust_types::{AgentId, Evidence, ObservationTier, Role, Tier, TrustDimension};

struct DeployExecutor;

#[async_trait]
impl IntentExecutor for DeployExecutor {
    async fn execute(
        &self,
        intent: &Intent,
        _decision: &agenttrust_rolegate::PolicyDecision,
        profile: &TrustProfile,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, ExecutorError> {
        info!(
            "executing {} for {} (band {})",
            intent.action, intent.agent_id, profile.band
        );
        Ok(serde_json::json!({ "deployed": params["target"] }))
    }
}

struct WellBehavedAgent;

#[async_trait]
impl AgentResponder for WellBehavedAgent {
    async fn respond(&self, prompt: &str) -> Result<String, ResponderError> {
        // A cooperative agent that can still do arithmetic.
        if prompt.contains("17 + 68") {
            Ok("85".to_string())
        } else {
            Ok("acknowledged".to_string())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .pretty()
        .init();

    info!("Starting agenttrust kernel demo...");

    // 1. Wire the kernel: policy gate, trust service, proof ledger
    let policy = Arc::new(RoleGatePolicy::new());
    let trust = Arc::new(TrustProfileService::new(Arc::new(
        InMemoryProfileStore::new(),
    )));
    let ledger = Arc::new(ProofLedger::new(Arc::new(InMemoryEventStore::new())));
    trust.register_listener(Arc::new(LedgerTrustListener::new(ledger.clone())));

    let orchestrator = Orchestrator::new(policy.clone(), trust.clone(), ledger.clone());
    orchestrator.register_executor("deploy", Arc::new(DeployExecutor))?;

    // 2. Create a trust profile for a monitored agent
    let agent = AgentId::new("demo-agent");
    let profile = trust
        .create(
            agent.clone(),
            ObservationTier::Monitored,
            vec![
                Evidence::new(TrustDimension::Cumulative, 70.0, "completed pilots", "ops"),
                Evidence::new(TrustDimension::Granted, 55.0, "deployment cert", "compliance"),
            ],
            None,
        )
        .await?;
    info!("Created trust profile: {}", profile);

    // 3. Process an intent end to end
    let intent = Intent::new(agent.clone(), "deploy", Role::Operator, Tier::Limited)
        .with_params(serde_json::json!({ "target": "staging" }));
    let result = orchestrator
        .process_intent(intent, ProcessOptions::default())
        .await?;
    info!(
        "Intent processed: permitted={} success={} ({} ms total)",
        result.permitted, result.success, result.timings.total_ms
    );

    // 4. Run a canary probe against the live agent
    let canary = CanaryProbeService::new(trust.breaker());
    canary.register_failure_listener(Arc::new(LedgerCanaryListener::new(ledger.clone())));
    if canary.should_inject_probe(&agent).await {
        let probe = canary
            .library()
            .get("CANARY-FACT-0001")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("seed probe missing from library"))?;
        let outcome = canary.execute_probe(&agent, &WellBehavedAgent, &probe).await;
        info!(
            "Probe {}: passed={} ({} ms)",
            outcome.probe_id, outcome.passed, outcome.latency_ms
        );
    }

    // 5. Verify the audit chain
    let verification = ledger.verify_chain(None, None).await?;
    info!(
        "Audit chain: valid={} over {} events",
        verification.valid, verification.checked
    );

    let stats = ledger.stats().await?;
    info!("Ledger stats: {} events total", stats.total_events);

    info!("Demo completed successfully!");
    Ok(())
}
