//! End-to-end flow tests for the orchestration pipeline.

mod authorization_flows;
mod execution_flows;

use std::sync::Arc;

use agenttrust_proof::{InMemoryEventStore, ProofLedger};
use agenttrust_rolegate::RoleGatePolicy;
use agenttrust_trust::{InMemoryProfileStore, TrustProfileService};
use agenttrust_types::{AgentId, Evidence, ObservationTier, TrustDimension};

use agenttrust_core::Orchestrator;

/// A fully wired in-memory kernel for flow tests.
pub struct TestKernel {
    pub orchestrator: Orchestrator,
    pub policy: Arc<RoleGatePolicy>,
    pub trust: Arc<TrustProfileService>,
    pub ledger: Arc<ProofLedger>,
}

pub fn kernel() -> TestKernel {
    let policy = Arc::new(RoleGatePolicy::new());
    let trust = Arc::new(TrustProfileService::new(Arc::new(
        InMemoryProfileStore::new(),
    )));
    let ledger = Arc::new(ProofLedger::new(Arc::new(InMemoryEventStore::new())));
    let orchestrator = Orchestrator::new(policy.clone(), trust.clone(), ledger.clone());
    TestKernel {
        orchestrator,
        policy,
        trust,
        ledger,
    }
}

/// Create a monitored agent with a solid track record.
pub async fn established_agent(kernel: &TestKernel, name: &str) -> AgentId {
    let agent = AgentId::new(name);
    kernel
        .trust
        .create(
            agent.clone(),
            ObservationTier::Monitored,
            vec![
                Evidence::new(TrustDimension::Cumulative, 70.0, "task history", "tests"),
                Evidence::new(TrustDimension::Granted, 60.0, "certification", "tests"),
            ],
            None,
        )
        .await
        .expect("profile creation succeeds");
    agent
}
