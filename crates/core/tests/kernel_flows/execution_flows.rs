//! Execution-phase flow tests: hand-off, failures, audit chain integrity.

use super::{established_agent, kernel};

use std::sync::Arc;

use async_trait::async_trait;

use agenttrust_proof::ProofEventType;
use agenttrust_rolegate::PolicyDecision;
use agenttrust_trust::TrustProfile;
use agenttrust_types::{Role, Tier};

use agenttrust_core::{ExecutorError, Intent, IntentExecutor, ProcessOptions};

struct EchoExecutor;

#[async_trait]
impl IntentExecutor for EchoExecutor {
    async fn execute(
        &self,
        _intent: &Intent,
        _decision: &PolicyDecision,
        _profile: &TrustProfile,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, ExecutorError> {
        Ok(serde_json::json!({ "echoed": params }))
    }
}

struct FailingExecutor(&'static str);

#[async_trait]
impl IntentExecutor for FailingExecutor {
    async fn execute(
        &self,
        _intent: &Intent,
        _decision: &PolicyDecision,
        _profile: &TrustProfile,
        _params: &serde_json::Value,
    ) -> Result<serde_json::Value, ExecutorError> {
        Err(self.0.into())
    }
}

fn deploy_intent(agent: &agenttrust_types::AgentId) -> Intent {
    Intent::new(agent.clone(), "deploy", Role::Operator, Tier::Limited)
        .with_params(serde_json::json!({ "target": "staging" }))
}

#[tokio::test]
async fn test_permitted_intent_executes_and_chains() {
    let kernel = kernel();
    let agent = established_agent(&kernel, "runner").await;
    kernel
        .orchestrator
        .register_executor("deploy", Arc::new(EchoExecutor))
        .unwrap();

    let intent = deploy_intent(&agent);
    let correlation = intent.intent_id.clone();
    let result = kernel
        .orchestrator
        .process_intent(intent, ProcessOptions::default())
        .await
        .unwrap();

    assert!(result.permitted);
    assert!(result.success);
    let execution = result.execution.unwrap();
    assert!(execution.success);
    assert_eq!(execution.output.unwrap()["echoed"]["target"], "staging");
    assert!(result.timings.execution_ms.is_some());

    // The full request lifecycle is on the chain, in order, and verifies.
    let trace = kernel.ledger.get_trace(&correlation).await.unwrap();
    let kinds: Vec<ProofEventType> = trace.iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            ProofEventType::IntentReceived,
            ProofEventType::DecisionMade,
            ProofEventType::ExecutionStarted,
            ProofEventType::ExecutionCompleted,
        ]
    );
    assert!(kernel
        .ledger
        .verify_correlation_chain(&correlation)
        .await
        .unwrap()
        .valid);
    assert!(kernel.ledger.verify_chain(None, None).await.unwrap().valid);
}

#[tokio::test]
async fn test_executor_failure_still_emits_terminal_event() {
    let kernel = kernel();
    let agent = established_agent(&kernel, "unlucky").await;
    kernel
        .orchestrator
        .register_executor("deploy", Arc::new(FailingExecutor("target exploded")))
        .unwrap();

    let intent = deploy_intent(&agent);
    let correlation = intent.intent_id.clone();
    let result = kernel
        .orchestrator
        .process_intent(intent, ProcessOptions::default())
        .await
        .unwrap();

    // Permitted but failed: permitted=true, success=false.
    assert!(result.permitted);
    assert!(!result.success);
    let execution = result.execution.unwrap();
    assert!(!execution.success);
    assert!(execution.error.unwrap().contains("target exploded"));

    let trace = kernel.ledger.get_trace(&correlation).await.unwrap();
    assert!(trace
        .iter()
        .any(|e| e.event_type == ProofEventType::ExecutionFailed));
}

#[tokio::test]
async fn test_missing_executor_is_an_execution_failure() {
    let kernel = kernel();
    let agent = established_agent(&kernel, "orphan").await;

    let intent = deploy_intent(&agent);
    let result = kernel
        .orchestrator
        .process_intent(intent, ProcessOptions::default())
        .await
        .unwrap();

    assert!(result.permitted);
    assert!(!result.success);
    let execution = result.execution.unwrap();
    assert!(!execution.success);
    assert!(execution.error.unwrap().contains("no executor registered"));
}

#[tokio::test]
async fn test_non_retryable_failure_burns_trust() {
    let kernel = kernel();
    let agent = established_agent(&kernel, "rejected").await;
    kernel
        .orchestrator
        .register_executor("deploy", Arc::new(FailingExecutor("401 unauthorized")))
        .unwrap();

    let before = kernel.trust.get(&agent).await.unwrap().unwrap();
    let result = kernel
        .orchestrator
        .process_intent(deploy_intent(&agent), ProcessOptions::default())
        .await
        .unwrap();
    assert!(!result.success);

    // The auth failure was recorded as burned-trust evidence.
    let after = kernel.trust.get(&agent).await.unwrap().unwrap();
    assert_eq!(after.version, before.version + 1);
    assert!(after.dimensions.burned > before.dimensions.burned);
    assert!(after.adjusted_score < before.adjusted_score);
}

#[tokio::test]
async fn test_duplicate_executor_registration_rejected() {
    let kernel = kernel();
    kernel
        .orchestrator
        .register_executor("deploy", Arc::new(EchoExecutor))
        .unwrap();
    assert!(kernel
        .orchestrator
        .register_executor("deploy", Arc::new(EchoExecutor))
        .is_err());
}

#[tokio::test]
async fn test_audit_logging_is_best_effort() {
    let kernel = kernel();
    let agent = established_agent(&kernel, "quiet").await;
    kernel
        .orchestrator
        .register_executor("deploy", Arc::new(EchoExecutor))
        .unwrap();

    let result = kernel
        .orchestrator
        .process_intent(deploy_intent(&agent), ProcessOptions::default())
        .await
        .unwrap();

    // With a healthy ledger nothing failed; the counter is the local
    // diagnostics surface a broken ledger would land in.
    assert!(result.success);
    assert_eq!(kernel.orchestrator.logging_failures(), 0);
}
