//! Authorization-phase flow tests: denials, overrides, audit trail.

use super::{established_agent, kernel};

use agenttrust_proof::ProofEventType;
use agenttrust_rolegate::{DecisionSource, PolicyException, PolicyRule};
use agenttrust_types::{AgentId, Role, Tier};

use agenttrust_core::{Intent, ProcessOptions};

#[tokio::test]
async fn test_unknown_agent_is_denied_but_logged() {
    let kernel = kernel();
    let intent = Intent::new(AgentId::new("stranger"), "deploy", Role::Operator, Tier::Limited);
    let correlation = intent.intent_id.clone();

    let result = kernel
        .orchestrator
        .process_intent(intent, ProcessOptions::default())
        .await
        .unwrap();

    assert!(!result.permitted);
    assert!(!result.success);
    assert!(result.profile.is_none());
    assert!(result.execution.is_none());
    assert!(result
        .denial_reason
        .as_deref()
        .unwrap()
        .contains("no trust profile"));

    // The denial still produced a full audit trail.
    let trace = kernel.ledger.get_trace(&correlation).await.unwrap();
    let kinds: Vec<ProofEventType> = trace.iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![ProofEventType::IntentReceived, ProofEventType::DecisionMade]
    );
}

#[tokio::test]
async fn test_invalid_role_tier_pair_is_a_kernel_denial() {
    let kernel = kernel();
    let agent = established_agent(&kernel, "observer").await;

    let intent = Intent::new(agent, "report", Role::Observer, Tier::Broad);
    let result = kernel
        .orchestrator
        .process_intent(intent, ProcessOptions::default())
        .await
        .unwrap();

    assert!(!result.permitted);
    assert_eq!(result.decision.source, DecisionSource::Kernel);
    assert!(result.execution.is_none());
}

#[tokio::test]
async fn test_deny_rule_stops_execution() {
    let kernel = kernel();
    let agent = established_agent(&kernel, "worker").await;
    kernel.policy.add_rule(PolicyRule::new(
        Role::Operator,
        Tier::Limited,
        false,
        "operators locked out during incident",
    ));

    let intent = Intent::new(agent, "deploy", Role::Operator, Tier::Limited);
    let result = kernel
        .orchestrator
        .process_intent(intent, ProcessOptions::default())
        .await
        .unwrap();

    assert!(!result.permitted);
    assert_eq!(result.decision.source, DecisionSource::Rule);
    assert!(result.execution.is_none());
    assert!(!result.success);
}

#[tokio::test]
async fn test_exception_overrides_deny_rule_end_to_end() {
    let kernel = kernel();
    let agent = established_agent(&kernel, "pilot").await;
    kernel.policy.add_rule(PolicyRule::new(
        Role::Operator,
        Tier::Limited,
        false,
        "blanket lockout",
    ));
    kernel.policy.add_exception(PolicyException::new(
        agent.clone(),
        Role::Operator,
        Tier::Limited,
        true,
        "cso",
        "trusted pilot program",
    ));

    let intent = Intent::new(agent, "deploy", Role::Operator, Tier::Limited);
    let result = kernel
        .orchestrator
        .process_intent(intent, ProcessOptions::default())
        .await
        .unwrap();

    assert!(result.permitted);
    assert_eq!(result.decision.source, DecisionSource::Exception);
}

#[tokio::test]
async fn test_authorize_only_stops_before_execution() {
    let kernel = kernel();
    let agent = established_agent(&kernel, "checker").await;

    let intent = Intent::new(agent, "deploy", Role::Operator, Tier::Limited);
    let correlation = intent.intent_id.clone();
    let result = kernel
        .orchestrator
        .process_intent(
            intent,
            ProcessOptions {
                authorize_only: true,
                ..ProcessOptions::default()
            },
        )
        .await
        .unwrap();

    assert!(result.permitted);
    assert!(!result.success);
    assert!(result.execution.is_none());
    assert!(result.timings.execution_ms.is_none());

    // No execution events were emitted.
    let trace = kernel.ledger.get_trace(&correlation).await.unwrap();
    assert!(trace
        .iter()
        .all(|e| e.event_type != ProofEventType::ExecutionStarted));
}

#[tokio::test]
async fn test_tripped_breaker_denies_immediately() {
    let kernel = kernel();
    let agent = established_agent(&kernel, "halted").await;
    kernel
        .trust
        .breaker()
        .trip(&agent, "critical canary probe failed");

    let intent = Intent::new(agent, "deploy", Role::Operator, Tier::Limited);
    let result = kernel
        .orchestrator
        .process_intent(intent, ProcessOptions::default())
        .await
        .unwrap();

    assert!(!result.permitted);
    assert!(result
        .denial_reason
        .as_deref()
        .unwrap()
        .contains("circuit breaker"));
    assert!(result.execution.is_none());
}

#[tokio::test]
async fn test_invalid_intent_rejected_without_side_effects() {
    let kernel = kernel();
    let agent = established_agent(&kernel, "typo").await;

    let intent = Intent::new(agent, "", Role::Operator, Tier::Limited);
    let result = kernel
        .orchestrator
        .process_intent(intent, ProcessOptions::default())
        .await;

    assert!(result.is_err());
    // Nothing was logged: validation fails before any side effect.
    let stats = kernel.ledger.stats().await.unwrap();
    assert_eq!(stats.total_events, 0);
}
