//! Dynamic policy layer over the static role/tier matrix.
//!
//! Resolution order: kernel matrix check, then unexpired per-agent
//! exceptions (first match wins), then rules with optional domain filters,
//! then the system default of allow. Every evaluation is appended to the
//! instance audit log, whichever layer decided.

use std::fmt;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use agenttrust_types::{AgentId, Role, Tier};

use crate::matrix::validate_role_and_tier;
use crate::{Result, RoleGateError};

/// A dynamic rule binding (role, tier, optional domain) to a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Unique rule id
    pub id: String,
    pub role: Role,
    pub tier: Tier,
    /// Optional domain filter; `None` matches any domain
    pub domain: Option<String>,
    /// Whether matching requests are allowed
    pub allow: bool,
    /// Why the rule exists
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl PolicyRule {
    pub fn new(role: Role, tier: Tier, allow: bool, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            tier,
            domain: None,
            allow,
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    fn matches(&self, role: Role, tier: Tier, domain: Option<&str>) -> bool {
        if self.role != role || self.tier != tier {
            return false;
        }
        match (&self.domain, domain) {
            (None, _) => true,
            (Some(filter), Some(supplied)) => filter == supplied,
            (Some(_), None) => false,
        }
    }
}

/// A per-agent override of the rule table, optionally time-bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyException {
    /// Unique exception id
    pub id: String,
    pub agent_id: AgentId,
    pub role: Role,
    pub tier: Tier,
    /// Whether the agent is allowed for this (role, tier)
    pub allow: bool,
    /// Who approved the exception
    pub approver: String,
    pub reason: String,
    /// Optional expiry; an expired exception never matches
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PolicyException {
    pub fn new(
        agent_id: AgentId,
        role: Role,
        tier: Tier,
        allow: bool,
        approver: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent_id,
            role,
            tier,
            allow,
            approver: approver.into(),
            reason: reason.into(),
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    fn matches(&self, agent_id: &AgentId, role: Role, tier: Tier, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && self.agent_id == *agent_id && self.role == role && self.tier == tier
    }
}

/// Which layer produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Structural matrix rejection
    Kernel,
    /// Per-agent exception
    Exception,
    /// Rule table
    Rule,
    /// System default (allow)
    Default,
}

/// The outcome of one policy evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub permitted: bool,
    pub reason: String,
    pub source: DecisionSource,
    /// Id of the deciding rule or exception, when one matched
    pub matched_id: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}

/// One audit record per evaluation, regardless of outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyAuditEntry {
    pub id: String,
    pub agent_id: AgentId,
    pub role: Role,
    pub tier: Tier,
    pub domain: Option<String>,
    pub decision: PolicyDecision,
}

/// Semantic policy version, bumped on any rule or exception mutation.
///
/// Callers caching decisions compare versions to detect staleness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyVersion {
    pub major: u32,
    pub minor: u32,
}

impl PolicyVersion {
    fn bump_minor(&mut self) {
        self.minor += 1;
    }

    fn bump_major(&mut self) {
        self.major += 1;
        self.minor = 0;
    }
}

impl Default for PolicyVersion {
    fn default() -> Self {
        Self { major: 1, minor: 0 }
    }
}

impl fmt::Display for PolicyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Default)]
struct PolicyState {
    rules: Vec<PolicyRule>,
    exceptions: Vec<PolicyException>,
    audit_log: Vec<PolicyAuditEntry>,
    version: PolicyVersion,
}

/// The policy layer: rules, exceptions, audit log, and version counter,
/// all owned by the instance so independent gates cannot interfere.
#[derive(Debug, Default)]
pub struct RoleGatePolicy {
    state: RwLock<PolicyState>,
}

impl RoleGatePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate whether an agent may act with (role, tier) in a domain.
    ///
    /// Always appends an audit entry; never errors.
    pub fn evaluate(
        &self,
        agent_id: &AgentId,
        role: Role,
        tier: Tier,
        domain: Option<&str>,
    ) -> PolicyDecision {
        let now = Utc::now();
        let mut state = self.write_state();

        let decision = if !validate_role_and_tier(role, tier) {
            PolicyDecision {
                permitted: false,
                reason: format!("role {} cannot operate at tier {}", role, tier),
                source: DecisionSource::Kernel,
                matched_id: None,
                evaluated_at: now,
            }
        } else if let Some(exception) = state
            .exceptions
            .iter()
            .find(|e| e.matches(agent_id, role, tier, now))
        {
            PolicyDecision {
                permitted: exception.allow,
                reason: exception.reason.clone(),
                source: DecisionSource::Exception,
                matched_id: Some(exception.id.clone()),
                evaluated_at: now,
            }
        } else if let Some(rule) = state.rules.iter().find(|r| r.matches(role, tier, domain)) {
            PolicyDecision {
                permitted: rule.allow,
                reason: rule.reason.clone(),
                source: DecisionSource::Rule,
                matched_id: Some(rule.id.clone()),
                evaluated_at: now,
            }
        } else {
            PolicyDecision {
                permitted: true,
                reason: "no rule or exception matched".to_string(),
                source: DecisionSource::Default,
                matched_id: None,
                evaluated_at: now,
            }
        };

        debug!(
            agent = %agent_id,
            %role,
            %tier,
            permitted = decision.permitted,
            source = ?decision.source,
            "policy evaluated"
        );

        state.audit_log.push(PolicyAuditEntry {
            id: Uuid::new_v4().to_string(),
            agent_id: agent_id.clone(),
            role,
            tier,
            domain: domain.map(String::from),
            decision: decision.clone(),
        });

        decision
    }

    /// Add a rule. Bumps the policy version.
    pub fn add_rule(&self, rule: PolicyRule) -> String {
        let mut state = self.write_state();
        let id = rule.id.clone();
        state.rules.push(rule);
        state.version.bump_minor();
        id
    }

    /// Remove a rule by id. Bumps the policy version.
    pub fn remove_rule(&self, rule_id: &str) -> Result<()> {
        let mut state = self.write_state();
        let before = state.rules.len();
        state.rules.retain(|r| r.id != rule_id);
        if state.rules.len() == before {
            return Err(RoleGateError::RuleNotFound(rule_id.to_string()));
        }
        state.version.bump_minor();
        Ok(())
    }

    /// Add a per-agent exception. Bumps the policy version.
    pub fn add_exception(&self, exception: PolicyException) -> String {
        let mut state = self.write_state();
        let id = exception.id.clone();
        state.exceptions.push(exception);
        state.version.bump_minor();
        id
    }

    /// Remove an exception by id. Bumps the policy version.
    pub fn remove_exception(&self, exception_id: &str) -> Result<()> {
        let mut state = self.write_state();
        let before = state.exceptions.len();
        state.exceptions.retain(|e| e.id != exception_id);
        if state.exceptions.len() == before {
            return Err(RoleGateError::ExceptionNotFound(exception_id.to_string()));
        }
        state.version.bump_minor();
        Ok(())
    }

    /// Drop all expired exceptions; bumps the version if any were removed.
    pub fn clear_expired_exceptions(&self) -> usize {
        let now = Utc::now();
        let mut state = self.write_state();
        let before = state.exceptions.len();
        state.exceptions.retain(|e| !e.is_expired(now));
        let removed = before - state.exceptions.len();
        if removed > 0 {
            state.version.bump_minor();
        }
        removed
    }

    /// Administrative major-version bump marking a policy regime change.
    pub fn promote_version(&self) -> PolicyVersion {
        let mut state = self.write_state();
        state.version.bump_major();
        state.version
    }

    pub fn version(&self) -> PolicyVersion {
        self.read_state().version
    }

    pub fn rules(&self) -> Vec<PolicyRule> {
        self.read_state().rules.clone()
    }

    pub fn exceptions(&self) -> Vec<PolicyException> {
        self.read_state().exceptions.clone()
    }

    pub fn audit_log(&self) -> Vec<PolicyAuditEntry> {
        self.read_state().audit_log.clone()
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, PolicyState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, PolicyState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn agent(name: &str) -> AgentId {
        AgentId::new(name)
    }

    #[test]
    fn test_default_allow_for_valid_pairs() {
        let policy = RoleGatePolicy::new();
        let decision = policy.evaluate(&agent("a1"), Role::Operator, Tier::Limited, None);
        assert!(decision.permitted);
        assert_eq!(decision.source, DecisionSource::Default);
    }

    #[test]
    fn test_kernel_denies_invalid_pairs() {
        let policy = RoleGatePolicy::new();
        let decision = policy.evaluate(&agent("a1"), Role::Observer, Tier::Broad, None);
        assert!(!decision.permitted);
        assert_eq!(decision.source, DecisionSource::Kernel);
    }

    #[test]
    fn test_exception_takes_precedence_over_rules() {
        let policy = RoleGatePolicy::new();
        policy.add_rule(PolicyRule::new(
            Role::Operator,
            Tier::Limited,
            false,
            "operators locked out of limited scope",
        ));
        policy.add_exception(PolicyException::new(
            agent("special"),
            Role::Operator,
            Tier::Limited,
            true,
            "cso",
            "pilot agent",
        ));

        // The exception wins for the named agent, the rule for everyone else.
        let allowed = policy.evaluate(&agent("special"), Role::Operator, Tier::Limited, None);
        assert!(allowed.permitted);
        assert_eq!(allowed.source, DecisionSource::Exception);

        let denied = policy.evaluate(&agent("other"), Role::Operator, Tier::Limited, None);
        assert!(!denied.permitted);
        assert_eq!(denied.source, DecisionSource::Rule);
    }

    #[test]
    fn test_exception_decision_is_rule_table_independent() {
        let policy = RoleGatePolicy::new();
        policy.add_exception(PolicyException::new(
            agent("pinned"),
            Role::Supervisor,
            Tier::Standard,
            false,
            "auditor",
            "under investigation",
        ));

        let before = policy.evaluate(&agent("pinned"), Role::Supervisor, Tier::Standard, None);

        // Adding unrelated and even contradicting rules must not change it.
        policy.add_rule(PolicyRule::new(
            Role::Supervisor,
            Tier::Standard,
            true,
            "supervisors generally allowed",
        ));
        policy.add_rule(PolicyRule::new(Role::Manager, Tier::Internal, false, "x"));

        let after = policy.evaluate(&agent("pinned"), Role::Supervisor, Tier::Standard, None);
        assert_eq!(before.permitted, after.permitted);
        assert_eq!(after.source, DecisionSource::Exception);
        assert!(!after.permitted);
    }

    #[test]
    fn test_expired_exception_is_ignored() {
        let policy = RoleGatePolicy::new();
        policy.add_exception(
            PolicyException::new(
                agent("lapsed"),
                Role::Operator,
                Tier::Limited,
                false,
                "ops",
                "temporary hold",
            )
            .with_expiry(Utc::now() - Duration::minutes(1)),
        );

        let decision = policy.evaluate(&agent("lapsed"), Role::Operator, Tier::Limited, None);
        assert!(decision.permitted);
        assert_eq!(decision.source, DecisionSource::Default);

        assert_eq!(policy.clear_expired_exceptions(), 1);
        assert!(policy.exceptions().is_empty());
    }

    #[test]
    fn test_domain_filter_matching() {
        let policy = RoleGatePolicy::new();
        policy.add_rule(
            PolicyRule::new(
                Role::Operator,
                Tier::Limited,
                false,
                "no unattended operation on payment systems",
            )
            .with_domain("payments"),
        );

        let in_domain = policy.evaluate(&agent("a"), Role::Operator, Tier::Limited, Some("payments"));
        assert!(!in_domain.permitted);

        let other_domain =
            policy.evaluate(&agent("a"), Role::Operator, Tier::Limited, Some("logistics"));
        assert!(other_domain.permitted);

        // A domain-filtered rule does not match a domainless request.
        let no_domain = policy.evaluate(&agent("a"), Role::Operator, Tier::Limited, None);
        assert!(no_domain.permitted);
    }

    #[test]
    fn test_every_evaluation_is_audited() {
        let policy = RoleGatePolicy::new();
        policy.evaluate(&agent("a"), Role::Operator, Tier::Limited, None);
        policy.evaluate(&agent("a"), Role::Observer, Tier::Broad, None);
        policy.evaluate(&agent("b"), Role::Manager, Tier::Standard, Some("ops"));

        let log = policy.audit_log();
        assert_eq!(log.len(), 3);
        assert!(!log[1].decision.permitted);
        assert_eq!(log[2].domain.as_deref(), Some("ops"));
    }

    #[test]
    fn test_version_bumps_on_mutation() {
        let policy = RoleGatePolicy::new();
        let v0 = policy.version();

        let rule_id = policy.add_rule(PolicyRule::new(Role::Operator, Tier::Limited, true, "r"));
        assert!(policy.version() > v0);

        let v1 = policy.version();
        policy.remove_rule(&rule_id).unwrap();
        assert!(policy.version() > v1);

        // Evaluations alone never bump the version.
        let v2 = policy.version();
        policy.evaluate(&agent("a"), Role::Operator, Tier::Limited, None);
        assert_eq!(policy.version(), v2);

        let promoted = policy.promote_version();
        assert_eq!(promoted.major, v2.major + 1);
        assert_eq!(promoted.minor, 0);
    }

    #[test]
    fn test_remove_missing_rule_errors() {
        let policy = RoleGatePolicy::new();
        assert!(matches!(
            policy.remove_rule("nope"),
            Err(RoleGateError::RuleNotFound(_))
        ));
        assert!(matches!(
            policy.remove_exception("nope"),
            Err(RoleGateError::ExceptionNotFound(_))
        ));
    }

    #[test]
    fn test_independent_instances_do_not_interfere() {
        let a = RoleGatePolicy::new();
        let b = RoleGatePolicy::new();
        a.add_rule(PolicyRule::new(Role::Operator, Tier::Limited, false, "a only"));

        assert!(!a.evaluate(&agent("x"), Role::Operator, Tier::Limited, None).permitted);
        assert!(b.evaluate(&agent("x"), Role::Operator, Tier::Limited, None).permitted);
        assert!(a.version() > b.version());
    }
}
