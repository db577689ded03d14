//! Role-gate authorization for the agenttrust kernel
//!
//! Two layers decide whether a (role, tier) combination may act:
//! - the kernel: a static validity matrix answering in O(1), and
//! - the policy layer: dynamic rules and per-agent time-bound exceptions
//!   wrapped around the kernel, with an audit entry per evaluation.

mod error;
mod matrix;
mod policy;

pub use error::RoleGateError;
pub use matrix::{max_tier_for_role, min_role_for_tier, validate_role_and_tier};
pub use policy::{
    DecisionSource, PolicyAuditEntry, PolicyDecision, PolicyException, PolicyRule, PolicyVersion,
    RoleGatePolicy,
};

/// Result type for role-gate operations
pub type Result<T> = std::result::Result<T, RoleGateError>;
