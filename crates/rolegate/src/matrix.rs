//! Static role/tier validity matrix.
//!
//! The matrix is monotonic: every role's reachable tiers form a contiguous
//! prefix starting at the sandbox tier. Broader autonomy unlocks broader
//! operational scope, never a disjoint set of scopes.

use agenttrust_types::{Role, Tier};

/// Validity matrix indexed by `[role][tier]`.
///
/// Rows follow `Role::ALL`, columns follow `Tier::ALL`:
/// Sandbox, Internal, Limited, Standard, Broad, Unrestricted.
const MATRIX: [[bool; 6]; 9] = [
    // Observer
    [true, false, false, false, false, false],
    // Reporter
    [true, true, false, false, false, false],
    // Assistant
    [true, true, false, false, false, false],
    // Operator
    [true, true, true, false, false, false],
    // Supervisor
    [true, true, true, true, false, false],
    // Manager
    [true, true, true, true, false, false],
    // Director
    [true, true, true, true, true, false],
    // Executive
    [true, true, true, true, true, false],
    // Sovereign
    [true, true, true, true, true, true],
];

/// Check whether a (role, tier) pair is structurally valid.
///
/// This is a pure O(1) lookup; it never errors.
pub fn validate_role_and_tier(role: Role, tier: Tier) -> bool {
    MATRIX[role.index()][tier.index()]
}

/// The highest tier a role may operate at.
pub fn max_tier_for_role(role: Role) -> Option<Tier> {
    Tier::ALL
        .iter()
        .rev()
        .find(|tier| validate_role_and_tier(role, **tier))
        .copied()
}

/// The lowest role allowed to operate at a tier.
pub fn min_role_for_tier(tier: Tier) -> Option<Role> {
    Role::ALL
        .iter()
        .find(|role| validate_role_and_tier(**role, tier))
        .copied()
}
