use thiserror::Error;

/// Errors that can occur during role-gate operations
#[derive(Error, Debug)]
pub enum RoleGateError {
    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Exception not found: {0}")]
    ExceptionNotFound(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Invalid exception: {0}")]
    InvalidException(String),
}
