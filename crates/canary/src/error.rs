use thiserror::Error;

/// Errors that can occur during canary operations
#[derive(Error, Debug)]
pub enum CanaryError {
    #[error("Duplicate probe id: {0}")]
    DuplicateProbe(String),

    #[error("Probe not found: {0}")]
    ProbeNotFound(String),

    #[error("Invalid probe: {0}")]
    InvalidProbe(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CanaryError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateProbe(_) => "CONFLICT",
            Self::ProbeNotFound(_) => "NOT_FOUND",
            Self::InvalidProbe(_) | Self::ValidationError(_) => "VALIDATION",
            Self::Internal(_) => "INTERNAL",
        }
    }
}
