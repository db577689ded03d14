use thiserror::Error;

/// Errors that can occur during trust operations
#[derive(Error, Debug)]
pub enum TrustError {
    #[error("Profile already exists: {0}")]
    ProfileExists(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Stale profile version: {0}")]
    VersionConflict(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid score: {0}")]
    InvalidScore(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrustError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProfileExists(_) | Self::VersionConflict(_) => "CONFLICT",
            Self::ProfileNotFound(_) => "NOT_FOUND",
            Self::InvalidWeights(_) | Self::InvalidScore(_) => "VALIDATION",
            Self::Store(_) => "TRANSIENT",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<agenttrust_types::TypesError> for TrustError {
    fn from(err: agenttrust_types::TypesError) -> Self {
        TrustError::InvalidWeights(err.to_string())
    }
}
