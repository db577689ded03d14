use thiserror::Error;

/// Errors that can occur during proof-plane operations
#[derive(Error, Debug)]
pub enum ProofError {
    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProofError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EventNotFound(_) => "NOT_FOUND",
            Self::Store(_) => "TRANSIENT",
            Self::Serialization(_) => "VALIDATION",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<serde_json::Error> for ProofError {
    fn from(err: serde_json::Error) -> Self {
        ProofError::Serialization(err.to_string())
    }
}
