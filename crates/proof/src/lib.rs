//! Proof plane: hash-chained audit ledger for the agenttrust kernel
//!
//! Every decision, trust delta, and execution outcome becomes an immutable
//! event whose hash covers its content plus the previous event's hash.
//! Recomputing the chain detects any after-the-fact edit: the first broken
//! link marks the point of tampering or data loss.

mod chain;
mod error;
mod event;
mod ledger;
mod store;

pub use chain::{content_hash, verify_content, verify_events, ChainFault, ChainVerification};
pub use error::ProofError;
pub use event::{ProofEvent, ProofEventType};
pub use ledger::{HookOutcome, LedgerStats, ProofHook, ProofLedger};
pub use store::{EventStore, InMemoryEventStore};

/// Result type for proof-plane operations
pub type Result<T> = std::result::Result<T, ProofError>;
