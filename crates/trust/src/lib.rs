//! Trust profile engine for the agenttrust kernel
//!
//! This crate owns the evidence-weighted scoring pipeline:
//! - weight merging (canonical vector plus bounded domain deltas),
//! - the pure trust calculator (evidence, decay, band classification),
//! - the profile store abstraction and its in-memory default,
//! - the profile service (lifecycle, violation detection, notifications),
//! - the circuit-breaker registry held alongside the service.

mod breaker;
mod calculator;
mod error;
mod notify;
mod profile;
mod service;
mod store;
mod weights;

pub use breaker::{BreakerTrip, CircuitBreaker};
pub use calculator::{band_for_score, CalculatorConfig, TrustCalculator, BAND_THRESHOLDS};
pub use error::TrustError;
pub use notify::{
    ListenerError, TrustChange, TrustListener, TrustViolation, ViolationKind, ViolationSeverity,
};
pub use profile::{DimensionScores, TrustProfile};
pub use service::{RefreshOutcome, TrustProfileService, TrustServiceConfig};
pub use store::{InMemoryProfileStore, ProfileQuery, ProfileStore};
pub use weights::{canonical_weights, domain_preset, merge_weights};

/// Result type for trust operations
pub type Result<T> = std::result::Result<T, TrustError>;
