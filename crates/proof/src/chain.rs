//! Chain hashing and verification.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use uuid::Uuid;

use crate::event::ProofEvent;

/// Compute the content hash of an event, chained to its `prev_hash`.
///
/// The preimage is a field-delimited canonical string; `serde_json`
/// serializes object keys in sorted order, so the payload segment is
/// deterministic for equal payloads.
pub fn content_hash(event: &ProofEvent) -> String {
    let mut hasher = Sha256::new();
    hasher.update(event.event_id.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(event.event_type.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(event.correlation_id.as_bytes());
    hasher.update(b"|");
    hasher.update(
        event
            .agent_id
            .as_ref()
            .map(|a| a.as_str())
            .unwrap_or("")
            .as_bytes(),
    );
    hasher.update(b"|");
    hasher.update(event.payload.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(event.occurred_at.to_rfc3339().as_bytes());
    hasher.update(b"|");
    hasher.update(event.prev_hash.as_deref().unwrap_or("genesis").as_bytes());

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        // Infallible for String targets.
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}

/// Where and why a chain verification stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFault {
    /// Position within the verified slice
    pub index: usize,
    pub event_id: Uuid,
    pub reason: String,
}

/// Outcome of a chain verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerification {
    pub valid: bool,
    /// Number of events inspected before stopping
    pub checked: usize,
    /// The first point of divergence, if any
    pub first_invalid: Option<ChainFault>,
}

impl ChainVerification {
    fn ok(checked: usize) -> Self {
        Self {
            valid: true,
            checked,
            first_invalid: None,
        }
    }

    fn broken(checked: usize, fault: ChainFault) -> Self {
        Self {
            valid: false,
            checked,
            first_invalid: Some(fault),
        }
    }
}

/// Verify content hashes and link continuity over a contiguous slice of
/// the chain.
///
/// `prev` is the event immediately preceding the slice in emission order;
/// pass `None` when the slice starts at the beginning of the ledger, in
/// which case the first event must have no predecessor hash.
pub fn verify_events(events: &[ProofEvent], prev: Option<&ProofEvent>) -> ChainVerification {
    let mut expected_prev: Option<&str> = prev.map(|e| e.hash.as_str());

    for (index, event) in events.iter().enumerate() {
        if event.prev_hash.as_deref() != expected_prev {
            return ChainVerification::broken(
                index + 1,
                ChainFault {
                    index,
                    event_id: event.event_id,
                    reason: format!(
                        "link broken: prev_hash {:?} does not match preceding hash {:?}",
                        event.prev_hash, expected_prev
                    ),
                },
            );
        }

        let recomputed = content_hash(event);
        if recomputed != event.hash {
            return ChainVerification::broken(
                index + 1,
                ChainFault {
                    index,
                    event_id: event.event_id,
                    reason: "content hash mismatch: event was altered after emission".to_string(),
                },
            );
        }

        expected_prev = Some(event.hash.as_str());
    }

    ChainVerification::ok(events.len())
}

/// Verify content hashes only, without link continuity.
///
/// Used for correlation-scoped checks, where the events of one request
/// are not adjacent in the global chain.
pub fn verify_content(events: &[ProofEvent]) -> ChainVerification {
    for (index, event) in events.iter().enumerate() {
        if content_hash(event) != event.hash {
            return ChainVerification::broken(
                index + 1,
                ChainFault {
                    index,
                    event_id: event.event_id,
                    reason: "content hash mismatch: event was altered after emission".to_string(),
                },
            );
        }
    }
    ChainVerification::ok(events.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ProofEventType;
    use chrono::Utc;

    fn chained_events(count: usize) -> Vec<ProofEvent> {
        let mut events: Vec<ProofEvent> = Vec::new();
        for i in 0..count {
            let mut event = ProofEvent {
                event_id: Uuid::new_v4(),
                event_type: ProofEventType::DecisionMade,
                correlation_id: format!("corr-{}", i % 2),
                agent_id: None,
                payload: serde_json::json!({ "seq": i }),
                occurred_at: Utc::now(),
                prev_hash: events.last().map(|e: &ProofEvent| e.hash.clone()),
                hash: String::new(),
            };
            event.hash = content_hash(&event);
            events.push(event);
        }
        events
    }

    #[test]
    fn test_hash_is_deterministic_and_chained() {
        let events = chained_events(2);
        assert_eq!(content_hash(&events[0]), events[0].hash);
        assert_eq!(events[1].prev_hash.as_deref(), Some(events[0].hash.as_str()));
        assert_ne!(events[0].hash, events[1].hash);
    }

    #[test]
    fn test_valid_chain_verifies() {
        let events = chained_events(5);
        let verification = verify_events(&events, None);
        assert!(verification.valid);
        assert_eq!(verification.checked, 5);
        assert!(verification.first_invalid.is_none());
    }

    #[test]
    fn test_tampered_payload_breaks_at_that_event() {
        let mut events = chained_events(5);
        events[2].payload = serde_json::json!({ "seq": "edited" });

        let verification = verify_events(&events, None);
        assert!(!verification.valid);
        let fault = verification.first_invalid.unwrap();
        assert_eq!(fault.index, 2);
        assert_eq!(fault.event_id, events[2].event_id);
        assert!(fault.reason.contains("content hash mismatch"));
    }

    #[test]
    fn test_rehashed_tamper_breaks_the_next_link() {
        // An attacker who recomputes the edited event's hash still breaks
        // the link from its successor.
        let mut events = chained_events(4);
        events[1].payload = serde_json::json!({ "seq": "edited" });
        events[1].hash = content_hash(&events[1]);

        let verification = verify_events(&events, None);
        assert!(!verification.valid);
        assert_eq!(verification.first_invalid.unwrap().index, 2);
    }

    #[test]
    fn test_slice_verification_with_predecessor() {
        let events = chained_events(6);
        let verification = verify_events(&events[3..], Some(&events[2]));
        assert!(verification.valid);
        assert_eq!(verification.checked, 3);

        // The wrong predecessor is a broken first link.
        let wrong = verify_events(&events[3..], Some(&events[0]));
        assert!(!wrong.valid);
        assert_eq!(wrong.first_invalid.unwrap().index, 0);
    }

    #[test]
    fn test_first_event_must_be_genesis_when_unanchored() {
        let events = chained_events(3);
        let verification = verify_events(&events[1..], None);
        assert!(!verification.valid);
        assert!(verification
            .first_invalid
            .unwrap()
            .reason
            .contains("link broken"));
    }

    #[test]
    fn test_content_only_verification_ignores_links() {
        let events = chained_events(4);
        // A non-contiguous selection still passes the content check.
        let picked = vec![events[0].clone(), events[3].clone()];
        assert!(verify_content(&picked).valid);

        let mut tampered = picked;
        tampered[1].payload = serde_json::json!({ "x": 1 });
        let verification = verify_content(&tampered);
        assert!(!verification.valid);
        assert_eq!(verification.first_invalid.unwrap().index, 1);
    }

    #[test]
    fn test_empty_chain_is_valid() {
        let verification = verify_events(&[], None);
        assert!(verification.valid);
        assert_eq!(verification.checked, 0);
    }
}
