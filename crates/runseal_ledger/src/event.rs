//! The recorded event: one observed action with its chain value.

use runseal_core::{EventKind, Fields, Hash, canonical_event_bytes};
use serde::{Deserialize, Serialize};

/// One observed action in a run
///
/// `seq` and `t` are run-environment artifacts: they order events within a
/// run but are excluded from the hash chain and from run-to-run comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Sequence index, assigned by the ledger at append time
    pub seq: u64,
    /// Elapsed seconds since run start
    pub t: f64,
    /// Kind of action
    pub kind: EventKind,
    /// Kind-specific fields, persisted inline in the event object
    #[serde(flatten)]
    pub fields: Fields,
    /// Chain value after folding this event
    pub chain: Hash,
}

impl Event {
    /// Canonical bytes of this event's semantic content
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_event_bytes(self.kind, &self.fields)
    }

    /// Whether two events record the same action, ignoring `seq`, `t`,
    /// and chain values
    #[must_use]
    pub fn content_eq(&self, other: &Event) -> bool {
        self.kind == other.kind && self.fields == other.fields
    }
}
