//! Persisted manifest form and its codec.
//!
//! The JSON field names and types here are the compatibility contract with
//! other producers and consumers of run records. `seq` is persisted alongside
//! each event so ordering violations are detectable at read time.

use crate::event::Event;
use chrono::{DateTime, Utc};
use runseal_core::{Hash, SealError, SealResult};
use serde::{Deserialize, Serialize};

/// The persisted, immutable record of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Wall-clock start of the run (metadata only, never hashed)
    pub started_at_utc: DateTime<Utc>,
    /// Seed handed to the target's randomness source, if any
    pub seed: Option<u64>,
    /// Whether outbound network access was permitted
    pub allow_net: bool,
    /// Ordered event sequence
    pub events: Vec<Event>,
    /// Chain value after the last event
    pub root_hash: Hash,
}

impl Manifest {
    /// Number of recorded events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the run recorded no events
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Serializer/deserializer for the persisted manifest form
#[derive(Debug, Clone, Copy)]
pub struct ManifestCodec;

impl ManifestCodec {
    /// Produce the persisted representation
    ///
    /// Pretty-printed for human inspection; every field round-trips through
    /// [`read`](Self::read).
    #[must_use]
    pub fn write(manifest: &Manifest) -> Vec<u8> {
        serde_json::to_vec_pretty(manifest).expect("manifests always serialize")
    }

    /// Parse and validate a persisted manifest
    ///
    /// Structural problems are rejected here, before any hashing, so a format
    /// error is never reported as tampering.
    ///
    /// # Errors
    ///
    /// `MalformedManifest` when required fields are absent or mistyped, an
    /// event carries an unrecognized kind or non-scalar field value, a hash
    /// is not 32 hex-encoded bytes, or a per-kind required field is missing;
    /// `EventOrderingViolation` when sequence indices are not a contiguous
    /// ascending run from zero.
    pub fn read(bytes: &[u8]) -> SealResult<Manifest> {
        let manifest: Manifest =
            serde_json::from_slice(bytes).map_err(|err| SealError::MalformedManifest {
                reason: err.to_string(),
            })?;
        Self::validate(&manifest)?;
        Ok(manifest)
    }

    fn validate(manifest: &Manifest) -> SealResult<()> {
        for (index, event) in manifest.events.iter().enumerate() {
            if event.seq != index as u64 {
                return Err(SealError::EventOrderingViolation {
                    index,
                    expected: index as u64,
                    found: event.seq,
                });
            }
            for (name, ty) in event.kind.required_fields() {
                match event.fields.get(*name) {
                    None => {
                        return Err(SealError::MalformedManifest {
                            reason: format!(
                                "event {index} ({}) is missing required field {name}",
                                event.kind
                            ),
                        });
                    }
                    Some(value) if !ty.matches(value) => {
                        return Err(SealError::MalformedManifest {
                            reason: format!(
                                "event {index} ({}) field {name} must be a {}",
                                event.kind,
                                ty.as_str()
                            ),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}
