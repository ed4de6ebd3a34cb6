//! Shared error taxonomy for RUNSEAL.
//!
//! Integrity failures are never transient, so nothing here is retried; every
//! variant carries enough position information to state the earliest point of
//! corruption or divergence.

use thiserror::Error;

/// Result type used across the RUNSEAL crates
pub type SealResult<T> = Result<T, SealError>;

/// Errors produced by the ledger, codec, verifier, and comparator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SealError {
    /// An event kind outside the closed set was appended
    #[error("unrecognized event kind: {kind}")]
    UnknownEventKind {
        /// The rejected kind name
        kind: String,
    },

    /// Append was called after finalize
    #[error("ledger is closed to further appends")]
    LedgerClosed,

    /// A persisted manifest is structurally invalid
    #[error("malformed manifest: {reason}")]
    MalformedManifest {
        /// What was missing or mistyped
        reason: String,
    },

    /// Sequence indices are not a contiguous ascending run from zero
    #[error("event ordering violation at position {index}: expected sequence {expected}, found {found}")]
    EventOrderingViolation {
        /// Position in the event array
        index: usize,
        /// The sequence index that position must carry
        expected: u64,
        /// The sequence index actually found
        found: u64,
    },

    /// A recomputed chain value disagrees with the stored one
    #[error("hash chain mismatch at event {index}")]
    ChainMismatch {
        /// First event whose stored chain value is wrong; equals the event
        /// count when only the root hash disagrees
        index: usize,
    },

    /// Two runs differ in recorded content or metadata
    #[error("runs diverge at event {index}")]
    DivergentRuns {
        /// First differing event position
        index: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SealError::UnknownEventKind {
            kind: "file_mmap".to_string(),
        };
        assert_eq!(format!("{err}"), "unrecognized event kind: file_mmap");

        let err = SealError::ChainMismatch { index: 7 };
        assert!(format!("{err}").contains('7'));
    }

    #[test]
    fn test_ordering_violation_display() {
        let err = SealError::EventOrderingViolation {
            index: 2,
            expected: 2,
            found: 5,
        };
        let s = format!("{err}");
        assert!(s.contains("position 2"));
        assert!(s.contains("found 5"));
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(SealError::LedgerClosed, SealError::LedgerClosed);
        assert_ne!(
            SealError::LedgerClosed,
            SealError::ChainMismatch { index: 0 }
        );
    }
}
