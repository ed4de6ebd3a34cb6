//! Chain verification over loaded manifests.

use crate::chain::HashChain;
use crate::manifest::Manifest;
use runseal_core::{SealError, SealResult};

/// Outcome of verifying a manifest's hash chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationResult {
    /// Every stored chain value and the root hash check out
    Valid,
    /// The chain breaks
    Invalid {
        /// First event whose stored chain value disagrees with the
        /// recomputation; equals the event count when only the root hash
        /// disagrees
        first_bad_index: usize,
    },
}

impl VerificationResult {
    /// Whether the manifest verified cleanly
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Convert to a result, mapping a break to `ChainMismatch`
    ///
    /// # Errors
    ///
    /// `ChainMismatch` carrying the first bad index.
    pub const fn into_result(self) -> SealResult<()> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid { first_bad_index } => Err(SealError::ChainMismatch {
                index: first_bad_index,
            }),
        }
    }
}

/// Recomputes a manifest's hash chain and compares it to the stored values
#[derive(Debug, Clone, Copy)]
pub struct Verifier;

impl Verifier {
    /// Verify a manifest's chain from the seed constant forward
    ///
    /// Any single-bit alteration to any event's kind, fields, or chain value
    /// shows up as a mismatch at that event or downstream of it.
    #[must_use]
    pub fn check(manifest: &Manifest) -> VerificationResult {
        let mut current = HashChain::SEED;
        for (index, event) in manifest.events.iter().enumerate() {
            let recomputed = HashChain::next(current, &event.canonical_bytes());
            if recomputed != event.chain {
                tracing::debug!(index, "stored chain value disagrees with recomputation");
                return VerificationResult::Invalid {
                    first_bad_index: index,
                };
            }
            current = recomputed;
        }
        if current != manifest.root_hash {
            tracing::debug!("root hash disagrees with recomputed chain tip");
            return VerificationResult::Invalid {
                first_bad_index: manifest.events.len(),
            };
        }
        VerificationResult::Valid
    }
}
