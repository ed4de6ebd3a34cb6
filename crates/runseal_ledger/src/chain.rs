//! Hash chain for tamper-evident event logging.
//!
//! The chain is linear: each link is `BLAKE3(prev || canonical event bytes)`,
//! so every link depends only on its immediate predecessor. No tree is built;
//! runs are sequential and need no branching proofs.

use runseal_core::Hash;

/// The linear hash chain over canonically encoded events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashChain;

impl HashChain {
    /// Chain value before the first event: 32 zero bytes
    pub const SEED: Hash = Hash::zero();

    /// Compute the next chain value from the previous one and an event's
    /// canonical bytes
    #[must_use]
    pub fn next(prev: Hash, content: &[u8]) -> Hash {
        prev.fold(content)
    }

    /// Fold a sequence of canonical encodings from the seed constant
    #[must_use]
    pub fn fold_all<'a, I>(encodings: I) -> Hash
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        encodings
            .into_iter()
            .fold(Self::SEED, |current, content| Self::next(current, content))
    }
}
