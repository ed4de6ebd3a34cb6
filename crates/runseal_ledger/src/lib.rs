//! RUNSEAL Event Ledger
//!
//! Hash-chained, append-only record of one monitored run: the ledger itself,
//! the persisted manifest form with its codec, and the chain verifier.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod event;
pub mod ledger;
pub mod manifest;
pub mod verify;

pub use chain::HashChain;
pub use event::Event;
pub use ledger::{EventLedger, LedgerHandle};
pub use manifest::{Manifest, ManifestCodec};
pub use verify::{VerificationResult, Verifier};
