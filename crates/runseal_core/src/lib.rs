//! RUNSEAL Core Types
//!
//! This crate contains pure types and logic with no I/O: hashes, the closed
//! event-kind enumeration with per-kind field schemas, the canonical event
//! encoding, and the shared error taxonomy.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod error;
pub mod event;
pub mod hash;

// Re-exports
pub use encoding::canonical_event_bytes;
pub use error::{SealError, SealResult};
pub use event::{EventKind, FieldType, FieldValue, Fields, fields};
pub use hash::{Hash, HashError};
