//! RUNSEAL Replay Comparison
//!
//! Relates two recorded runs: lock-step event comparison, first divergence,
//! truncation detection, and independent metadata comparison.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;

pub use diff::{DiffResult, Divergence, MetadataDiff, Mismatch, ReplayComparator};
