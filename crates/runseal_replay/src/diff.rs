//! Diff engine for comparing two recorded runs.

use runseal_core::{EventKind, Fields, SealError, SealResult};
use runseal_ledger::Manifest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why two runs diverged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Divergence {
    /// Events at the divergence index record different actions
    Content,
    /// One run is a strict prefix of the other
    Truncation,
}

/// One pair of events recording different actions at the same index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    /// Event position in both runs
    pub index: usize,
    /// Kind recorded by run A
    pub kind_a: EventKind,
    /// Kind recorded by run B
    pub kind_b: EventKind,
    /// Fields recorded by run A
    pub fields_a: Fields,
    /// Fields recorded by run B
    pub fields_b: Fields,
}

/// A run-metadata field that differs between the two manifests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDiff {
    /// Metadata field name
    pub field: String,
    /// Value in manifest A
    pub a: String,
    /// Value in manifest B
    pub b: String,
}

/// Structured outcome of comparing two runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    /// First event position at which the runs differ, if any
    pub divergence_index: Option<usize>,
    /// What kind of divergence occurred
    pub divergence: Option<Divergence>,
    /// Event count of run A
    pub length_a: usize,
    /// Event count of run B
    pub length_b: usize,
    /// Every index in the shared prefix where content differs, in order
    pub mismatches: Vec<Mismatch>,
    /// Metadata fields that differ, compared independently of event content
    pub metadata: Vec<MetadataDiff>,
}

impl DiffResult {
    /// Whether the runs matched in both content and metadata
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.divergence_index.is_none() && self.metadata.is_empty()
    }

    /// Convert to a result, mapping any difference to `DivergentRuns`
    ///
    /// Metadata-only differences report index 0: the runs differ before any
    /// event content does.
    ///
    /// # Errors
    ///
    /// `DivergentRuns` carrying the earliest differing event position.
    pub fn into_result(self) -> SealResult<()> {
        if self.is_match() {
            return Ok(());
        }
        Err(SealError::DivergentRuns {
            index: self.divergence_index.unwrap_or(0),
        })
    }

    /// One-line human summary
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_match() {
            return format!("runs match ({} events)", self.length_a);
        }
        match (self.divergence, self.divergence_index) {
            (Some(Divergence::Truncation), Some(index)) => format!(
                "run truncated at event {index} ({} vs {} events)",
                self.length_a, self.length_b
            ),
            (Some(Divergence::Content), Some(index)) => format!(
                "runs diverge at event {index} ({} content mismatches)",
                self.mismatches.len()
            ),
            _ => format!("run metadata differs ({} fields)", self.metadata.len()),
        }
    }
}

impl fmt::Display for DiffResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Compares two recorded runs event by event
#[derive(Debug, Clone, Copy)]
pub struct ReplayComparator;

impl ReplayComparator {
    /// Compare two manifests
    ///
    /// Events are walked in lock step by sequence index; timestamps are
    /// always excluded. Equal root hashes short-circuit the walk, but
    /// metadata is compared regardless.
    #[must_use]
    pub fn compare(a: &Manifest, b: &Manifest) -> DiffResult {
        let metadata = Self::compare_metadata(a, b);
        let length_a = a.events.len();
        let length_b = b.events.len();

        if a.root_hash == b.root_hash {
            tracing::debug!("root hashes equal, skipping event walk");
            return DiffResult {
                divergence_index: None,
                divergence: None,
                length_a,
                length_b,
                mismatches: Vec::new(),
                metadata,
            };
        }

        let shared = length_a.min(length_b);
        let mut mismatches = Vec::new();
        for index in 0..shared {
            let (ea, eb) = (&a.events[index], &b.events[index]);
            if !ea.content_eq(eb) {
                mismatches.push(Mismatch {
                    index,
                    kind_a: ea.kind,
                    kind_b: eb.kind,
                    fields_a: ea.fields.clone(),
                    fields_b: eb.fields.clone(),
                });
            }
        }

        let (divergence_index, divergence) = match mismatches.first() {
            Some(first) => (Some(first.index), Some(Divergence::Content)),
            None if length_a != length_b => (Some(shared), Some(Divergence::Truncation)),
            None => (None, None),
        };

        DiffResult {
            divergence_index,
            divergence,
            length_a,
            length_b,
            mismatches,
            metadata,
        }
    }

    fn compare_metadata(a: &Manifest, b: &Manifest) -> Vec<MetadataDiff> {
        let mut diffs = Vec::new();
        if a.seed != b.seed {
            diffs.push(MetadataDiff {
                field: "seed".to_string(),
                a: format_seed(a.seed),
                b: format_seed(b.seed),
            });
        }
        if a.allow_net != b.allow_net {
            diffs.push(MetadataDiff {
                field: "allow_net".to_string(),
                a: a.allow_net.to_string(),
                b: b.allow_net.to_string(),
            });
        }
        diffs
    }
}

fn format_seed(seed: Option<u64>) -> String {
    match seed {
        Some(value) => value.to_string(),
        None => "null".to_string(),
    }
}
