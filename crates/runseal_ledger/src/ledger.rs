//! The append-only event ledger for one monitored run.

use crate::chain::HashChain;
use crate::event::Event;
use crate::manifest::Manifest;
use chrono::{DateTime, Utc};
use runseal_core::{EventKind, Fields, Hash, SealError, SealResult, canonical_event_bytes};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Ordered, hash-chained record of one run's observable actions
///
/// Created at run start, mutated only by sequential appends, frozen into a
/// [`Manifest`] by [`finalize`](Self::finalize). Run metadata is fixed at
/// construction, before the first append.
#[derive(Debug)]
pub struct EventLedger {
    started_at: DateTime<Utc>,
    origin: Instant,
    seed: Option<u64>,
    allow_net: bool,
    events: Vec<Event>,
    current: Hash,
    closed: bool,
}

impl EventLedger {
    /// Open a ledger for a run with the given metadata
    #[must_use]
    pub fn new(seed: Option<u64>, allow_net: bool) -> Self {
        Self {
            started_at: Utc::now(),
            origin: Instant::now(),
            seed,
            allow_net,
            events: Vec::new(),
            current: HashChain::SEED,
            closed: false,
        }
    }

    /// Append an observed action named by its wire kind
    ///
    /// Assigns the next sequence index, stamps the elapsed time, folds the
    /// canonical encoding into the chain, and stores the event.
    ///
    /// # Errors
    ///
    /// `UnknownEventKind` when `kind` is outside the closed set,
    /// `LedgerClosed` after finalize.
    pub fn append(&mut self, kind: &str, fields: Fields) -> SealResult<&Event> {
        let kind = kind.parse::<EventKind>()?;
        self.append_event(kind, fields)
    }

    /// Append an observed action with an already-typed kind
    ///
    /// # Errors
    ///
    /// `LedgerClosed` after finalize.
    pub fn append_event(&mut self, kind: EventKind, fields: Fields) -> SealResult<&Event> {
        if self.closed {
            return Err(SealError::LedgerClosed);
        }
        let content = canonical_event_bytes(kind, &fields);
        let chain = HashChain::next(self.current, &content);
        let event = Event {
            seq: self.events.len() as u64,
            t: self.origin.elapsed().as_secs_f64(),
            kind,
            fields,
            chain,
        };
        tracing::debug!(seq = event.seq, kind = %event.kind, "ledger append");
        self.current = chain;
        self.events.push(event);
        Ok(&self.events[self.events.len() - 1])
    }

    /// Chain value after the last event (the seed constant if empty)
    #[must_use]
    pub fn root_hash(&self) -> Hash {
        self.current
    }

    /// Events appended so far
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of events appended so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events have been appended
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Close the ledger and freeze it into its persisted form
    #[must_use]
    pub fn finalize(mut self) -> Manifest {
        self.closed = true;
        Manifest {
            started_at_utc: self.started_at,
            seed: self.seed,
            allow_net: self.allow_net,
            events: self.events,
            root_hash: self.current,
        }
    }
}

/// Shared capability handle to a ledger
///
/// The execution layer receives this handle instead of the ledger itself;
/// the mutex is the single serialization point for `seq` assignment and
/// chain advance when the monitored program has concurrent activity.
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    inner: Arc<Mutex<Option<EventLedger>>>,
}

impl LedgerHandle {
    /// Wrap a ledger for shared use
    #[must_use]
    pub fn new(ledger: EventLedger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(ledger))),
        }
    }

    /// Append an observed action
    ///
    /// # Errors
    ///
    /// `UnknownEventKind` for kinds outside the closed set, `LedgerClosed`
    /// once the ledger has been finalized.
    pub fn append(&self, kind: &str, fields: Fields) -> SealResult<Event> {
        let mut guard = self.inner.lock().expect("ledger mutex poisoned");
        let ledger = guard.as_mut().ok_or(SealError::LedgerClosed)?;
        ledger.append(kind, fields).cloned()
    }

    /// Append an observed action with an already-typed kind
    ///
    /// # Errors
    ///
    /// `LedgerClosed` once the ledger has been finalized.
    pub fn append_event(&self, kind: EventKind, fields: Fields) -> SealResult<Event> {
        let mut guard = self.inner.lock().expect("ledger mutex poisoned");
        let ledger = guard.as_mut().ok_or(SealError::LedgerClosed)?;
        ledger.append_event(kind, fields).cloned()
    }

    /// Finalize the underlying ledger
    ///
    /// # Errors
    ///
    /// `LedgerClosed` when finalize was already called through this or a
    /// cloned handle.
    pub fn finalize(&self) -> SealResult<Manifest> {
        let mut guard = self.inner.lock().expect("ledger mutex poisoned");
        let ledger = guard.take().ok_or(SealError::LedgerClosed)?;
        Ok(ledger.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::{VerificationResult, Verifier};
    use runseal_core::{FieldValue, fields};

    fn begin_fields() -> Fields {
        fields([
            ("target", FieldValue::from("demo")),
            ("args", FieldValue::from("")),
        ])
    }

    #[test]
    fn test_append_assigns_contiguous_sequence() {
        let mut ledger = EventLedger::new(Some(1), false);
        ledger.append("begin", begin_fields()).unwrap();
        ledger
            .append("end", fields([("exit_code", FieldValue::Int(0))]))
            .unwrap();

        let seqs: Vec<u64> = ledger.events().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
    }

    #[test]
    fn test_append_advances_chain() {
        let mut ledger = EventLedger::new(None, false);
        assert_eq!(ledger.root_hash(), HashChain::SEED);

        let first = ledger.append("begin", begin_fields()).unwrap().chain;
        assert_ne!(first, HashChain::SEED);
        assert_eq!(ledger.root_hash(), first);

        let second = ledger
            .append("end", fields([("exit_code", FieldValue::Int(0))]))
            .unwrap()
            .chain;
        assert_ne!(second, first);
        assert_eq!(ledger.root_hash(), second);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut ledger = EventLedger::new(None, false);
        let err = ledger.append("mmap", Fields::new()).unwrap_err();
        assert_eq!(
            err,
            SealError::UnknownEventKind {
                kind: "mmap".to_string()
            }
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_timestamps_monotonic() {
        let mut ledger = EventLedger::new(None, false);
        ledger.append("begin", begin_fields()).unwrap();
        ledger
            .append("end", fields([("exit_code", FieldValue::Int(0))]))
            .unwrap();
        let events = ledger.events();
        assert!(events[0].t <= events[1].t);
    }

    #[test]
    fn test_finalize_freezes_root() {
        let mut ledger = EventLedger::new(Some(42), true);
        ledger.append("begin", begin_fields()).unwrap();
        let root = ledger.root_hash();

        let manifest = ledger.finalize();
        assert_eq!(manifest.root_hash, root);
        assert_eq!(manifest.seed, Some(42));
        assert!(manifest.allow_net);
        assert_eq!(manifest.events.len(), 1);
    }

    #[test]
    fn test_empty_ledger_root_is_seed() {
        let manifest = EventLedger::new(None, false).finalize();
        assert_eq!(manifest.root_hash, HashChain::SEED);
        assert!(manifest.events.is_empty());
    }

    #[test]
    fn test_handle_append_after_finalize_fails() {
        let handle = LedgerHandle::new(EventLedger::new(None, false));
        handle.append("begin", begin_fields()).unwrap();
        handle.finalize().unwrap();

        let err = handle
            .append("end", fields([("exit_code", FieldValue::Int(0))]))
            .unwrap_err();
        assert_eq!(err, SealError::LedgerClosed);
        assert_eq!(handle.finalize().unwrap_err(), SealError::LedgerClosed);
    }

    #[test]
    fn test_handle_serializes_concurrent_appends() {
        let handle = LedgerHandle::new(EventLedger::new(None, false));
        let threads: Vec<_> = (0..4)
            .map(|worker| {
                let handle = handle.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        handle
                            .append_event(
                                EventKind::RandomDraw,
                                fields([
                                    ("algorithm", FieldValue::from("pcg64")),
                                    (
                                        "value_digest",
                                        FieldValue::from(format!("{worker}:{i}")),
                                    ),
                                ]),
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let manifest = handle.finalize().unwrap();
        assert_eq!(manifest.events.len(), 100);
        for (i, event) in manifest.events.iter().enumerate() {
            assert_eq!(event.seq, i as u64);
        }
        assert_eq!(Verifier::check(&manifest), VerificationResult::Valid);
    }
}
