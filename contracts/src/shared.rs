//! # Shared Ledger Handle
//!
//! Hosts that accept calls from many tasks at once wrap the ledger in a
//! [`SharedLedger`]. Every call takes one mutex, so operations are applied
//! in a single total order and nobody can observe a half-applied write.
//!
//! Events produced by an operation are drained and handed to the
//! [`EventSink`] while the lock is still held. Subscribers therefore see
//! events in exactly the order the ledger applied them.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::events::EventRecord;
use crate::token::{Ledger, LedgerSnapshot, Operation, TokenError};

/// Receives ledger events as they are emitted.
///
/// Implementations run under the ledger lock and must not block.
pub trait EventSink: Send + Sync {
    fn publish(&self, record: &EventRecord);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _record: &EventRecord) {}
}

/// Cheaply cloneable, lock-serialized handle to one [`Ledger`].
#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
    sink: Arc<dyn EventSink>,
}

impl SharedLedger {
    /// Wraps `ledger`, discarding events.
    ///
    /// Events already pending on `ledger` (such as the creation mint) stay
    /// in its log until the first operation drains them.
    pub fn new(ledger: Ledger) -> Self {
        Self::with_sink(ledger, Arc::new(NullSink))
    }

    /// Wraps `ledger`, publishing every event to `sink`.
    pub fn with_sink(ledger: Ledger, sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
            sink,
        }
    }

    /// Applies `op` and publishes the events it produced.
    ///
    /// Returns the published events on success. On error the ledger is
    /// unchanged and nothing is published.
    pub fn submit(&self, op: &Operation) -> Result<Vec<EventRecord>, TokenError> {
        let mut ledger = self.inner.lock();
        ledger.execute(op)?;
        let events = ledger.drain_events();
        for record in &events {
            self.sink.publish(record);
        }
        Ok(events)
    }

    /// Publishes any events pending on the ledger without applying an
    /// operation. Hosts call this once after startup to flush the mint.
    pub fn flush_events(&self) -> Vec<EventRecord> {
        let mut ledger = self.inner.lock();
        let events = ledger.drain_events();
        for record in &events {
            self.sink.publish(record);
        }
        events
    }

    /// Runs a read-only closure against a consistent view of the ledger.
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        let ledger = self.inner.lock();
        f(&ledger)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.read(Ledger::snapshot)
    }
}

impl std::fmt::Debug for SharedLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedLedger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corgi_protocol::Address;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<EventRecord>>);

    impl EventSink for RecordingSink {
        fn publish(&self, record: &EventRecord) {
            self.0.lock().push(record.clone());
        }
    }

    #[test]
    fn submit_publishes_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let ledger = Ledger::deploy(Address::dev(0)).unwrap();
        let shared = SharedLedger::with_sink(ledger, sink.clone());

        assert_eq!(shared.flush_events().len(), 1);
        shared
            .submit(&Operation::Transfer {
                caller: Address::dev(0),
                to: Address::dev(1),
                amount: 10,
            })
            .unwrap();

        let seen = sink.0.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].seq, 0);
        assert_eq!(seen[1].seq, 1);
    }

    #[test]
    fn rejected_submit_publishes_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let mut ledger = Ledger::deploy(Address::dev(0)).unwrap();
        ledger.drain_events();
        let shared = SharedLedger::with_sink(ledger, sink.clone());

        let err = shared
            .submit(&Operation::Burn {
                caller: Address::dev(5),
                amount: 1,
            })
            .unwrap_err();
        assert!(matches!(err, TokenError::InsufficientBalance { .. }));
        assert!(sink.0.lock().is_empty());
    }

    #[test]
    fn read_sees_applied_state() {
        let shared = SharedLedger::new(Ledger::deploy(Address::dev(0)).unwrap());
        shared
            .submit(&Operation::Burn {
                caller: Address::dev(0),
                amount: 1,
            })
            .unwrap();
        let supply = shared.read(|l| l.total_supply());
        assert_eq!(supply, corgi_protocol::config::INITIAL_SUPPLY - 1);
        assert_eq!(shared.snapshot().metadata.total_supply, supply);
    }
}
