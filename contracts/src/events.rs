//! # Ledger Events
//!
//! Fire-and-forget notifications emitted by the ledger. They are not part
//! of its consistency guarantees: the balance tables are the truth, the
//! events are a record of how they got there.
//!
//! Each event gets a sequence number at emission. Numbers keep increasing
//! across [`EventLog::drain`] calls so subscribers can detect gaps.

use corgi_protocol::units::{amount_string, Amount};
use corgi_protocol::Address;
use serde::{Deserialize, Serialize};

/// A single notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    /// Value moved from `from` to `to`. Mints use the zero address as
    /// `from`; burns use it as `to`.
    Transfer {
        from: Address,
        to: Address,
        #[serde(with = "amount_string")]
        value: Amount,
    },
    /// `owner` set `spender`'s allowance to exactly `value`.
    Approval {
        owner: Address,
        spender: Address,
        #[serde(with = "amount_string")]
        value: Amount,
    },
}

impl LedgerEvent {
    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Transfer { .. } => "Transfer",
            LedgerEvent::Approval { .. } => "Approval",
        }
    }
}

/// An event stamped with its emission sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the ledger's event stream, starting at 0.
    pub seq: u64,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// Append-only buffer of events not yet collected by the host.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    next_seq: u64,
    pending: Vec<EventRecord>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty log whose next event gets sequence number `seq`.
    pub fn starting_at(seq: u64) -> Self {
        Self {
            next_seq: seq,
            pending: Vec::new(),
        }
    }

    /// Appends an event and returns its sequence number.
    pub fn emit(&mut self, event: LedgerEvent) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(EventRecord { seq, event });
        seq
    }

    /// Events emitted since the last drain, oldest first.
    pub fn pending(&self) -> &[EventRecord] {
        &self.pending
    }

    /// Takes all pending events, leaving the log empty.
    pub fn drain(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.pending)
    }

    /// Total number of events ever emitted.
    pub fn emitted(&self) -> u64 {
        self.next_seq
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
