// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CorgiCoin Ledger Contract
//!
//! The fungible-token ledger behind CorgiCoin. A single holder receives the
//! entire supply at creation; after that, value only moves through
//! transfers, delegated transfers, and burns.
//!
//! - **Token**: the [`Ledger`](token::Ledger), holding balances, allowances, total
//!   supply, and the operations that move them.
//! - **Events**: the append-only log of `Transfer` and `Approval`
//!   notifications the ledger emits.
//! - **Shared**: a lock-serialized handle for hosts that take calls from
//!   many threads at once.
//!
//! ## Design Principles
//!
//! 1. Every credit is `checked_add`. Wrapping arithmetic and money do not mix.
//! 2. Operations validate everything first and write second. A rejected
//!    call leaves no trace.
//! 3. `total_supply` equals the sum of all balances after every call, and
//!    the zero address never holds anything.
//! 4. The ledger is a plain owned value. No globals; tests build as many as
//!    they like.

pub mod events;
pub mod shared;
pub mod token;

pub use events::{EventLog, EventRecord, LedgerEvent};
pub use shared::{EventSink, NullSink, SharedLedger};
pub use token::{Ledger, LedgerSnapshot, Operation, TokenError, TokenMetadata};
