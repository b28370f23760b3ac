// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CorgiCoin Protocol: Shared Primitives
//!
//! The small set of types every other crate in the workspace agrees on:
//!
//! - **address**: 20-byte account identifiers, the zero sink, dev accounts.
//! - **units**: fixed-point amounts with 18 decimals: parsing and display.
//! - **config**: token constants and default node parameters.
//!
//! Nothing in here mutates ledger state. The ledger lives in
//! `corgi-contracts`; this crate only gives it a vocabulary.

pub mod address;
pub mod config;
pub mod units;

pub use address::{Address, AddressError};
pub use units::{format_units, parse_units, to_base_units, Amount, UnitsError};
