//! # Token Constants & Node Defaults
//!
//! Every fixed parameter of CorgiCoin lives here. The ledger itself takes
//! its name, symbol, and supply as creation arguments; these are the values
//! the deployment uses when nobody overrides them.

use crate::units::Amount;

// ---------------------------------------------------------------------------
// Token Parameters
// ---------------------------------------------------------------------------

/// Human-readable token name.
pub const TOKEN_NAME: &str = "CorgiCoin";

/// Ticker symbol.
pub const TOKEN_SYMBOL: &str = "CORGI";

/// Number of fractional decimal digits. Fixed for every ledger.
pub const DECIMALS: u8 = 18;

/// One whole token expressed in smallest units (10^18).
pub const ONE_TOKEN: Amount = 1_000_000_000_000_000_000;

/// Initial supply in whole tokens: one hundred billion.
pub const INITIAL_SUPPLY_TOKENS: u64 = 100_000_000_000;

/// Initial supply in smallest units (10^11 × 10^18 = 10^29).
///
/// Fits comfortably in a `u128`, whose maximum is about 3.4 × 10^38.
pub const INITIAL_SUPPLY: Amount = INITIAL_SUPPLY_TOKENS as Amount * ONE_TOKEN;

/// Allowance value treated as unlimited. Never decremented by spends.
pub const UNLIMITED_ALLOWANCE: Amount = Amount::MAX;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Ledger protocol version reported by the node.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default JSON-RPC / REST port.
pub const DEFAULT_RPC_PORT: u16 = 7887;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 7888;

/// Capacity of the live event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Number of deterministic development accounts listed by default.
pub const DEFAULT_DEV_ACCOUNTS: u32 = 3;
