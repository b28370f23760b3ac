//! # CLI Interface
//!
//! Command-line arguments for `corgi-node`, via `clap` derive. Every
//! creation parameter can also come from the environment so containerized
//! deployments need no flags.

use clap::{Parser, Subcommand};

use corgi_protocol::config::{
    DECIMALS, DEFAULT_DEV_ACCOUNTS, DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT, TOKEN_NAME,
    TOKEN_SYMBOL,
};
use corgi_protocol::units::{parse_units, Amount};
use corgi_protocol::Address;

/// CorgiCoin ledger node.
///
/// Creates one token ledger at startup and serves it over JSON-RPC, with a
/// WebSocket feed of Transfer and Approval events and Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "corgi-node",
    about = "CorgiCoin ledger node",
    version,
    propagate_version = true
)]
pub struct CorgiNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the ledger and serve it.
    Run(RunArgs),
    /// Print the deterministic development accounts.
    DevAccounts(DevAccountsArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Address the HTTP listeners bind to.
    #[arg(long, env = "CORGI_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port for the JSON-RPC and REST API.
    #[arg(long, env = "CORGI_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "CORGI_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Token name, fixed for the life of the ledger.
    #[arg(long, env = "CORGI_NAME", default_value = TOKEN_NAME)]
    pub name: String,

    /// Token symbol, fixed for the life of the ledger.
    #[arg(long, env = "CORGI_SYMBOL", default_value = TOKEN_SYMBOL)]
    pub symbol: String,

    /// Initial supply in whole tokens (decimals allowed, e.g. "1000.5").
    #[arg(
        long,
        env = "CORGI_INITIAL_SUPPLY",
        default_value = "100000000000",
        value_parser = parse_supply
    )]
    pub initial_supply: Amount,

    /// Account credited with the initial supply and recorded as owner.
    ///
    /// Defaults to dev account 0.
    #[arg(long, env = "CORGI_OWNER")]
    pub owner: Option<Address>,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "CORGI_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `dev-accounts` subcommand.
#[derive(Parser, Debug)]
pub struct DevAccountsArgs {
    /// How many accounts to print.
    #[arg(long, short = 'n', default_value_t = DEFAULT_DEV_ACCOUNTS)]
    pub count: u32,
}

/// Parses a whole-token decimal string into smallest units.
fn parse_supply(s: &str) -> Result<Amount, String> {
    parse_units(s, DECIMALS).map_err(|e| e.to_string())
}
