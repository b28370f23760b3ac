// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CorgiCoin Ledger Node
//!
//! Entry point for the `corgi-node` binary. Parses CLI arguments, initializes
//! logging and metrics, creates the token ledger, and serves it over HTTP/WS.
//!
//! The binary supports three subcommands:
//!
//! - `run`          start the node
//! - `dev-accounts` print the deterministic development accounts
//! - `version`      print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

use corgi_contracts::{Ledger, SharedLedger};
use corgi_protocol::config::{DECIMALS, EVENT_CHANNEL_CAPACITY, PROTOCOL_VERSION};
use corgi_protocol::units::format_units;
use corgi_protocol::Address;

use cli::{Commands, CorgiNodeCli};
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CorgiNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::DevAccounts(args) => {
            dev_accounts(args);
            Ok(())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Creates the ledger and serves it until a shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "corgi_node=info,corgi_contracts=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    let owner = args.owner.unwrap_or_else(|| Address::dev(0));

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        owner = %owner,
        "starting corgi-node"
    );

    // --- Ledger ---
    let ledger = Ledger::new(&args.name, &args.symbol, args.initial_supply, owner)
        .context("failed to create token ledger")?;
    tracing::info!(
        name = %args.name,
        symbol = %args.symbol,
        supply = %format_units(args.initial_supply, DECIMALS),
        "ledger created"
    );

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());

    // --- Event broadcast ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let sink = api::BroadcastSink::new(event_tx.clone(), Arc::clone(&node_metrics));
    let shared = SharedLedger::with_sink(ledger, Arc::new(sink));
    shared.flush_events();

    // --- Application state ---
    let app_state = api::app_state(
        format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        shared,
        event_tx,
        Arc::clone(&node_metrics),
    );

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("{}:{}", args.bind, args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("{}:{}", args.bind, args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("corgi-node stopped");
    Ok(())
}

/// Prints the first `count` development accounts, one per line.
fn dev_accounts(args: cli::DevAccountsArgs) {
    for index in 0..args.count {
        let marker = if index == 0 { "  (default owner)" } else { "" };
        println!("{:>3}  {}{}", index, Address::dev(index), marker);
    }
}

/// Prints version information to stdout.
fn print_version() {
    println!("corgi-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol   {}", PROTOCOL_VERSION);
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
