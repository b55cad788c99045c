// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Shardvault Devnet Node
//!
//! Entry point for the `shardvault-node` binary. Parses CLI arguments,
//! initializes logging and metrics, wires the vault to its in-memory
//! providers, and serves the HTTP API.
//!
//! The binary supports two subcommands:
//!
//! - `run`    : start the node
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use shardvault_contracts::FractionVault;
use shardvault_protocol::config::{VaultConfig, PROTOCOL_VERSION};
use shardvault_protocol::custody::AssetRegistry;
use shardvault_protocol::ledger::FractionBook;
use shardvault_protocol::Address;

use cli::{Commands, ShardvaultCli};
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ShardvaultCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Builds the vault policy from command-line arguments.
fn vault_config(args: &cli::RunArgs) -> VaultConfig {
    VaultConfig {
        fraction_supply: args.fraction_supply,
        custody_address: Address::new(args.custody_address.as_str()),
        first_claim_id: args.first_claim_id,
    }
}

/// Starts the node: API server and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "shardvault_node=info,shardvault_contracts=info,shardvault_protocol=info,tower_http=debug",
        args.log_format.into(),
    );

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        fraction_supply = args.fraction_supply,
        first_claim_id = args.first_claim_id,
        custody = %args.custody_address,
        "starting shardvault-node"
    );

    // --- Providers ---
    let config = vault_config(&args);
    let registry = Arc::new(AssetRegistry::new(config.custody_address.clone()));
    let book = Arc::new(FractionBook::with_metadata_uri(args.metadata_uri.as_str()));

    // --- Vault ---
    let vault = Arc::new(
        FractionVault::new(config, registry.clone(), book.clone())
            .context("failed to construct vault")?,
    );
    tracing::info!(fraction_supply = vault.fraction_supply(), "vault ready");

    // --- Metrics ---
    let node_metrics =
        Arc::new(NodeMetrics::new().context("failed to register prometheus metrics")?);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        vault,
        registry,
        book,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
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

    tracing::info!("shardvault-node stopped");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("shardvault-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol        {}", PROTOCOL_VERSION);
    println!("rustc           {}", rustc_version());
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
