//! # CLI Interface
//!
//! Defines the command-line argument structure for `shardvault-node` using
//! `clap` derive. Supports two subcommands: `run` and `version`.

use clap::{Parser, Subcommand, ValueEnum};

use shardvault_protocol::config::{
    DEFAULT_CUSTODY_ADDRESS, DEFAULT_FIRST_CLAIM_ID, DEFAULT_FRACTION_SUPPLY,
    DEFAULT_METADATA_URI, DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT,
};

/// Shardvault devnet node.
///
/// Hosts a fraction vault over in-memory custody and ledger providers,
/// serves the JSON API, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "shardvault-node",
    about = "Shardvault devnet node",
    version,
    propagate_version = true
)]
pub struct ShardvaultCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Log output format selectable on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the JSON API.
    #[arg(long, env = "SHARDVAULT_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "SHARDVAULT_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Fraction units minted per deposit.
    #[arg(long, env = "SHARDVAULT_FRACTION_SUPPLY", default_value_t = DEFAULT_FRACTION_SUPPLY)]
    pub fraction_supply: u64,

    /// Claim id assigned to the first deposit.
    #[arg(long, env = "SHARDVAULT_FIRST_CLAIM_ID", default_value_t = DEFAULT_FIRST_CLAIM_ID)]
    pub first_claim_id: u64,

    /// Identity the vault holds custodied assets under.
    #[arg(long, env = "SHARDVAULT_CUSTODY_ADDRESS", default_value = DEFAULT_CUSTODY_ADDRESS)]
    pub custody_address: String,

    /// Fraction metadata URI template; `{id}` is replaced by the claim id.
    #[arg(long, env = "SHARDVAULT_METADATA_URI", default_value = DEFAULT_METADATA_URI)]
    pub metadata_uri: String,

    /// Log output format.
    #[arg(long, env = "SHARDVAULT_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,
}
