//! # CLI Interface
//!
//! Defines the command-line argument structure for `xtoken-node` using
//! `clap` derive. Supports four subcommands: `simulate`, `decode`,
//! `encode`, and `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// XToken devnet and codec tool.
///
/// Runs hub/spoke scenarios against an in-process hub ledger with a
/// simulated transport, and converts cross-chain payloads between their
/// RLP wire form and JSON.
#[derive(Parser, Debug)]
#[command(
    name = "xtoken-node",
    about = "XToken hub devnet and message codec",
    version,
    propagate_version = true
)]
pub struct XTokenNodeCli {
    #[command(flatten)]
    pub logging: LoggingArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the XToken node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario file against a fresh hub and print the report.
    Simulate(SimulateArgs),
    /// Decode a hex RLP payload into JSON.
    Decode(DecodeArgs),
    /// Encode a JSON message into a hex RLP payload.
    Encode(EncodeArgs),
    /// Print version information and exit.
    Version,
}

/// Log output settings shared by every subcommand.
#[derive(Args, Debug)]
pub struct LoggingArgs {
    /// Log output format.
    #[arg(long, global = true, env = "XTOKEN_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(
        long,
        global = true,
        env = "XTOKEN_LOG",
        default_value = "xtoken_node=info,xtoken_contracts=info"
    )]
    pub log_level: String,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Path to the scenario file (TOML).
    #[arg(env = "XTOKEN_SCENARIO")]
    pub scenario: PathBuf,

    /// Exit with an error if any step fails.
    #[arg(long)]
    pub strict: bool,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pub pretty: bool,
}

/// Arguments for the `decode` subcommand.
#[derive(Parser, Debug)]
pub struct DecodeArgs {
    /// Hex payload, with or without a `0x` prefix.
    pub payload: String,
}

/// Arguments for the `encode` subcommand.
#[derive(Parser, Debug)]
pub struct EncodeArgs {
    /// JSON message, e.g. `{"method":"hub_transfer","to":"1.ETH/0x1","value":"0x10"}`.
    pub json: String,
}
