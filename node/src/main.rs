// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # XToken Node
//!
//! Entry point for the `xtoken-node` binary. Parses CLI arguments,
//! initializes logging, and runs one of:
//!
//! - `simulate` — run a scenario against an in-process hub devnet
//! - `decode`   — turn a hex RLP payload into JSON
//! - `encode`   — turn a JSON message into a hex RLP payload
//! - `version`  — print build version information

mod cli;
mod devnet;
mod logging;
mod scenario;

use anyhow::{bail, Context, Result};
use clap::Parser;

use xtoken_protocol::Message;

use cli::{Commands, XTokenNodeCli};
use devnet::Devnet;
use scenario::Scenario;

fn main() -> Result<()> {
    let cli = XTokenNodeCli::parse();
    logging::init_logging(&cli.logging.log_level, cli.logging.log_format);

    match cli.command {
        Commands::Simulate(args) => simulate(args),
        Commands::Decode(args) => decode(args),
        Commands::Encode(args) => encode(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Runs a scenario and prints its report as JSON on stdout.
fn simulate(args: cli::SimulateArgs) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    tracing::info!(
        scenario = %args.scenario.display(),
        steps = scenario.steps.len(),
        "running scenario"
    );

    let mut devnet = Devnet::from_scenario(&scenario)?;
    let outcomes = devnet.run(&scenario.steps);
    tracing::debug!(
        x_total_supply = %devnet.hub().x_total_supply(),
        pending = devnet.pending().count(),
        "devnet settled"
    );
    let report = devnet.report(outcomes);

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    let failures = report.failures();
    if failures > 0 {
        tracing::warn!(failures, "scenario finished with failed steps");
        if args.strict {
            bail!("{failures} step(s) failed");
        }
    } else {
        tracing::info!("scenario finished");
    }
    Ok(())
}

fn decode(args: cli::DecodeArgs) -> Result<()> {
    let hex_str = args.payload.trim();
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(hex_str).context("payload is not valid hex")?;
    let message = Message::decode(&bytes).context("payload is not a valid message")?;
    println!("{}", serde_json::to_string_pretty(&message)?);
    Ok(())
}

fn encode(args: cli::EncodeArgs) -> Result<()> {
    let message: Message = serde_json::from_str(&args.json).context("invalid message JSON")?;
    println!("0x{}", hex::encode(message.encode()));
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("xtoken-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc       {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
