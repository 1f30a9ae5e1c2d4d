// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # XToken Protocol — Wire Layer
//!
//! The types every XToken component agrees on before any ledger logic runs:
//! how an account on another chain is named, how amounts are written, which
//! transport adapters a network trusts, and how a cross-chain call is laid
//! out on the wire.
//!
//! ## Modules
//!
//! - **address** — `NetworkAddress`, the `<net>/<account>` account name.
//! - **amount** — 256-bit unsigned amounts and their text parser.
//! - **protocols** — per-network transport sources and destinations.
//! - **codec** — the RLP message codec spoken between hub and spokes.
//! - **config** — method tags, marker data, legacy account syntax.
//! - **error** — everything above fails through `ProtocolError`.
//!
//! Nothing in this crate holds state. The ledgers that do live in
//! `xtoken-contracts`.

pub mod address;
pub mod amount;
pub mod codec;
pub mod config;
pub mod error;
pub mod protocols;

pub use address::NetworkAddress;
pub use amount::{parse_amount, Amount};
pub use codec::Message;
pub use error::ProtocolError;
pub use protocols::ProtocolConfig;
