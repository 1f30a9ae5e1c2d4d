//! # XToken Ledgers
//!
//! One fungible token, many chains. A single **hub** ledger keeps the
//! authoritative view of where every unit of supply lives; a **spoke**
//! ledger on each connected chain holds the local balances and talks to the
//! hub through a cross-chain messaging transport.
//!
//! - **ledger** — balances, total supply, mint/burn, local and hub transfers.
//! - **spoke_token** — the spoke role: ledger plus inbound `xHubTransfer`.
//! - **hub_token** — the hub role: chain registry, per-network supply,
//!   cross-chain settlement, multi-hop forwarding and rollback.
//! - **storage** — balance map keyed by network address with a legacy
//!   fallback for balances recorded before network addressing.
//! - **verifier** — inbound transport-source checks per network.
//! - **fees** — pluggable hop-fee policies for spoke-to-spoke forwarding.
//! - **host** — contract detection, receiver callbacks and the transport.
//! - **events** — `Transfer`, `HubTransfer`, `XTransfer`.
//!
//! ## Design Principles
//!
//! 1. Every entry point is all-or-nothing. State is snapshotted before the
//!    call; events and transport sends are buffered and only published once
//!    the call succeeds.
//! 2. All balance and supply arithmetic is checked. Nothing wraps, nothing
//!    goes negative.
//! 3. The hub's per-network supply plus its own total supply is the token's
//!    cross-chain supply; only burned fees ever reduce it.
//! 4. The ledgers never reach the outside world directly, only through the
//!    [`Host`] trait.

pub mod error;
pub mod events;
pub mod fees;
pub mod host;
pub mod hub_token;
mod journal;
pub mod ledger;
pub mod spoke_token;
pub mod storage;
pub mod verifier;

pub use error::{TokenError, TokenResult};
pub use events::TokenEvent;
pub use fees::{FeePolicy, NoHopFee, StaticFeePolicy};
pub use host::{CallContext, ContractHost, Host, OutboundCall, ReceiverBehavior, SimulatedHost, Transport};
pub use hub_token::{ChainRegistry, HubToken};
pub use ledger::{Ledger, TokenConfig};
pub use spoke_token::SpokeToken;
pub use storage::NetworkAddressMap;
