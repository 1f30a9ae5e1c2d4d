//! # Protocol Constants
//!
//! Every magic value of the XToken wire layer lives here: message tags,
//! the legacy account syntax, the zero account used by mint/burn markers,
//! and token defaults. If a literal from this list shows up anywhere else,
//! it should be replaced with a reference to this module.

// ---------------------------------------------------------------------------
// Message Tags
// ---------------------------------------------------------------------------

/// Hub → spoke (or spoke → hub) transfer of value between chains.
pub const METHOD_CROSS_TRANSFER: &str = "xCrossTransfer";

/// Rollback payload attached to every outbound `xCrossTransfer`.
pub const METHOD_CROSS_TRANSFER_REVERT: &str = "xCrossTransferRevert";

/// Request to move a hub-held balance out to a spoke.
pub const METHOD_TRANSFER: &str = "xTransfer";

/// Ledger transfer with an explicit, message-supplied sender.
pub const METHOD_HUB_TRANSFER: &str = "xHubTransfer";

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Separator between the network id and the account in a network address.
pub const ADDRESS_SEPARATOR: char = '/';

/// Account prefixes of the legacy local-chain address scheme: externally
/// owned accounts (`hx…`) and contracts (`cx…`).
pub const LEGACY_ACCOUNT_PREFIXES: [&str; 2] = ["hx", "cx"];

/// The all-zero local account. Appears as the counterparty in mint and burn
/// marker events; can never hold a balance.
pub const ZERO_ACCOUNT: &str = "hx0000000000000000000000000000000000000000";

// ---------------------------------------------------------------------------
// Event Data
// ---------------------------------------------------------------------------

/// Data attached to synthesized mint marker events.
pub const MINT_MARKER: &[u8] = b"mint";

/// Data attached to synthesized burn marker events.
pub const BURN_MARKER: &[u8] = b"burn";

/// Data recorded in events and passed to receiver callbacks when a local
/// transfer carries no data at all.
pub const MISSING_DATA_PLACEHOLDER: &[u8] = b"None";

// ---------------------------------------------------------------------------
// Token Defaults
// ---------------------------------------------------------------------------

/// Decimal places used when a deployment does not specify any.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Basis-point denominator for percentage fees (100% = 10 000 bps).
pub const MAX_BPS: u32 = 10_000;

/// Returns `true` if `account` is written in the legacy local-chain syntax.
pub fn is_legacy_account(account: &str) -> bool {
    LEGACY_ACCOUNT_PREFIXES
        .iter()
        .any(|prefix| account.starts_with(prefix))
}
