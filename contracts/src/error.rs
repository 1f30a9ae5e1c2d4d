//! Token contract errors.
//!
//! Every failing entry point returns one of these and leaves the ledger
//! exactly as it was before the call.

use thiserror::Error;
use xtoken_protocol::{Amount, ProtocolError};

/// Errors that can occur during hub or spoke ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Negative, malformed, or (after fee deduction) zero amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A debit exceeds the available balance.
    #[error("insufficient balance: account has {balance}, tried to spend {amount}")]
    InsufficientBalance {
        /// Balance of the debited account.
        balance: Amount,
        /// Amount the call tried to debit.
        amount: Amount,
    },

    /// The caller is not the administrator, the transport, or the expected
    /// rollback origin.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The network has no protocol configuration or no registered spoke.
    #[error("network is not configured: {0}")]
    UnconfiguredNetwork(String),

    /// The origin of an inbound transfer is not the registered spoke contract
    /// for its network.
    #[error("{0} is not a connected contract")]
    UnknownSpoke(String),

    /// The transport sources that delivered the message do not satisfy the
    /// network's configuration.
    #[error("invalid protocols used to deliver message from {0}")]
    InvalidProtocol(String),

    /// Moving value onto the network would reach its mint ceiling.
    #[error("mint limit exceeded on {net}: limit {limit}, would have {would_have}")]
    LimitExceeded {
        /// Network whose limit was hit.
        net: String,
        /// Configured ceiling (exclusive).
        limit: Amount,
        /// Supply the network would have had after the call.
        would_have: Amount,
    },

    /// Returning value from a network would push its supply below zero.
    #[error("supply underflow on {net}: supply {supply}, tried to remove {amount}")]
    SupplyUnderflow {
        /// Network whose supply would go negative.
        net: String,
        /// Current supply.
        supply: Amount,
        /// Amount the call tried to remove.
        amount: Amount,
    },

    /// The inbound message's method is not handled by this ledger.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// An address argument could not be parsed.
    #[error("malformed address: {0}")]
    MalformedAddress(String),

    /// An inbound payload could not be decoded.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A receiving contract rejected the tokens or lacks the callback.
    #[error("receiver {contract} rejected transfer: {reason}")]
    ReceiverRejected {
        /// The receiving contract account.
        contract: String,
        /// Reason reported by the host.
        reason: String,
    },

    /// A structurally invalid argument (empty name, zero account, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Arithmetic overflow on a balance or supply.
    #[error("arithmetic overflow")]
    Overflow,
}

impl From<ProtocolError> for TokenError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::MalformedAddress(addr) => TokenError::MalformedAddress(addr),
            ProtocolError::InvalidAmount(amount) => TokenError::InvalidAmount(amount),
            ProtocolError::UnknownMethod(method) => TokenError::UnknownMethod(method),
            ProtocolError::Decode(reason) => TokenError::MalformedMessage(reason),
        }
    }
}

/// Result type for token operations.
pub type TokenResult<T> = Result<T, TokenError>;
