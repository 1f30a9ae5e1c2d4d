//! Error types for the XToken wire layer.
//!
//! Every parser of untrusted input in this crate reports failures through
//! [`ProtocolError`].

use thiserror::Error;

/// Errors raised while parsing addresses, amounts, or message payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The string is not a valid `<net>/<account>` network address.
    #[error("malformed network address: {0:?}")]
    MalformedAddress(String),

    /// The amount is negative, empty, or not a number.
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    /// The payload's method tag does not match any known message.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// The payload is structurally broken (not a list, wrong arity, bad field).
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<rlp::DecoderError> for ProtocolError {
    fn from(err: rlp::DecoderError) -> Self {
        ProtocolError::Decode(format!("{:?}", err))
    }
}
