//! Notifications emitted by the ledgers.
//!
//! Events are collected per call and only reach the token's event log when
//! the call commits; a rejected call emits nothing.

use serde::{Deserialize, Serialize};
use xtoken_protocol::Amount;

/// A ledger notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum TokenEvent {
    /// Movement between two local accounts, or a mint/burn marker with the
    /// zero account on one side.
    Transfer {
        from: String,
        to: String,
        value: Amount,
        data: Vec<u8>,
    },
    /// Movement where at least one side is on another network.
    HubTransfer {
        from: String,
        to: String,
        value: Amount,
        data: Vec<u8>,
    },
    /// Hub-level cross-chain transfer.
    XTransfer {
        from: String,
        to: String,
        value: Amount,
        data: Vec<u8>,
    },
}

impl TokenEvent {
    /// Amount carried by the event.
    pub fn value(&self) -> Amount {
        match self {
            TokenEvent::Transfer { value, .. }
            | TokenEvent::HubTransfer { value, .. }
            | TokenEvent::XTransfer { value, .. } => *value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let event = TokenEvent::HubTransfer {
            from: "1.ICON/hxa".into(),
            to: "1.ETH/0x32".into(),
            value: Amount::from(16u64),
            data: b"None".to_vec(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "HubTransfer");
        assert_eq!(json["to"], "1.ETH/0x32");
        assert_eq!(event.value(), Amount::from(16u64));
    }
}
