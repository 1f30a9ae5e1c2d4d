//! # Host Environment and Transport
//!
//! The ledgers never talk to the outside world directly. Everything they
//! need from the chain they run on goes through two seams:
//!
//! - [`ContractHost`] tells whether an account is a contract and invokes
//!   its token-received callbacks synchronously. A callback error aborts the
//!   whole call.
//! - [`Transport`] is the cross-chain messaging service. Sends are
//!   fire-and-forget; the ledger only hands them over once the call that
//!   produced them has committed.
//!
//! [`SimulatedHost`] implements both in memory. The node's devnet and the
//! test suites drive the ledgers through it.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use xtoken_protocol::{Amount, NetworkAddress, ProtocolConfig};

/// A message handed to the transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundCall {
    /// Native-currency payment forwarded to the transport for relay fees.
    pub fee: Amount,
    /// Spoke contract the message is addressed to.
    pub to: NetworkAddress,
    /// Encoded forward payload.
    pub data: Vec<u8>,
    /// Encoded payload the transport delivers back on failure.
    pub rollback: Vec<u8>,
    /// Transport adapters for the destination network.
    pub protocols: ProtocolConfig,
}

/// Contract detection and receiver callbacks.
pub trait ContractHost {
    /// Returns `true` if the local `account` is a contract.
    fn is_contract(&self, account: &str) -> bool;

    /// `tokenFallback(from, value, data)` on a local contract, for transfers
    /// whose sender is a local account.
    fn token_fallback(
        &mut self,
        contract: &str,
        from: &str,
        value: Amount,
        data: &[u8],
    ) -> Result<(), String>;

    /// `xTokenFallback(from, value, data)` on a local contract, for
    /// transfers whose sender is a network address on another chain.
    /// Contracts without this capability must return an error.
    fn x_token_fallback(
        &mut self,
        contract: &str,
        from: &str,
        value: Amount,
        data: &[u8],
    ) -> Result<(), String>;
}

/// The cross-chain messaging service.
pub trait Transport {
    fn send_call_message(&mut self, call: OutboundCall);
}

/// Everything a ledger call may touch outside its own state.
pub trait Host: ContractHost + Transport {}

impl<T: ContractHost + Transport + ?Sized> Host for T {}

/// Who is calling, with what payment attached, inside which host.
pub struct CallContext<'a> {
    caller: String,
    payment: Amount,
    host: &'a mut dyn Host,
}

impl<'a> CallContext<'a> {
    pub fn new(caller: impl Into<String>, host: &'a mut dyn Host) -> Self {
        Self {
            caller: caller.into(),
            payment: Amount::zero(),
            host,
        }
    }

    /// Attaches a native-currency payment (relay fee for outbound sends).
    pub fn with_payment(mut self, payment: Amount) -> Self {
        self.payment = payment;
        self
    }

    /// The calling local account.
    pub fn caller(&self) -> &str {
        &self.caller
    }

    /// The attached payment.
    pub fn payment(&self) -> Amount {
        self.payment
    }

    pub fn host(&mut self) -> &mut dyn Host {
        &mut *self.host
    }
}

// ---------------------------------------------------------------------------
// Simulated host
// ---------------------------------------------------------------------------

/// How a registered contract reacts to incoming tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverBehavior {
    /// Implements both callbacks and accepts everything.
    Accept,
    /// Implements both callbacks and rejects everything with this reason.
    Reject(String),
    /// Implements `tokenFallback` only; cross-chain receipts fail.
    LocalOnly,
}

/// Which callback a contract received.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackKind {
    TokenFallback,
    XTokenFallback,
}

/// A callback the simulated host delivered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedCallback {
    pub contract: String,
    pub kind: CallbackKind,
    pub from: String,
    pub value: Amount,
    pub data: Vec<u8>,
}

/// In-memory host: registered contracts, recorded callbacks and a FIFO of
/// messages handed to the transport.
#[derive(Debug, Default)]
pub struct SimulatedHost {
    contracts: HashMap<String, ReceiverBehavior>,
    callbacks: Vec<ReceivedCallback>,
    outbox: VecDeque<OutboundCall>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `account` as a contract with the given behavior.
    pub fn register_contract(&mut self, account: impl Into<String>, behavior: ReceiverBehavior) {
        self.contracts.insert(account.into(), behavior);
    }

    /// A call context for `caller` inside this host.
    pub fn ctx(&mut self, caller: &str) -> CallContext<'_> {
        CallContext::new(caller, self)
    }

    /// Callbacks delivered so far, oldest first.
    pub fn callbacks(&self) -> &[ReceivedCallback] {
        &self.callbacks
    }

    /// Messages handed to the transport and not yet taken.
    pub fn outbox(&self) -> &VecDeque<OutboundCall> {
        &self.outbox
    }

    /// Removes and returns the oldest queued message.
    pub fn pop_outbound(&mut self) -> Option<OutboundCall> {
        self.outbox.pop_front()
    }

    /// Removes and returns every queued message.
    pub fn take_outbound(&mut self) -> Vec<OutboundCall> {
        self.outbox.drain(..).collect()
    }

    fn deliver(
        &mut self,
        kind: CallbackKind,
        contract: &str,
        from: &str,
        value: Amount,
        data: &[u8],
    ) -> Result<(), String> {
        match self.contracts.get(contract) {
            None => return Err(format!("{contract} is not a contract")),
            Some(ReceiverBehavior::Reject(reason)) => return Err(reason.clone()),
            Some(ReceiverBehavior::LocalOnly) if kind == CallbackKind::XTokenFallback => {
                return Err("xTokenFallback is not implemented".into());
            }
            Some(_) => {}
        }
        self.callbacks.push(ReceivedCallback {
            contract: contract.to_string(),
            kind,
            from: from.to_string(),
            value,
            data: data.to_vec(),
        });
        Ok(())
    }
}

impl ContractHost for SimulatedHost {
    fn is_contract(&self, account: &str) -> bool {
        self.contracts.contains_key(account)
    }

    fn token_fallback(
        &mut self,
        contract: &str,
        from: &str,
        value: Amount,
        data: &[u8],
    ) -> Result<(), String> {
        self.deliver(CallbackKind::TokenFallback, contract, from, value, data)
    }

    fn x_token_fallback(
        &mut self,
        contract: &str,
        from: &str,
        value: Amount,
        data: &[u8],
    ) -> Result<(), String> {
        self.deliver(CallbackKind::XTokenFallback, contract, from, value, data)
    }
}

impl Transport for SimulatedHost {
    fn send_call_message(&mut self, call: OutboundCall) {
        self.outbox.push_back(call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_accounts_are_not_contracts() {
        let mut host = SimulatedHost::new();
        host.register_contract("cxreceiver", ReceiverBehavior::Accept);
        assert!(host.is_contract("cxreceiver"));
        assert!(!host.is_contract("hxalice"));
    }

    #[test]
    fn local_only_contract_rejects_cross_chain_receipts() {
        let mut host = SimulatedHost::new();
        host.register_contract("cxlegacy", ReceiverBehavior::LocalOnly);

        assert!(host
            .token_fallback("cxlegacy", "hxalice", Amount::one(), b"")
            .is_ok());
        assert!(host
            .x_token_fallback("cxlegacy", "1.ETH/0x32", Amount::one(), b"")
            .is_err());
        assert_eq!(host.callbacks().len(), 1);
        assert_eq!(host.callbacks()[0].kind, CallbackKind::TokenFallback);
    }

    #[test]
    fn rejecting_contract_reports_reason() {
        let mut host = SimulatedHost::new();
        host.register_contract("cxvault", ReceiverBehavior::Reject("paused".into()));
        assert_eq!(
            host.token_fallback("cxvault", "hxalice", Amount::one(), b""),
            Err("paused".to_string())
        );
        assert!(host.callbacks().is_empty());
    }

    #[test]
    fn outbox_is_fifo() {
        let mut host = SimulatedHost::new();
        for i in 1..=2u64 {
            host.send_call_message(OutboundCall {
                fee: Amount::from(i),
                to: NetworkAddress::new("1.ETH", "0x1"),
                data: Vec::new(),
                rollback: Vec::new(),
                protocols: ProtocolConfig::default(),
            });
        }
        assert_eq!(host.pop_outbound().unwrap().fee, Amount::from(1u64));
        assert_eq!(host.take_outbound().len(), 1);
        assert!(host.outbox().is_empty());
    }

    #[test]
    fn context_carries_payment() {
        let mut host = SimulatedHost::new();
        let ctx = host.ctx("hxalice").with_payment(Amount::from(10u64));
        assert_eq!(ctx.caller(), "hxalice");
        assert_eq!(ctx.payment(), Amount::from(10u64));
    }
}
