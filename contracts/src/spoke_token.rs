//! Spoke-role token: a ledger that accepts `HubTransfer` messages from the
//! transport and otherwise behaves like a plain fungible token.

use tracing::info;
use xtoken_protocol::{Amount, Message, ProtocolConfig};

use crate::error::{TokenError, TokenResult};
use crate::events::TokenEvent;
use crate::host::CallContext;
use crate::journal::execute;
use crate::ledger::{Ledger, TokenConfig};

/// A token deployed in the spoke role.
#[derive(Clone, Debug)]
pub struct SpokeToken {
    ledger: Ledger,
    events: Vec<TokenEvent>,
}

impl SpokeToken {
    pub fn new(config: TokenConfig) -> TokenResult<Self> {
        Ok(Self::from_ledger(Ledger::new(config)?))
    }

    /// Deploys over balances recorded under bare local accounts.
    pub fn with_legacy_balances(
        config: TokenConfig,
        legacy: impl IntoIterator<Item = (String, Amount)>,
    ) -> TokenResult<Self> {
        Ok(Self::from_ledger(Ledger::with_legacy_balances(config, legacy)?))
    }

    pub fn from_ledger(ledger: Ledger) -> Self {
        Self {
            ledger,
            events: Vec::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // -- reads --------------------------------------------------------------

    pub fn name(&self) -> &str {
        self.ledger.name()
    }

    pub fn symbol(&self) -> &str {
        self.ledger.symbol()
    }

    pub fn decimals(&self) -> u8 {
        self.ledger.decimals()
    }

    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    pub fn nid(&self) -> &str {
        self.ledger.nid()
    }

    pub fn token_native_nid(&self) -> &str {
        self.ledger.token_native_nid()
    }

    pub fn transport(&self) -> &str {
        self.ledger.transport()
    }

    pub fn protocols(&self, nid: &str) -> Option<&ProtocolConfig> {
        self.ledger.protocols(nid)
    }

    pub fn balance_of(&self, account: &str) -> Amount {
        self.ledger.balance_of(account)
    }

    pub fn x_balance_of(&self, address: &str) -> TokenResult<Amount> {
        self.ledger.x_balance_of(address)
    }

    /// Events emitted by committed calls, oldest first.
    pub fn events(&self) -> &[TokenEvent] {
        &self.events
    }

    /// Drains the event log.
    pub fn take_events(&mut self) -> Vec<TokenEvent> {
        std::mem::take(&mut self.events)
    }

    // -- entry points -------------------------------------------------------

    /// Moves `value` from the caller to the local account `to`.
    pub fn transfer(
        &mut self,
        ctx: &mut CallContext<'_>,
        to: &str,
        value: Amount,
        data: Option<&[u8]>,
    ) -> TokenResult<()> {
        let from = self.ledger.local(ctx.caller())?;
        let to = self.ledger.local(to)?;
        execute("transfer", &mut self.ledger, &mut self.events, ctx.host(), |ledger, journal, host| {
            ledger.transfer(journal, host, &from, &to, value, data)
        })
    }

    /// Moves `value` from the caller to any network address. A bare account
    /// is taken as local.
    pub fn hub_transfer(
        &mut self,
        ctx: &mut CallContext<'_>,
        to: &str,
        value: Amount,
        data: Option<&[u8]>,
    ) -> TokenResult<()> {
        let from = self.ledger.local(ctx.caller())?;
        let to = self.ledger.resolve(to)?;
        execute("hub_transfer", &mut self.ledger, &mut self.events, ctx.host(), |ledger, journal, host| {
            ledger.transfer(journal, host, &from, &to, value, data)
        })
    }

    /// Sets the transport sources and destinations for `nid`. Administrator
    /// only.
    pub fn configure_protocols(
        &mut self,
        ctx: &mut CallContext<'_>,
        nid: &str,
        sources: Vec<String>,
        destinations: Vec<String>,
    ) -> TokenResult<()> {
        let caller = ctx.caller().to_string();
        execute("configure_protocols", &mut self.ledger, &mut self.events, ctx.host(), |ledger, _, _| {
            ledger.configure_protocols(&caller, nid, sources, destinations)
        })
    }

    /// Moves every legacy balance under its native network address.
    /// Administrator only. Returns the number of balances moved.
    pub fn migrate_legacy_balances(&mut self, ctx: &mut CallContext<'_>) -> TokenResult<usize> {
        let caller = ctx.caller().to_string();
        execute("migrate_legacy_balances", &mut self.ledger, &mut self.events, ctx.host(), |ledger, _, _| {
            ledger.migrate_legacy(&caller)
        })
    }

    /// Inbound delivery from the transport. Only `xHubTransfer` is handled
    /// in the spoke role.
    pub fn handle_call_message(
        &mut self,
        ctx: &mut CallContext<'_>,
        from: &str,
        data: &[u8],
        proof: Option<&[String]>,
    ) -> TokenResult<()> {
        let caller = ctx.caller().to_string();
        execute("handle_call_message", &mut self.ledger, &mut self.events, ctx.host(), |ledger, journal, host| {
            ledger.only_transport(&caller)?;
            ledger.verify_inbound(from, proof)?;
            match Message::decode(data)? {
                Message::HubTransfer { to, value, data } => {
                    info!(from, %to, %value, "inbound hub transfer");
                    ledger.x_hub_transfer(journal, host, from, &to, value, &data)
                }
                other => Err(TokenError::UnknownMethod(other.method().to_string())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ReceiverBehavior, SimulatedHost};

    fn config() -> TokenConfig {
        TokenConfig {
            name: "Spoke".into(),
            symbol: "SPK".into(),
            decimals: 18,
            native_nid: "1.ICON".into(),
            token_native_nid: "1.ETH".into(),
            transport: "cxcall".into(),
            owner: "hxowner".into(),
        }
    }

    fn token_with(account: &str, amount: u64) -> SpokeToken {
        SpokeToken::with_legacy_balances(config(), vec![(account.to_string(), Amount::from(amount))])
            .unwrap()
    }

    #[test]
    fn rejected_callback_leaves_no_trace() {
        let mut token = token_with("hxalice", 50);
        let mut host = SimulatedHost::new();
        host.register_contract("cxvault", ReceiverBehavior::Reject("closed".into()));

        let err = token
            .transfer(&mut host.ctx("hxalice"), "cxvault", Amount::from(10u64), None)
            .unwrap_err();

        assert!(matches!(err, TokenError::ReceiverRejected { .. }));
        assert_eq!(token.balance_of("hxalice"), Amount::from(50u64));
        assert_eq!(token.balance_of("cxvault"), Amount::zero());
        assert!(token.events().is_empty());
    }

    #[test]
    fn transfer_rejects_network_address_receiver() {
        let mut token = token_with("hxalice", 50);
        let mut host = SimulatedHost::new();
        let err = token
            .transfer(&mut host.ctx("hxalice"), "1.ETH/0x32", Amount::one(), None)
            .unwrap_err();
        assert!(matches!(err, TokenError::MalformedAddress(_)));
    }

    #[test]
    fn handle_call_message_requires_transport() {
        let mut token = token_with("hxalice", 50);
        let mut host = SimulatedHost::new();
        let msg = Message::HubTransfer {
            to: "1.ICON/hxbob".into(),
            value: Amount::one(),
            data: Vec::new(),
        };
        let err = token
            .handle_call_message(&mut host.ctx("hxmallory"), "1.ETH/0x1", &msg.encode(), None)
            .unwrap_err();
        assert!(matches!(err, TokenError::Unauthorized(_)));
    }

    #[test]
    fn spoke_rejects_hub_only_methods() {
        let mut token = token_with("hxalice", 50);
        let mut host = SimulatedHost::new();
        token
            .configure_protocols(&mut host.ctx("hxowner"), "1.ETH", vec![], vec![])
            .unwrap();

        let msg = Message::Transfer {
            to: "1.ICON/hxbob".into(),
            value: Amount::one(),
            data: Vec::new(),
        };
        let err = token
            .handle_call_message(&mut host.ctx("cxcall"), "1.ETH/0x1", &msg.encode(), None)
            .unwrap_err();
        assert_eq!(err, TokenError::UnknownMethod("xTransfer".into()));
    }

    #[test]
    fn take_events_drains_log() {
        let mut token = token_with("hxalice", 50);
        let mut host = SimulatedHost::new();
        token
            .transfer(&mut host.ctx("hxalice"), "hxbob", Amount::from(5u64), Some(&b"x"[..]))
            .unwrap();
        assert_eq!(token.take_events().len(), 1);
        assert!(token.events().is_empty());
    }
}
