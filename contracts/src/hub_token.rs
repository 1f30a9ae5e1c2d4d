//! # Hub Ledger
//!
//! The hub is the one ledger that knows about every spoke. On top of the
//! shared balance ledger it keeps:
//!
//! - a registry of connected spoke contracts, one per network, with a mint
//!   ceiling per network;
//! - a supply counter per network tracking how much of the token currently
//!   lives there;
//! - a [`FeePolicy`] deciding whether and at what cost spoke-to-spoke
//!   transfers are forwarded.
//!
//! ## Supply direction
//!
//! For an ordinary spoke, value sent to it increases its supply and value
//! coming back decreases it. For the network the token originated on the
//! direction is inverted: its counter tracks how much has left it for the
//! hub, so value arriving from it increases the counter and value sent back
//! decreases it. Every increase must stay strictly below the network's
//! limit; no decrease may go below zero.
//!
//! ## Forwarding
//!
//! An inbound `xCrossTransfer` first settles the value onto the hub ledger
//! under its destination address. If that destination is another spoke the
//! hub immediately forwards it, paying the hop fee to the transport and
//! burning the policy's token fee from the forwarded value.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use xtoken_protocol::{Amount, Message, NetworkAddress, ProtocolConfig};

use crate::error::{TokenError, TokenResult};
use crate::events::TokenEvent;
use crate::fees::{FeePolicy, NoHopFee};
use crate::host::{CallContext, Host, OutboundCall};
use crate::journal::{execute, Journal};
use crate::ledger::{Ledger, TokenConfig};

// ---------------------------------------------------------------------------
// Chain registry
// ---------------------------------------------------------------------------

/// Connected spoke contracts and their mint limits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRegistry {
    /// Every registration, in order. Re-registering a network appends again.
    connected: Vec<NetworkAddress>,
    spokes: BTreeMap<String, NetworkAddress>,
    limits: BTreeMap<String, Amount>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `spoke` as the contract for its network with `limit`.
    /// Returns `true` if the network was already registered.
    pub fn register(&mut self, spoke: NetworkAddress, limit: Amount) -> bool {
        let net = spoke.net().to_string();
        let existed = self.spokes.contains_key(&net);
        self.connected.push(spoke.clone());
        self.spokes.insert(net.clone(), spoke);
        self.limits.insert(net, limit);
        existed
    }

    pub fn set_limit(&mut self, nid: &str, limit: Amount) {
        self.limits.insert(nid.to_string(), limit);
    }

    /// The registered spoke contract for `nid`.
    pub fn spoke_contract(&self, nid: &str) -> Option<&NetworkAddress> {
        self.spokes.get(nid)
    }

    /// Mint ceiling for `nid`; zero when unset.
    pub fn limit(&self, nid: &str) -> Amount {
        self.limits.get(nid).copied().unwrap_or_default()
    }

    pub fn connected(&self) -> &[NetworkAddress] {
        &self.connected
    }

    /// Distinct network ids of every registration.
    pub fn networks(&self) -> BTreeSet<&str> {
        self.connected.iter().map(NetworkAddress::net).collect()
    }
}

// ---------------------------------------------------------------------------
// Hub state
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    /// Value leaving the hub for a spoke.
    ToSpoke,
    /// Value arriving on the hub from a spoke.
    ToHub,
}

/// Everything a hub call may change. Cloned as the call snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
struct HubState {
    ledger: Ledger,
    registry: ChainRegistry,
    supply: BTreeMap<String, Amount>,
}

impl HubState {
    fn x_supply(&self, nid: &str) -> Amount {
        self.supply.get(nid).copied().unwrap_or_default()
    }

    fn adjust_supply(&mut self, net: &str, value: Amount, flow: Flow) -> TokenResult<()> {
        let current = self.x_supply(net);
        let origin = net == self.ledger.token_native_nid();
        let increase = match flow {
            Flow::ToSpoke => !origin,
            Flow::ToHub => origin,
        };

        let next = if increase {
            let next = current.checked_add(value).ok_or(TokenError::Overflow)?;
            let limit = self.registry.limit(net);
            if next >= limit {
                return Err(TokenError::LimitExceeded {
                    net: net.to_string(),
                    limit,
                    would_have: next,
                });
            }
            next
        } else {
            current
                .checked_sub(value)
                .ok_or_else(|| TokenError::SupplyUnderflow {
                    net: net.to_string(),
                    supply: current,
                    amount: value,
                })?
        };

        debug!(net, %current, %next, ?flow, "network supply adjusted");
        self.supply.insert(net.to_string(), next);
        Ok(())
    }

    /// Settles `value` arriving from `spoke_net` onto the hub ledger under `to`.
    fn transfer_to_hub(&mut self, spoke_net: &str, to: &NetworkAddress, value: Amount) -> TokenResult<()> {
        self.adjust_supply(spoke_net, value, Flow::ToHub)?;
        self.ledger.mint_silent(to, value)
    }

    /// Burns `value` of `from` on the hub and sends it to `to`'s spoke.
    fn transfer_to_spoke(
        &mut self,
        journal: &mut Journal,
        fee: Amount,
        from: &NetworkAddress,
        to: &NetworkAddress,
        value: Amount,
        data: &[u8],
    ) -> TokenResult<()> {
        self.ledger.burn_silent(from, value)?;
        let spoke = self
            .registry
            .spoke_contract(to.net())
            .cloned()
            .ok_or_else(|| TokenError::UnconfiguredNetwork(to.net().to_string()))?;
        self.adjust_supply(spoke.net(), value, Flow::ToSpoke)?;

        let protocols = self
            .ledger
            .protocols(spoke.net())
            .cloned()
            .unwrap_or_else(ProtocolConfig::default);
        let payload = Message::CrossTransfer {
            from: from.to_string(),
            to: to.to_string(),
            value,
            data: data.to_vec(),
        };
        let rollback = Message::CrossTransferRevert {
            to: to.to_string(),
            value,
        };

        info!(%from, %to, %value, %fee, spoke = %spoke, "cross transfer sent");
        journal.send(OutboundCall {
            fee,
            to: spoke,
            data: payload.encode(),
            rollback: rollback.encode(),
            protocols,
        });
        journal.emit(TokenEvent::XTransfer {
            from: from.to_string(),
            to: to.to_string(),
            value,
            data: data.to_vec(),
        });
        Ok(())
    }

    /// Forwards `from`'s hub-held `value` to `to`'s spoke if the fee policy
    /// allows it.
    fn transfer_to_spoke_with_fee(
        &mut self,
        journal: &mut Journal,
        policy: &dyn FeePolicy,
        from: &NetworkAddress,
        to: &NetworkAddress,
        value: Amount,
        data: &[u8],
    ) -> TokenResult<()> {
        let Some(fee) = policy.hop_fee(to.net()) else {
            debug!(%from, %to, %value, "no hop fee for network, value held on hub");
            return Ok(());
        };

        let token_fee = policy.token_fee(to.net(), fee, value);
        let remaining = value
            .checked_sub(token_fee)
            .filter(|remaining| !remaining.is_zero())
            .ok_or_else(|| {
                TokenError::InvalidAmount(format!(
                    "transfer amount {value} does not cover token fee {token_fee}"
                ))
            })?;
        if !token_fee.is_zero() {
            self.ledger.burn(journal, from, token_fee)?;
        }

        self.transfer_to_spoke(journal, fee, from, to, remaining, data)
    }

    #[allow(clippy::too_many_arguments)]
    fn x_cross_transfer(
        &mut self,
        journal: &mut Journal,
        host: &mut dyn Host,
        policy: &dyn FeePolicy,
        origin: &str,
        from: &str,
        to: &str,
        value: Amount,
        data: &[u8],
    ) -> TokenResult<()> {
        let spoke = NetworkAddress::parse(origin)?;
        if self.registry.spoke_contract(spoke.net()) != Some(&spoke) {
            return Err(TokenError::UnknownSpoke(origin.to_string()));
        }
        info!(origin, from, to, %value, "cross transfer received");

        if to.is_empty() || to == from {
            let sender = NetworkAddress::parse(from)?;
            self.transfer_to_hub(spoke.net(), &sender, value)?;
            journal.emit(TokenEvent::XTransfer {
                from: from.to_string(),
                to: from.to_string(),
                value,
                data: data.to_vec(),
            });
            return Ok(());
        }

        let receiver = NetworkAddress::parse(to)?;
        self.transfer_to_hub(spoke.net(), &receiver, value)?;
        journal.emit(TokenEvent::XTransfer {
            from: from.to_string(),
            to: to.to_string(),
            value,
            data: data.to_vec(),
        });

        if !self.ledger.is_native(&receiver) {
            return self.transfer_to_spoke_with_fee(journal, policy, &receiver, &receiver, value, data);
        }

        if host.is_contract(receiver.account()) {
            host.x_token_fallback(receiver.account(), from, value, data)
                .map_err(|reason| TokenError::ReceiverRejected {
                    contract: receiver.account().to_string(),
                    reason,
                })?;
        }
        Ok(())
    }

    fn x_cross_transfer_revert(&mut self, origin: &str, to: &str, value: Amount) -> TokenResult<()> {
        if origin != self.ledger.transport_address().to_string() {
            return Err(TokenError::Unauthorized(format!(
                "{origin} cannot deliver rollbacks"
            )));
        }
        let to = NetworkAddress::parse(to)?;
        let spoke_net = self
            .registry
            .spoke_contract(to.net())
            .map(|spoke| spoke.net().to_string())
            .ok_or_else(|| TokenError::UnconfiguredNetwork(to.net().to_string()))?;

        warn!(%to, %value, "cross transfer rolled back");
        self.transfer_to_hub(&spoke_net, &to, value)
    }

    fn x_transfer(
        &mut self,
        journal: &mut Journal,
        policy: &dyn FeePolicy,
        from: &str,
        to: &str,
        value: Amount,
        data: &[u8],
    ) -> TokenResult<()> {
        let from = NetworkAddress::parse(from)?;
        let to = NetworkAddress::parse(to)?;
        self.transfer_to_spoke_with_fee(journal, policy, &from, &to, value, data)
    }

    fn dispatch(
        &mut self,
        journal: &mut Journal,
        host: &mut dyn Host,
        policy: &dyn FeePolicy,
        origin: &str,
        message: Message,
    ) -> TokenResult<()> {
        match message {
            Message::CrossTransfer {
                from,
                to,
                value,
                data,
            } => self.x_cross_transfer(journal, host, policy, origin, &from, &to, value, &data),
            Message::CrossTransferRevert { to, value } => {
                self.x_cross_transfer_revert(origin, &to, value)
            }
            Message::Transfer { to, value, data } => {
                self.x_transfer(journal, policy, origin, &to, value, &data)
            }
            Message::HubTransfer { to, value, data } => {
                self.ledger.x_hub_transfer(journal, host, origin, &to, value, &data)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Hub token
// ---------------------------------------------------------------------------

/// A token deployed in the hub role.
#[derive(Debug)]
pub struct HubToken {
    state: HubState,
    events: Vec<TokenEvent>,
    fee_policy: Box<dyn FeePolicy>,
}

impl HubToken {
    /// Deploys a hub that never forwards spoke-to-spoke transfers.
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
            state: HubState {
                ledger,
                registry: ChainRegistry::new(),
                supply: BTreeMap::new(),
            },
            events: Vec::new(),
            fee_policy: Box::new(NoHopFee),
        }
    }

    /// Replaces the fee policy.
    pub fn with_fee_policy(mut self, policy: impl FeePolicy + 'static) -> Self {
        self.fee_policy = Box::new(policy);
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.state.ledger
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.state.registry
    }

    // -- reads --------------------------------------------------------------

    pub fn name(&self) -> &str {
        self.state.ledger.name()
    }

    pub fn symbol(&self) -> &str {
        self.state.ledger.symbol()
    }

    pub fn decimals(&self) -> u8 {
        self.state.ledger.decimals()
    }

    /// Supply held on the hub ledger itself.
    pub fn total_supply(&self) -> Amount {
        self.state.ledger.total_supply()
    }

    pub fn nid(&self) -> &str {
        self.state.ledger.nid()
    }

    pub fn token_native_nid(&self) -> &str {
        self.state.ledger.token_native_nid()
    }

    pub fn transport(&self) -> &str {
        self.state.ledger.transport()
    }

    pub fn protocols(&self, nid: &str) -> Option<&ProtocolConfig> {
        self.state.ledger.protocols(nid)
    }

    pub fn balance_of(&self, account: &str) -> Amount {
        self.state.ledger.balance_of(account)
    }

    pub fn x_balance_of(&self, address: &str) -> TokenResult<Amount> {
        self.state.ledger.x_balance_of(address)
    }

    /// Supply currently on `nid`.
    pub fn x_supply(&self, nid: &str) -> Amount {
        self.state.x_supply(nid)
    }

    /// Hub supply plus the supply of every connected network.
    pub fn x_total_supply(&self) -> Amount {
        self.state
            .registry
            .networks()
            .into_iter()
            .fold(self.total_supply(), |total, nid| {
                total.saturating_add(self.x_supply(nid))
            })
    }

    /// Every registration as `net/account`, in order.
    pub fn connected_chains(&self) -> Vec<String> {
        self.state
            .registry
            .connected()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn spoke_contract(&self, nid: &str) -> Option<&NetworkAddress> {
        self.state.registry.spoke_contract(nid)
    }

    pub fn spoke_limit(&self, nid: &str) -> Amount {
        self.state.registry.limit(nid)
    }

    pub fn events(&self) -> &[TokenEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<TokenEvent> {
        std::mem::take(&mut self.events)
    }

    // -- administration -----------------------------------------------------

    /// Registers the spoke contract at `spoke` with a mint `limit` for its
    /// network. Re-registering a network replaces its contract and limit.
    pub fn add_chain(&mut self, ctx: &mut CallContext<'_>, spoke: &str, limit: Amount) -> TokenResult<()> {
        let caller = ctx.caller().to_string();
        execute("add_chain", &mut self.state, &mut self.events, ctx.host(), |state, _, _| {
            state.ledger.only_owner(&caller)?;
            let spoke = NetworkAddress::parse(spoke)?;
            if state.ledger.is_native(&spoke) {
                return Err(TokenError::InvalidArgument(format!(
                    "{spoke} is on the hub's own network"
                )));
            }
            if state.registry.register(spoke.clone(), limit) {
                warn!(%spoke, %limit, "network registered again, spoke and limit replaced");
            } else {
                info!(%spoke, %limit, "chain connected");
            }
            Ok(())
        })
    }

    /// Sets the mint limit for `nid`. Administrator only.
    pub fn set_spoke_limit(&mut self, ctx: &mut CallContext<'_>, nid: &str, limit: Amount) -> TokenResult<()> {
        let caller = ctx.caller().to_string();
        execute("set_spoke_limit", &mut self.state, &mut self.events, ctx.host(), |state, _, _| {
            state.ledger.only_owner(&caller)?;
            info!(nid, %limit, "spoke limit set");
            state.registry.set_limit(nid, limit);
            Ok(())
        })
    }

    /// Issues `amount` new tokens to `to`. Administrator only.
    pub fn mint(&mut self, ctx: &mut CallContext<'_>, to: &str, amount: Amount) -> TokenResult<()> {
        let caller = ctx.caller().to_string();
        execute("mint", &mut self.state, &mut self.events, ctx.host(), |state, journal, _| {
            state.ledger.only_owner(&caller)?;
            let to = state.ledger.resolve(to)?;
            info!(%to, %amount, "mint");
            state.ledger.mint(journal, &to, amount)
        })
    }

    pub fn configure_protocols(
        &mut self,
        ctx: &mut CallContext<'_>,
        nid: &str,
        sources: Vec<String>,
        destinations: Vec<String>,
    ) -> TokenResult<()> {
        let caller = ctx.caller().to_string();
        execute("configure_protocols", &mut self.state, &mut self.events, ctx.host(), |state, _, _| {
            state.ledger.configure_protocols(&caller, nid, sources, destinations)
        })
    }

    pub fn migrate_legacy_balances(&mut self, ctx: &mut CallContext<'_>) -> TokenResult<usize> {
        let caller = ctx.caller().to_string();
        execute("migrate_legacy_balances", &mut self.state, &mut self.events, ctx.host(), |state, _, _| {
            state.ledger.migrate_legacy(&caller)
        })
    }

    // -- transfers ----------------------------------------------------------

    /// Moves `value` from the caller to the local account `to`.
    pub fn transfer(
        &mut self,
        ctx: &mut CallContext<'_>,
        to: &str,
        value: Amount,
        data: Option<&[u8]>,
    ) -> TokenResult<()> {
        let from = self.state.ledger.local(ctx.caller())?;
        let to = self.state.ledger.local(to)?;
        execute("transfer", &mut self.state, &mut self.events, ctx.host(), |state, journal, host| {
            state.ledger.transfer(journal, host, &from, &to, value, data)
        })
    }

    /// Ledger-only transfer to any network address; remote receivers get a
    /// hub-held balance and nothing is sent.
    pub fn hub_transfer(
        &mut self,
        ctx: &mut CallContext<'_>,
        to: &str,
        value: Amount,
        data: Option<&[u8]>,
    ) -> TokenResult<()> {
        let from = self.state.ledger.local(ctx.caller())?;
        let to = self.state.ledger.resolve(to)?;
        execute("hub_transfer", &mut self.state, &mut self.events, ctx.host(), |state, journal, host| {
            state.ledger.transfer(journal, host, &from, &to, value, data)
        })
    }

    /// Moves `value` from the caller to `to`. A remote `to` is sent to its
    /// spoke; the call's payment pays the transport.
    pub fn cross_transfer(
        &mut self,
        ctx: &mut CallContext<'_>,
        to: &str,
        value: Amount,
        data: Option<&[u8]>,
    ) -> TokenResult<()> {
        let from = self.state.ledger.local(ctx.caller())?;
        let to = self.state.ledger.resolve(to)?;
        let fee = ctx.payment();
        execute("cross_transfer", &mut self.state, &mut self.events, ctx.host(), |state, journal, host| {
            if state.ledger.is_native(&to) {
                state.ledger.transfer(journal, host, &from, &to, value, data)
            } else {
                state.transfer_to_spoke(journal, fee, &from, &to, value, data.unwrap_or_default())
            }
        })
    }

    /// Inbound delivery from the transport.
    pub fn handle_call_message(
        &mut self,
        ctx: &mut CallContext<'_>,
        from: &str,
        data: &[u8],
        proof: Option<&[String]>,
    ) -> TokenResult<()> {
        let caller = ctx.caller().to_string();
        let policy = self.fee_policy.as_ref();
        execute("handle_call_message", &mut self.state, &mut self.events, ctx.host(), |state, journal, host| {
            state.ledger.only_transport(&caller)?;
            state.ledger.verify_inbound(from, proof)?;
            let message = Message::decode(data)?;
            debug!(from, method = message.method(), "inbound message");
            state.dispatch(journal, host, policy, from, message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token_native_nid: &str) -> TokenConfig {
        TokenConfig {
            name: "Hub".into(),
            symbol: "HUB".into(),
            decimals: 18,
            native_nid: "1.ICON".into(),
            token_native_nid: token_native_nid.into(),
            transport: "cxcall".into(),
            owner: "hxowner".into(),
        }
    }

    fn state(token_native_nid: &str) -> HubState {
        let mut registry = ChainRegistry::new();
        registry.register(NetworkAddress::new("1.ETH", "0x1"), Amount::from(100u64));
        HubState {
            ledger: Ledger::new(config(token_native_nid)).unwrap(),
            registry,
            supply: BTreeMap::new(),
        }
    }

    #[test]
    fn registry_replaces_on_duplicate() {
        let mut registry = ChainRegistry::new();
        assert!(!registry.register(NetworkAddress::new("1.ETH", "0x1"), Amount::from(5u64)));
        assert!(registry.register(NetworkAddress::new("1.ETH", "0x9"), Amount::from(7u64)));

        assert_eq!(registry.connected().len(), 2);
        assert_eq!(registry.networks().len(), 1);
        assert_eq!(registry.spoke_contract("1.ETH").unwrap().account(), "0x9");
        assert_eq!(registry.limit("1.ETH"), Amount::from(7u64));
        assert_eq!(registry.limit("1.BSC"), Amount::zero());
    }

    #[test]
    fn spoke_supply_rises_outbound_and_falls_inbound() {
        let mut state = state("1.ICON");
        state.adjust_supply("1.ETH", Amount::from(40u64), Flow::ToSpoke).unwrap();
        assert_eq!(state.x_supply("1.ETH"), Amount::from(40u64));

        state.adjust_supply("1.ETH", Amount::from(15u64), Flow::ToHub).unwrap();
        assert_eq!(state.x_supply("1.ETH"), Amount::from(25u64));

        let err = state
            .adjust_supply("1.ETH", Amount::from(26u64), Flow::ToHub)
            .unwrap_err();
        assert!(matches!(err, TokenError::SupplyUnderflow { .. }));
    }

    #[test]
    fn origin_network_direction_is_inverted() {
        let mut state = state("1.ETH");
        state.adjust_supply("1.ETH", Amount::from(30u64), Flow::ToHub).unwrap();
        assert_eq!(state.x_supply("1.ETH"), Amount::from(30u64));

        state.adjust_supply("1.ETH", Amount::from(30u64), Flow::ToSpoke).unwrap();
        assert!(state.x_supply("1.ETH").is_zero());

        assert!(matches!(
            state.adjust_supply("1.ETH", Amount::one(), Flow::ToSpoke),
            Err(TokenError::SupplyUnderflow { .. })
        ));
    }

    #[test]
    fn limit_is_strict() {
        let mut state = state("1.ICON");
        state.adjust_supply("1.ETH", Amount::from(99u64), Flow::ToSpoke).unwrap();
        let err = state
            .adjust_supply("1.ETH", Amount::one(), Flow::ToSpoke)
            .unwrap_err();
        assert_eq!(
            err,
            TokenError::LimitExceeded {
                net: "1.ETH".into(),
                limit: Amount::from(100u64),
                would_have: Amount::from(100u64),
            }
        );
        assert_eq!(state.x_supply("1.ETH"), Amount::from(99u64));
    }

    #[test]
    fn revert_only_from_transport_address() {
        let mut state = state("1.ICON");
        let err = state
            .x_cross_transfer_revert("1.ETH/0x1", "1.ETH/0x32", Amount::one())
            .unwrap_err();
        assert!(matches!(err, TokenError::Unauthorized(_)));
    }
}
