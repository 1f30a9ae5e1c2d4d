//! # In-Process Devnet
//!
//! Runs a [`Scenario`] against one hub deployment. The transport is an
//! in-memory relay queue: every message the hub sends waits there until a
//! `deliver` step drops it at its spoke or a `rollback` step bounces it back
//! to the hub as a failed delivery.

use std::collections::{BTreeMap, VecDeque};

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;
use xtoken_contracts::{HubToken, OutboundCall, SimulatedHost, TokenEvent};
use xtoken_protocol::{Message, NetworkAddress};

use crate::scenario::{amount, Scenario, Step};

/// A transport message waiting in the relay.
#[derive(Debug, Clone, Serialize)]
pub struct PendingCall {
    pub id: Uuid,
    pub to: String,
    pub method: String,
    pub value: String,
    pub fee: String,
    #[serde(skip)]
    pub call: OutboundCall,
}

impl PendingCall {
    fn new(call: OutboundCall) -> Self {
        let (method, value) = match Message::decode(&call.data) {
            Ok(message) => (message.method().to_string(), message.value().to_string()),
            Err(_) => ("undecodable".to_string(), String::new()),
        };
        Self {
            id: Uuid::new_v4(),
            to: call.to.to_string(),
            method,
            value,
            fee: call.fee.to_string(),
            call,
        }
    }
}

/// Result of one scenario step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub action: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Final state of a devnet run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub token: String,
    pub symbol: String,
    pub hub_nid: String,
    pub steps: Vec<StepOutcome>,
    pub balances: BTreeMap<String, String>,
    pub supply: BTreeMap<String, String>,
    pub total_supply: String,
    pub x_total_supply: String,
    pub connected_chains: Vec<String>,
    pub delivered: Vec<PendingCall>,
    pub pending: Vec<PendingCall>,
    pub events: Vec<TokenEvent>,
}

impl Report {
    /// Number of steps that failed.
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }
}

/// One hub, its host, and the relay between it and the spokes.
pub struct Devnet {
    hub: HubToken,
    host: SimulatedHost,
    relay: VecDeque<PendingCall>,
    delivered: Vec<PendingCall>,
    owner: String,
    transport: String,
    watch: Vec<String>,
}

impl Devnet {
    /// Deploys the scenario's hub, registers its contracts and connects
    /// its chains.
    pub fn from_scenario(scenario: &Scenario) -> Result<Self> {
        let mut hub = HubToken::new(scenario.token.clone()).context("hub deployment rejected")?;
        if let Some(fees) = &scenario.fees {
            hub = hub.with_fee_policy(fees.to_policy()?);
        }

        let mut host = SimulatedHost::new();
        for contract in &scenario.contracts {
            host.register_contract(contract.account.clone(), contract.behavior.clone());
        }

        let owner = scenario.token.owner.clone();
        for chain in &scenario.chains {
            let spoke = NetworkAddress::parse(&chain.spoke)
                .with_context(|| format!("invalid spoke address {}", chain.spoke))?;
            let limit = amount(&chain.limit)?;
            hub.add_chain(&mut host.ctx(&owner), &chain.spoke, limit)
                .with_context(|| format!("add_chain {} failed", chain.spoke))?;
            if let Some(protocols) = &chain.protocols {
                hub.configure_protocols(
                    &mut host.ctx(&owner),
                    spoke.net(),
                    protocols.sources.clone(),
                    protocols.destinations.clone(),
                )
                .with_context(|| format!("configure_protocols {} failed", spoke.net()))?;
            }
        }

        info!(
            token = hub.name(),
            hub = hub.nid(),
            chains = scenario.chains.len(),
            "devnet deployed"
        );

        Ok(Self {
            hub,
            host,
            relay: VecDeque::new(),
            delivered: Vec::new(),
            owner,
            transport: scenario.token.transport.clone(),
            watch: scenario.watch.clone(),
        })
    }

    pub fn hub(&self) -> &HubToken {
        &self.hub
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingCall> {
        self.relay.iter()
    }

    /// Runs every step in order. A failed step is recorded and the run
    /// continues with the next one.
    pub fn run(&mut self, steps: &[Step]) -> Vec<StepOutcome> {
        steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let result = self.apply(step);
                self.collect_outbound();
                match result {
                    Ok(()) => {
                        debug!(index, action = step.action(), "step ok");
                        StepOutcome {
                            index,
                            action: step.action(),
                            ok: true,
                            error: None,
                        }
                    }
                    Err(err) => {
                        warn!(index, action = step.action(), error = %format!("{err:#}"), "step failed");
                        StepOutcome {
                            index,
                            action: step.action(),
                            ok: false,
                            error: Some(format!("{err:#}")),
                        }
                    }
                }
            })
            .collect()
    }

    /// Applies a single step.
    pub fn apply(&mut self, step: &Step) -> Result<()> {
        match step {
            Step::Mint { to, value } => {
                let value = amount(value)?;
                self.hub.mint(&mut self.host.ctx(&self.owner), to, value)?;
            }
            Step::Transfer {
                from,
                to,
                value,
                data,
            } => {
                let value = amount(value)?;
                let data = data.as_deref().map(str::as_bytes);
                self.hub.transfer(&mut self.host.ctx(from), to, value, data)?;
            }
            Step::HubTransfer {
                from,
                to,
                value,
                data,
            } => {
                let value = amount(value)?;
                let data = data.as_deref().map(str::as_bytes);
                self.hub
                    .hub_transfer(&mut self.host.ctx(from), to, value, data)?;
            }
            Step::CrossTransfer {
                from,
                to,
                value,
                fee,
                data,
            } => {
                let value = amount(value)?;
                let fee = fee.as_deref().map(amount).transpose()?.unwrap_or_default();
                let data = data.as_deref().map(str::as_bytes);
                let mut ctx = self.host.ctx(from).with_payment(fee);
                self.hub.cross_transfer(&mut ctx, to, value, data)?;
            }
            Step::Inbound {
                origin,
                protocols,
                message,
            } => {
                let data = message.to_message()?.encode();
                self.hub.handle_call_message(
                    &mut self.host.ctx(&self.transport),
                    origin,
                    &data,
                    protocols.as_deref(),
                )?;
            }
            Step::Deliver => {
                let call = self
                    .relay
                    .pop_front()
                    .ok_or_else(|| anyhow!("relay is empty"))?;
                info!(id = %call.id, to = %call.to, method = %call.method, "delivered");
                self.delivered.push(call);
            }
            Step::Rollback => self.rollback()?,
            Step::SetLimit { nid, limit } => {
                let limit = amount(limit)?;
                self.hub
                    .set_spoke_limit(&mut self.host.ctx(&self.owner), nid, limit)?;
            }
        }
        Ok(())
    }

    /// Bounces the oldest pending call back to the hub as a failed
    /// delivery. If the hub refuses the rollback the call stays queued.
    fn rollback(&mut self) -> Result<()> {
        let Some(call) = self.relay.pop_front() else {
            bail!("relay is empty");
        };
        if call.call.rollback.is_empty() {
            warn!(id = %call.id, "call carries no rollback, dropped");
            return Ok(());
        }

        let from = NetworkAddress::new(self.hub.nid(), self.transport.clone()).to_string();
        let result = self.hub.handle_call_message(
            &mut self.host.ctx(&self.transport),
            &from,
            &call.call.rollback,
            None,
        );
        match result {
            Ok(()) => {
                info!(id = %call.id, to = %call.to, "rolled back");
                Ok(())
            }
            Err(err) => {
                self.relay.push_front(call);
                Err(err).context("rollback rejected")
            }
        }
    }

    fn collect_outbound(&mut self) {
        for call in self.host.take_outbound() {
            let pending = PendingCall::new(call);
            debug!(id = %pending.id, to = %pending.to, method = %pending.method, "queued for relay");
            self.relay.push_back(pending);
        }
    }

    /// Balance of a watched address. A bare account is read on the hub's
    /// own network.
    fn watched_balance(&self, address: &str) -> String {
        let balance = NetworkAddress::parse_or_local(address, self.hub.nid())
            .map_err(Into::into)
            .and_then(|resolved| self.hub.x_balance_of(&resolved.to_string()));
        match balance {
            Ok(value) => value.to_string(),
            Err(err) => format!("error: {err}"),
        }
    }

    /// Snapshot of the hub, the relay, and the watched balances.
    pub fn report(&self, steps: Vec<StepOutcome>) -> Report {
        let balances = self
            .watch
            .iter()
            .map(|address| (address.clone(), self.watched_balance(address)))
            .collect();

        let supply = self
            .hub
            .registry()
            .networks()
            .into_iter()
            .map(|nid| (nid.to_string(), self.hub.x_supply(nid).to_string()))
            .collect();

        Report {
            token: self.hub.name().to_string(),
            symbol: self.hub.symbol().to_string(),
            hub_nid: self.hub.nid().to_string(),
            steps,
            balances,
            supply,
            total_supply: self.hub.total_supply().to_string(),
            x_total_supply: self.hub.x_total_supply().to_string(),
            connected_chains: self.hub.connected_chains(),
            delivered: self.delivered.clone(),
            pending: self.relay.iter().cloned().collect(),
            events: self.hub.events().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtoken_protocol::Amount;

    const BASE: &str = r#"
watch = ["hxalice", "1.ETH/0x32", "1.BSC/0x44"]

[token]
name = "XToken"
symbol = "XTK"
native_nid = "1.ICON"
token_native_nid = "1.ICON"
transport = "cxcall"
owner = "hxowner"

[fees]
hop_fees = { "1.BSC" = "10" }
min_token_fee = "3"

[[chains]]
spoke = "1.ETH/0x1"
limit = "1000000"
protocols = { sources = ["a"], destinations = ["b"] }

[[chains]]
spoke = "1.BSC/0x2"
limit = "1000000"
protocols = { sources = ["c"], destinations = ["d"] }
"#;

    fn devnet(steps: &str) -> (Devnet, Vec<StepOutcome>) {
        let scenario = Scenario::from_toml(&format!("{BASE}\n{steps}")).unwrap();
        let mut devnet = Devnet::from_scenario(&scenario).unwrap();
        let outcomes = devnet.run(&scenario.steps);
        (devnet, outcomes)
    }

    #[test]
    fn deployment_connects_chains() {
        let (devnet, outcomes) = devnet("");
        assert!(outcomes.is_empty());
        assert_eq!(
            devnet.hub().connected_chains(),
            vec!["1.ETH/0x1".to_string(), "1.BSC/0x2".to_string()]
        );
        assert_eq!(devnet.hub().protocols("1.BSC").unwrap().sources, vec!["c".to_string()]);
    }

    #[test]
    fn cross_transfer_queues_and_delivers() {
        let (devnet, outcomes) = devnet(
            r#"
[[steps]]
action = "mint"
to = "hxalice"
value = "100"

[[steps]]
action = "cross_transfer"
from = "hxalice"
to = "1.ETH/0x32"
value = "40"
fee = "5"

[[steps]]
action = "deliver"
"#,
        );
        assert!(outcomes.iter().all(|o| o.ok), "{outcomes:?}");
        assert_eq!(devnet.pending().count(), 0);

        let report = devnet.report(outcomes);
        assert_eq!(report.delivered.len(), 1);
        assert_eq!(report.delivered[0].method, "xCrossTransfer");
        assert_eq!(report.delivered[0].fee, "5");
        assert_eq!(report.balances["hxalice"], "60");
        assert_eq!(report.supply["1.ETH"], "40");
        assert_eq!(report.x_total_supply, "100");
    }

    #[test]
    fn rollback_returns_value_to_hub() {
        let (devnet, outcomes) = devnet(
            r#"
[[steps]]
action = "mint"
to = "hxalice"
value = "100"

[[steps]]
action = "cross_transfer"
from = "hxalice"
to = "1.ETH/0x32"
value = "40"

[[steps]]
action = "rollback"
"#,
        );
        assert!(outcomes.iter().all(|o| o.ok), "{outcomes:?}");

        let hub = devnet.hub();
        assert!(hub.x_supply("1.ETH").is_zero());
        assert_eq!(hub.x_balance_of("1.ETH/0x32").unwrap(), Amount::from(40u64));
        assert_eq!(hub.x_total_supply(), Amount::from(100u64));
    }

    #[test]
    fn inbound_forwarded_to_other_spoke_burns_fee() {
        let (devnet, outcomes) = devnet(
            r#"
[[steps]]
action = "mint"
to = "hxalice"
value = "100"

[[steps]]
action = "cross_transfer"
from = "hxalice"
to = "1.ETH/0x32"
value = "50"

[[steps]]
action = "deliver"

[[steps]]
action = "inbound"
origin = "1.ETH/0x1"
protocols = ["a"]
message = { method = "cross_transfer", from = "1.ETH/0x32", to = "1.BSC/0x44", value = "20" }
"#,
        );
        assert!(outcomes.iter().all(|o| o.ok), "{outcomes:?}");

        let hub = devnet.hub();
        assert_eq!(hub.x_supply("1.ETH"), Amount::from(30u64));
        assert_eq!(hub.x_supply("1.BSC"), Amount::from(17u64));
        assert_eq!(hub.x_total_supply(), Amount::from(97u64));

        let pending: Vec<_> = devnet.pending().collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].to, "1.BSC/0x2");
        assert_eq!(pending[0].value, "17");
        assert_eq!(pending[0].fee, "10");
    }

    #[test]
    fn failed_steps_are_recorded_and_run_continues() {
        let (devnet, outcomes) = devnet(
            r#"
[[steps]]
action = "deliver"

[[steps]]
action = "inbound"
origin = "1.ETH/0x1"
protocols = ["zzz"]
message = { method = "cross_transfer", from = "1.ETH/0x32", to = "1.ICON/hxalice", value = "1" }

[[steps]]
action = "mint"
to = "hxalice"
value = "0x10"
"#,
        );
        let ok: Vec<_> = outcomes.iter().map(|o| o.ok).collect();
        assert_eq!(ok, vec![false, false, true]);
        assert!(outcomes[0].error.as_deref().unwrap().contains("relay is empty"));

        let report = devnet.report(outcomes);
        assert_eq!(report.failures(), 2);
        assert_eq!(report.total_supply, "16");
    }

    #[test]
    fn limit_blocks_cross_transfer() {
        let (devnet, outcomes) = devnet(
            r#"
[[steps]]
action = "mint"
to = "hxalice"
value = "100"

[[steps]]
action = "set_limit"
nid = "1.ETH"
limit = "10"

[[steps]]
action = "cross_transfer"
from = "hxalice"
to = "1.ETH/0x32"
value = "10"
"#,
        );
        assert!(outcomes[1].ok);
        assert!(!outcomes[2].ok);
        assert_eq!(devnet.pending().count(), 0);
        assert_eq!(devnet.hub().balance_of("hxalice"), Amount::from(100u64));
    }

    #[test]
    fn watched_bare_and_full_addresses_resolve() {
        let (devnet, outcomes) = devnet(
            r#"
[[steps]]
action = "mint"
to = "hxalice"
value = "30"

[[steps]]
action = "hub_transfer"
from = "hxalice"
to = "1.BSC/0x44"
value = "12"
"#,
        );
        assert!(outcomes.iter().all(|o| o.ok), "{outcomes:?}");

        let report = devnet.report(outcomes);
        assert_eq!(report.balances["hxalice"], "18");
        assert_eq!(report.balances["1.BSC/0x44"], "12");
        assert_eq!(report.balances["1.ETH/0x32"], "0");
    }

    #[test]
    fn report_serializes_to_json() {
        let (devnet, outcomes) = devnet(
            r#"
[[steps]]
action = "mint"
to = "hxalice"
value = "7"
"#,
        );
        let json = serde_json::to_value(devnet.report(outcomes)).unwrap();
        assert_eq!(json["symbol"], "XTK");
        assert_eq!(json["steps"][0]["action"], "mint");
        assert!(json["steps"][0].get("error").is_none());
        assert_eq!(json["events"][0]["event"], "Transfer");
    }
}
