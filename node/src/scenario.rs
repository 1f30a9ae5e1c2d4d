//! # Devnet Scenarios
//!
//! A scenario is a TOML file describing one hub deployment and a list of
//! steps to run against it:
//!
//! ```toml
//! watch = ["hxalice", "1.ETH/0x32"]
//!
//! [token]
//! name = "XToken"
//! symbol = "XTK"
//! native_nid = "1.ICON"
//! token_native_nid = "1.ICON"
//! transport = "cxcall"
//! owner = "hxowner"
//!
//! [[chains]]
//! spoke = "1.ETH/0x1"
//! limit = "1000000"
//! protocols = { sources = ["a"], destinations = ["c"] }
//!
//! [[steps]]
//! action = "mint"
//! to = "hxalice"
//! value = "1000"
//! ```
//!
//! Amounts are strings, decimal or `0x`-prefixed hex, so that values beyond
//! 64 bits survive TOML. Message `data` is taken as UTF-8 text.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use xtoken_contracts::{ReceiverBehavior, StaticFeePolicy, TokenConfig};
use xtoken_protocol::{parse_amount, Amount, Message, ProtocolConfig};

/// A parsed scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub token: TokenConfig,
    /// Hop-fee policy; omitted means the hub never forwards.
    #[serde(default)]
    pub fees: Option<FeeSpec>,
    #[serde(default)]
    pub chains: Vec<ChainSpec>,
    #[serde(default)]
    pub contracts: Vec<ContractSpec>,
    /// Addresses whose balances go into the report.
    #[serde(default)]
    pub watch: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid scenario {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// A spoke to connect at deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSpec {
    /// Spoke contract as `net/account`.
    pub spoke: String,
    pub limit: String,
    /// Transport routes for the spoke's network; omitted leaves the network
    /// unconfigured, so inbound messages from it are refused.
    #[serde(default)]
    pub protocols: Option<ProtocolConfig>,
}

/// A local contract account the simulated host should know about.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractSpec {
    pub account: String,
    #[serde(default = "accepting")]
    pub behavior: ReceiverBehavior,
}

fn accepting() -> ReceiverBehavior {
    ReceiverBehavior::Accept
}

/// Static hop-fee configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeeSpec {
    #[serde(default)]
    pub hop_fees: BTreeMap<String, String>,
    #[serde(default)]
    pub default_hop_fee: Option<String>,
    #[serde(default)]
    pub token_fee_bps: u32,
    #[serde(default)]
    pub min_token_fee: Option<String>,
    #[serde(default)]
    pub token_fee_cap: Option<String>,
}

impl FeeSpec {
    pub fn to_policy(&self) -> Result<StaticFeePolicy> {
        let mut policy = StaticFeePolicy::new().with_token_fee_bps(self.token_fee_bps);
        for (net, fee) in &self.hop_fees {
            policy = policy.with_hop_fee(net.clone(), amount(fee)?);
        }
        policy.default_hop_fee = optional_amount(self.default_hop_fee.as_deref())?;
        policy.min_token_fee = optional_amount(self.min_token_fee.as_deref())?.unwrap_or_default();
        policy.token_fee_cap = optional_amount(self.token_fee_cap.as_deref())?.unwrap_or_default();
        Ok(policy)
    }
}

/// One scenario step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Owner issues new supply.
    Mint { to: String, value: String },
    /// Local-to-local ledger transfer.
    Transfer {
        from: String,
        to: String,
        value: String,
        #[serde(default)]
        data: Option<String>,
    },
    /// Ledger transfer to any network address.
    HubTransfer {
        from: String,
        to: String,
        value: String,
        #[serde(default)]
        data: Option<String>,
    },
    /// Cross-chain transfer, paying `fee` to the transport.
    CrossTransfer {
        from: String,
        to: String,
        value: String,
        #[serde(default)]
        fee: Option<String>,
        #[serde(default)]
        data: Option<String>,
    },
    /// A message delivered by the transport from `origin`.
    Inbound {
        origin: String,
        #[serde(default)]
        protocols: Option<Vec<String>>,
        message: InboundMessage,
    },
    /// The oldest pending outbound call reached its spoke.
    Deliver,
    /// The oldest pending outbound call failed; its rollback comes back.
    Rollback,
    /// Owner changes a network's mint limit.
    SetLimit { nid: String, limit: String },
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::Mint { .. } => "mint",
            Step::Transfer { .. } => "transfer",
            Step::HubTransfer { .. } => "hub_transfer",
            Step::CrossTransfer { .. } => "cross_transfer",
            Step::Inbound { .. } => "inbound",
            Step::Deliver => "deliver",
            Step::Rollback => "rollback",
            Step::SetLimit { .. } => "set_limit",
        }
    }
}

/// A message body in scenario syntax.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum InboundMessage {
    CrossTransfer {
        from: String,
        #[serde(default)]
        to: String,
        value: String,
        #[serde(default)]
        data: String,
    },
    CrossTransferRevert {
        to: String,
        value: String,
    },
    Transfer {
        to: String,
        value: String,
        #[serde(default)]
        data: String,
    },
    HubTransfer {
        to: String,
        value: String,
        #[serde(default)]
        data: String,
    },
}

impl InboundMessage {
    pub fn to_message(&self) -> Result<Message> {
        Ok(match self {
            InboundMessage::CrossTransfer {
                from,
                to,
                value,
                data,
            } => Message::CrossTransfer {
                from: from.clone(),
                to: to.clone(),
                value: amount(value)?,
                data: data.as_bytes().to_vec(),
            },
            InboundMessage::CrossTransferRevert { to, value } => Message::CrossTransferRevert {
                to: to.clone(),
                value: amount(value)?,
            },
            InboundMessage::Transfer { to, value, data } => Message::Transfer {
                to: to.clone(),
                value: amount(value)?,
                data: data.as_bytes().to_vec(),
            },
            InboundMessage::HubTransfer { to, value, data } => Message::HubTransfer {
                to: to.clone(),
                value: amount(value)?,
                data: data.as_bytes().to_vec(),
            },
        })
    }
}

/// Parses a scenario amount string.
pub fn amount(s: &str) -> Result<Amount> {
    parse_amount(s).with_context(|| format!("invalid amount {s:?}"))
}

fn optional_amount(s: Option<&str>) -> Result<Option<Amount>> {
    s.map(amount).transpose()
}
