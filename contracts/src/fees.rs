//! # Hop Fee Policies
//!
//! When the hub forwards value from one spoke to another it pays the
//! transport's relay fee on the user's behalf and recovers it by burning a
//! token fee from the forwarded amount. A [`FeePolicy`] decides both numbers
//! per destination network.
//!
//! A `None` hop fee means "do not forward": the value stays on the hub as a
//! hub-held balance of the destination address.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use xtoken_protocol::config::MAX_BPS;
use xtoken_protocol::Amount;

/// Decides whether and at what cost the hub forwards to a network.
pub trait FeePolicy: fmt::Debug + Send + Sync {
    /// Native-currency relay fee for forwarding to `net`, or `None` to keep
    /// the value on the hub.
    fn hop_fee(&self, net: &str) -> Option<Amount>;

    /// Token amount burned from a forwarded `value` to cover `fee`.
    fn token_fee(&self, net: &str, fee: Amount, value: Amount) -> Amount;
}

/// Never forwards. The default policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoHopFee;

impl FeePolicy for NoHopFee {
    fn hop_fee(&self, _net: &str) -> Option<Amount> {
        None
    }

    fn token_fee(&self, _net: &str, _fee: Amount, _value: Amount) -> Amount {
        Amount::zero()
    }
}

/// Fixed per-network relay fees with a basis-point token fee.
///
/// Token fee: `clamp(value * token_fee_bps / 10_000, min_token_fee, token_fee_cap)`,
/// where a zero cap means uncapped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticFeePolicy {
    /// Relay fee per destination network id.
    #[serde(default)]
    pub hop_fees: BTreeMap<String, Amount>,
    /// Relay fee for networks missing from `hop_fees`; `None` keeps their
    /// value on the hub.
    #[serde(default)]
    pub default_hop_fee: Option<Amount>,
    /// Proportional token fee in basis points (0-10000).
    #[serde(default)]
    pub token_fee_bps: u32,
    /// Minimum token fee.
    #[serde(default)]
    pub min_token_fee: Amount,
    /// Maximum token fee; zero means uncapped.
    #[serde(default)]
    pub token_fee_cap: Amount,
}

impl StaticFeePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the relay fee for one network.
    pub fn with_hop_fee(mut self, net: impl Into<String>, fee: Amount) -> Self {
        self.hop_fees.insert(net.into(), fee);
        self
    }

    /// Sets the proportional token fee, capped at 100%.
    pub fn with_token_fee_bps(mut self, bps: u32) -> Self {
        self.token_fee_bps = bps.min(MAX_BPS);
        self
    }

    pub fn with_min_token_fee(mut self, min: Amount) -> Self {
        self.min_token_fee = min;
        self
    }
}

impl FeePolicy for StaticFeePolicy {
    fn hop_fee(&self, net: &str) -> Option<Amount> {
        self.hop_fees.get(net).copied().or(self.default_hop_fee)
    }

    fn token_fee(&self, _net: &str, _fee: Amount, value: Amount) -> Amount {
        let bps = self.token_fee_bps.min(MAX_BPS);
        let raw = value.saturating_mul(Amount::from(bps)) / Amount::from(MAX_BPS);
        let clamped = raw.max(self.min_token_fee);
        if self.token_fee_cap.is_zero() {
            clamped
        } else {
            clamped.min(self.token_fee_cap)
        }
    }
}
