//! # Balance Ledger
//!
//! The state and primitive operations shared by both roles: token metadata,
//! the administrator, the transport account, total supply, the balance map
//! and per-network protocol configurations.
//!
//! Balances are keyed by [`NetworkAddress`]. An address on the ledger's own
//! network is a local account; anything else is a hub-held balance of a
//! remote user. Local-only movements emit `Transfer`; anything touching a
//! remote address emits `HubTransfer`, plus a mint or burn marker for the
//! local side so that local indexers still see supply move.
//!
//! Nothing in here is atomic on its own. Entry points on
//! [`SpokeToken`](crate::spoke_token::SpokeToken) and
//! [`HubToken`](crate::hub_token::HubToken) wrap every call in
//! [`execute`](crate::journal::execute).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use xtoken_protocol::config::{
    ADDRESS_SEPARATOR, BURN_MARKER, DEFAULT_DECIMALS, MINT_MARKER, MISSING_DATA_PLACEHOLDER,
    ZERO_ACCOUNT,
};
use xtoken_protocol::{Amount, NetworkAddress, ProtocolConfig};

use crate::error::{TokenError, TokenResult};
use crate::events::TokenEvent;
use crate::host::Host;
use crate::journal::Journal;
use crate::storage::NetworkAddressMap;
use crate::verifier::verify_protocols;

// ---------------------------------------------------------------------------
// Deployment configuration
// ---------------------------------------------------------------------------

/// Everything needed to deploy a ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// Network id this ledger runs on.
    pub native_nid: String,
    /// Network id the token originated on.
    pub token_native_nid: String,
    /// Local account of the cross-chain messaging service.
    pub transport: String,
    /// Local administrator account.
    pub owner: String,
}

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

impl TokenConfig {
    fn validate(&self) -> TokenResult<()> {
        let required = [
            ("name", &self.name),
            ("symbol", &self.symbol),
            ("native_nid", &self.native_nid),
            ("token_native_nid", &self.token_native_nid),
            ("transport", &self.transport),
            ("owner", &self.owner),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(TokenError::InvalidArgument(format!("{field} cannot be empty")));
            }
        }
        for (field, nid) in [("native_nid", &self.native_nid), ("token_native_nid", &self.token_native_nid)] {
            if nid.contains(ADDRESS_SEPARATOR) {
                return Err(TokenError::InvalidArgument(format!(
                    "{field} cannot contain '{ADDRESS_SEPARATOR}'"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ledger state
// ---------------------------------------------------------------------------

/// Ledger state. Cloned as the snapshot for atomic calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    name: String,
    symbol: String,
    decimals: u8,
    native_nid: String,
    token_native_nid: String,
    transport: String,
    owner: String,
    total_supply: Amount,
    balances: NetworkAddressMap<Amount>,
    protocols: BTreeMap<String, ProtocolConfig>,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new(config: TokenConfig) -> TokenResult<Self> {
        Self::with_legacy_balances(config, Vec::new())
    }

    /// Creates a ledger whose legacy key space already holds balances
    /// recorded under bare local accounts. Total supply starts at their sum.
    pub fn with_legacy_balances(
        config: TokenConfig,
        legacy: impl IntoIterator<Item = (String, Amount)>,
    ) -> TokenResult<Self> {
        config.validate()?;

        let legacy: Vec<(String, Amount)> = legacy.into_iter().collect();
        let mut total_supply = Amount::zero();
        for (_, balance) in &legacy {
            total_supply = total_supply
                .checked_add(*balance)
                .ok_or(TokenError::Overflow)?;
        }

        Ok(Self {
            balances: NetworkAddressMap::with_legacy(config.native_nid.clone(), legacy),
            name: config.name,
            symbol: config.symbol,
            decimals: config.decimals,
            native_nid: config.native_nid,
            token_native_nid: config.token_native_nid,
            transport: config.transport,
            owner: config.owner,
            total_supply,
            protocols: BTreeMap::new(),
        })
    }

    // -- reads --------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Sum of every balance on this ledger, local and hub-held.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// The network this ledger runs on.
    pub fn nid(&self) -> &str {
        &self.native_nid
    }

    /// The network the token originated on.
    pub fn token_native_nid(&self) -> &str {
        &self.token_native_nid
    }

    /// Local account of the messaging service.
    pub fn transport(&self) -> &str {
        &self.transport
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Protocol configuration for `nid`, if any.
    pub fn protocols(&self, nid: &str) -> Option<&ProtocolConfig> {
        self.protocols.get(nid)
    }

    /// Balance of a local account.
    pub fn balance_of(&self, account: &str) -> Amount {
        self.balance(&NetworkAddress::new(self.native_nid.clone(), account))
    }

    /// Balance of any network address.
    pub fn x_balance_of(&self, address: &str) -> TokenResult<Amount> {
        let address = NetworkAddress::parse(address)?;
        Ok(self.balance(&address))
    }

    /// Every non-empty balance, local and hub-held.
    pub fn balances(&self) -> Vec<(NetworkAddress, Amount)> {
        self.balances
            .effective_entries()
            .into_iter()
            .filter(|(_, balance)| !balance.is_zero())
            .collect()
    }

    pub(crate) fn balance(&self, address: &NetworkAddress) -> Amount {
        self.balances.get_or(address, Amount::zero())
    }

    // -- address helpers ----------------------------------------------------

    pub(crate) fn is_native(&self, address: &NetworkAddress) -> bool {
        address.is_on(&self.native_nid)
    }

    /// A local account as a network address.
    pub(crate) fn local(&self, account: &str) -> TokenResult<NetworkAddress> {
        if account.is_empty() || account.contains(ADDRESS_SEPARATOR) {
            return Err(TokenError::MalformedAddress(account.to_string()));
        }
        Ok(NetworkAddress::new(self.native_nid.clone(), account))
    }

    /// A network address, or a bare account taken as local.
    pub(crate) fn resolve(&self, address: &str) -> TokenResult<NetworkAddress> {
        Ok(NetworkAddress::parse_or_local(address, &self.native_nid)?)
    }

    /// Network address of the transport on this ledger's network; the origin
    /// of every rollback delivery.
    pub(crate) fn transport_address(&self) -> NetworkAddress {
        NetworkAddress::new(self.native_nid.clone(), self.transport.clone())
    }

    // -- guards -------------------------------------------------------------

    pub(crate) fn only_owner(&self, caller: &str) -> TokenResult<()> {
        if caller != self.owner {
            return Err(TokenError::Unauthorized(format!(
                "{caller} is not the administrator"
            )));
        }
        Ok(())
    }

    pub(crate) fn only_transport(&self, caller: &str) -> TokenResult<()> {
        if caller != self.transport {
            return Err(TokenError::Unauthorized(format!(
                "{caller} is not the transport"
            )));
        }
        Ok(())
    }

    pub(crate) fn verify_inbound(&self, from: &str, proof: Option<&[String]>) -> TokenResult<()> {
        verify_protocols(&self.native_nid, &self.protocols, from, proof)
    }

    // -- mutations ----------------------------------------------------------

    /// Moves `value` from `from` to `to`, emitting the matching events and
    /// invoking the receiver callback when `to` is a local contract.
    pub(crate) fn transfer(
        &mut self,
        journal: &mut Journal,
        host: &mut dyn Host,
        from: &NetworkAddress,
        to: &NetworkAddress,
        value: Amount,
        data: Option<&[u8]>,
    ) -> TokenResult<()> {
        let from_balance = self.balance(from);
        if from_balance < value {
            return Err(TokenError::InsufficientBalance {
                balance: from_balance,
                amount: value,
            });
        }
        self.balances.set(from, from_balance - value);
        let to_balance = self
            .balance(to)
            .checked_add(value)
            .ok_or(TokenError::Overflow)?;
        self.balances.set(to, to_balance);

        let data = data.unwrap_or(MISSING_DATA_PLACEHOLDER).to_vec();
        let from_native = self.is_native(from);
        let to_native = self.is_native(to);

        if from_native && to_native {
            journal.emit(TokenEvent::Transfer {
                from: from.account().to_string(),
                to: to.account().to_string(),
                value,
                data: data.clone(),
            });
        } else {
            if to_native {
                journal.emit(mint_marker(to.account(), value));
            } else if from_native {
                journal.emit(burn_marker(from.account(), value));
            }
            journal.emit(TokenEvent::HubTransfer {
                from: from.to_string(),
                to: to.to_string(),
                value,
                data: data.clone(),
            });
        }
        debug!(%from, %to, %value, "transfer");

        if !to_native || !host.is_contract(to.account()) {
            return Ok(());
        }

        let delivered = if from_native {
            host.token_fallback(to.account(), from.account(), value, &data)
        } else {
            host.x_token_fallback(to.account(), &from.to_string(), value, &data)
        };
        delivered.map_err(|reason| TokenError::ReceiverRejected {
            contract: to.account().to_string(),
            reason,
        })
    }

    /// Ledger transfer with an explicit sender, reached only from verified
    /// inbound messages.
    pub(crate) fn x_hub_transfer(
        &mut self,
        journal: &mut Journal,
        host: &mut dyn Host,
        from: &str,
        to: &str,
        value: Amount,
        data: &[u8],
    ) -> TokenResult<()> {
        let from = NetworkAddress::parse(from)?;
        let to = NetworkAddress::parse(to)?;
        self.transfer(journal, host, &from, &to, value, Some(data))
    }

    /// Creates `amount` for `to` and emits the mint marker.
    pub(crate) fn mint(
        &mut self,
        journal: &mut Journal,
        to: &NetworkAddress,
        amount: Amount,
    ) -> TokenResult<()> {
        self.mint_silent(to, amount)?;
        if self.is_native(to) {
            journal.emit(mint_marker(to.account(), amount));
        } else {
            journal.emit(TokenEvent::HubTransfer {
                from: ZERO_ACCOUNT.to_string(),
                to: to.to_string(),
                value: amount,
                data: MINT_MARKER.to_vec(),
            });
        }
        Ok(())
    }

    /// Destroys `amount` of `from`'s balance and emits the burn marker.
    pub(crate) fn burn(
        &mut self,
        journal: &mut Journal,
        from: &NetworkAddress,
        amount: Amount,
    ) -> TokenResult<()> {
        self.burn_silent(from, amount)?;
        if self.is_native(from) {
            journal.emit(burn_marker(from.account(), amount));
        } else {
            journal.emit(TokenEvent::HubTransfer {
                from: from.to_string(),
                to: ZERO_ACCOUNT.to_string(),
                value: amount,
                data: BURN_MARKER.to_vec(),
            });
        }
        Ok(())
    }

    pub(crate) fn mint_silent(&mut self, to: &NetworkAddress, amount: Amount) -> TokenResult<()> {
        reject_zero_account(to)?;
        let total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let balance = self
            .balance(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.total_supply = total_supply;
        self.balances.set(to, balance);
        debug!(%to, %amount, "mint");
        Ok(())
    }

    pub(crate) fn burn_silent(&mut self, from: &NetworkAddress, amount: Amount) -> TokenResult<()> {
        reject_zero_account(from)?;
        let balance = self.balance(from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance { balance, amount });
        }
        self.balances.set(from, balance - amount);
        self.total_supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or(TokenError::Overflow)?;
        debug!(%from, %amount, "burn");
        Ok(())
    }

    // -- administration -----------------------------------------------------

    pub(crate) fn configure_protocols(
        &mut self,
        caller: &str,
        nid: &str,
        sources: Vec<String>,
        destinations: Vec<String>,
    ) -> TokenResult<()> {
        self.only_owner(caller)?;
        if nid.is_empty() || nid.contains(ADDRESS_SEPARATOR) {
            return Err(TokenError::InvalidArgument(format!("invalid network id: {nid:?}")));
        }
        info!(nid, ?sources, ?destinations, "protocols configured");
        self.protocols
            .insert(nid.to_string(), ProtocolConfig::new(sources, destinations));
        Ok(())
    }

    pub(crate) fn migrate_legacy(&mut self, caller: &str) -> TokenResult<usize> {
        self.only_owner(caller)?;
        let moved = self.balances.migrate_legacy();
        info!(moved, "legacy balances migrated");
        Ok(moved)
    }
}

fn reject_zero_account(address: &NetworkAddress) -> TokenResult<()> {
    if address.account() == ZERO_ACCOUNT {
        return Err(TokenError::InvalidArgument(
            "the zero account cannot hold balance".into(),
        ));
    }
    Ok(())
}

fn mint_marker(account: &str, value: Amount) -> TokenEvent {
    TokenEvent::Transfer {
        from: ZERO_ACCOUNT.to_string(),
        to: account.to_string(),
        value,
        data: MINT_MARKER.to_vec(),
    }
}

fn burn_marker(account: &str, value: Amount) -> TokenEvent {
    TokenEvent::Transfer {
        from: account.to_string(),
        to: ZERO_ACCOUNT.to_string(),
        value,
        data: BURN_MARKER.to_vec(),
    }
}
