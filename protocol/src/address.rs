//! # Network Addresses
//!
//! A [`NetworkAddress`] names an account on a specific chain. Its canonical
//! string form is `"<net>/<account>"`, for example `"1.ETH/0x32"` or
//! `"0x1.icon/hxc0007b426f8880f9afbab72fd8c7817f0d3fd5c0"`.
//!
//! Only the first `/` separates the two halves; anything after it belongs to
//! the account. Local callers are allowed to omit the network entirely, in
//! which case [`NetworkAddress::parse_or_local`] places the account on the
//! native network.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::ADDRESS_SEPARATOR;
use crate::error::ProtocolError;

/// An account on a specific network.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkAddress {
    net: String,
    account: String,
}

impl NetworkAddress {
    /// Combines a known network id with an account.
    pub fn new(net: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            net: net.into(),
            account: account.into(),
        }
    }

    /// Strictly parses the canonical `<net>/<account>` form.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedAddress`] if the separator is missing
    /// or either half is empty.
    pub fn parse(s: &str) -> Result<Self, ProtocolError> {
        let (net, account) = s
            .split_once(ADDRESS_SEPARATOR)
            .ok_or_else(|| ProtocolError::MalformedAddress(s.to_string()))?;
        if net.is_empty() || account.is_empty() {
            return Err(ProtocolError::MalformedAddress(s.to_string()));
        }
        Ok(Self::new(net, account))
    }

    /// Parses `s`, treating a bare account (no separator) as an account on
    /// `native_nid`.
    pub fn parse_or_local(s: &str, native_nid: &str) -> Result<Self, ProtocolError> {
        if s.contains(ADDRESS_SEPARATOR) {
            return Self::parse(s);
        }
        if s.is_empty() {
            return Err(ProtocolError::MalformedAddress(s.to_string()));
        }
        Ok(Self::new(native_nid, s))
    }

    /// The network id half.
    pub fn net(&self) -> &str {
        &self.net
    }

    /// The account half.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Returns `true` if this address lives on the network `nid`.
    pub fn is_on(&self, nid: &str) -> bool {
        self.net == nid
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.net, ADDRESS_SEPARATOR, self.account)
    }
}

impl FromStr for NetworkAddress {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for NetworkAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NetworkAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
