//! # Dual-Keyed Balance Storage
//!
//! Balances used to be keyed by bare local account. They are now keyed by
//! canonical network address. [`NetworkAddressMap`] keeps both key spaces:
//!
//! - the **primary** map, keyed by `"<net>/<account>"`, receives every write;
//! - the **legacy** map, keyed by bare account, is only read, and only when
//!   the primary map has no entry, the address is on the native network,
//!   and the account is written in the legacy syntax (`hx…` / `cx…`).
//!
//! A legacy entry is shadowed the moment its address is written under the
//! primary key. Nothing is migrated implicitly; [`NetworkAddressMap::migrate_legacy`]
//! is the one explicit migration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use xtoken_protocol::config::is_legacy_account;
use xtoken_protocol::NetworkAddress;

/// A map keyed by [`NetworkAddress`] with a read-only legacy fallback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAddressMap<V> {
    native_nid: String,
    entries: BTreeMap<String, V>,
    legacy: BTreeMap<String, V>,
}

impl<V: Clone> NetworkAddressMap<V> {
    /// Creates an empty map for a ledger living on `native_nid`.
    pub fn new(native_nid: impl Into<String>) -> Self {
        Self {
            native_nid: native_nid.into(),
            entries: BTreeMap::new(),
            legacy: BTreeMap::new(),
        }
    }

    /// Creates a map whose legacy key space holds `legacy` entries.
    pub fn with_legacy(
        native_nid: impl Into<String>,
        legacy: impl IntoIterator<Item = (String, V)>,
    ) -> Self {
        let mut map = Self::new(native_nid);
        map.legacy.extend(legacy);
        map
    }

    /// Looks up `key`, falling back to the legacy key space on a miss.
    pub fn get(&self, key: &NetworkAddress) -> Option<&V> {
        if let Some(value) = self.entries.get(&key.to_string()) {
            return Some(value);
        }
        if key.is_on(&self.native_nid) && is_legacy_account(key.account()) {
            return self.legacy.get(key.account());
        }
        None
    }

    /// Looks up `key`, returning `default` when absent.
    pub fn get_or(&self, key: &NetworkAddress, default: V) -> V {
        self.get(key).cloned().unwrap_or(default)
    }

    /// Writes `value` under the primary key.
    pub fn set(&mut self, key: &NetworkAddress, value: V) {
        self.entries.insert(key.to_string(), value);
    }

    /// Moves every legacy entry that is not shadowed by a primary entry into
    /// the primary key space, then clears the legacy key space. Returns the
    /// number of entries moved.
    pub fn migrate_legacy(&mut self) -> usize {
        let mut moved = 0;
        for (account, value) in std::mem::take(&mut self.legacy) {
            let key = NetworkAddress::new(self.native_nid.clone(), account).to_string();
            if let std::collections::btree_map::Entry::Vacant(slot) = self.entries.entry(key) {
                slot.insert(value);
                moved += 1;
            }
        }
        moved
    }

    /// Number of entries still in the legacy key space.
    pub fn legacy_len(&self) -> usize {
        self.legacy.len()
    }

    /// Every effective entry: primary entries plus unshadowed legacy
    /// entries (reported under their native network address).
    pub fn effective_entries(&self) -> Vec<(NetworkAddress, V)> {
        let mut out: Vec<(NetworkAddress, V)> = self
            .entries
            .iter()
            .filter_map(|(key, value)| {
                NetworkAddress::parse(key)
                    .ok()
                    .map(|addr| (addr, value.clone()))
            })
            .collect();
        for (account, value) in &self.legacy {
            let addr = NetworkAddress::new(self.native_nid.clone(), account.clone());
            if !self.entries.contains_key(&addr.to_string()) {
                out.push((addr, value.clone()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICON: &str = "1.ICON";

    fn legacy_map() -> NetworkAddressMap<u64> {
        NetworkAddressMap::with_legacy(
            ICON,
            vec![("hxalice".to_string(), 100), ("plain".to_string(), 7)],
        )
    }

    #[test]
    fn legacy_read_only_for_native_legacy_accounts() {
        let map = legacy_map();
        assert_eq!(map.get(&NetworkAddress::new(ICON, "hxalice")), Some(&100));
        // Same account on another network never sees the legacy entry.
        assert_eq!(map.get(&NetworkAddress::new("1.ETH", "hxalice")), None);
        // Accounts outside the legacy syntax never fall back.
        assert_eq!(map.get(&NetworkAddress::new(ICON, "plain")), None);
    }

    #[test]
    fn primary_write_shadows_legacy() {
        let mut map = legacy_map();
        let alice = NetworkAddress::new(ICON, "hxalice");
        map.set(&alice, 40);
        assert_eq!(map.get(&alice), Some(&40));
        // The legacy entry itself is untouched.
        assert_eq!(map.legacy_len(), 2);
    }

    #[test]
    fn migration_skips_shadowed_entries() {
        let mut map = legacy_map();
        let alice = NetworkAddress::new(ICON, "hxalice");
        map.set(&alice, 40);

        let moved = map.migrate_legacy();
        assert_eq!(moved, 1);
        assert_eq!(map.legacy_len(), 0);
        assert_eq!(map.get(&alice), Some(&40));
        assert_eq!(map.get(&NetworkAddress::new(ICON, "plain")), Some(&7));
    }

    #[test]
    fn effective_entries_count_each_address_once() {
        let mut map = legacy_map();
        map.set(&NetworkAddress::new(ICON, "hxalice"), 40);
        map.set(&NetworkAddress::new("1.ETH", "0x32"), 5);

        let total: u64 = map.effective_entries().iter().map(|(_, v)| v).sum();
        assert_eq!(total, 40 + 7 + 5);
    }
}
