//! Inbound source verification.

use std::collections::BTreeMap;

use xtoken_protocol::{NetworkAddress, ProtocolConfig};

use crate::error::{TokenError, TokenResult};

/// Checks that an inbound message from `from` was carried by the transport
/// adapters configured for its network.
///
/// Deliveries originating on `native_nid` are rollbacks and skip the check.
/// A network with no sources configured accepts only deliveries with no
/// proof at all.
pub fn verify_protocols(
    native_nid: &str,
    configs: &BTreeMap<String, ProtocolConfig>,
    from: &str,
    proof: Option<&[String]>,
) -> TokenResult<()> {
    let from = NetworkAddress::parse(from)?;
    if from.is_on(native_nid) {
        return Ok(());
    }

    let cfg = configs
        .get(from.net())
        .ok_or_else(|| TokenError::UnconfiguredNetwork(from.net().to_string()))?;

    let proof = proof.unwrap_or(&[]);
    let accepted = if cfg.is_open() {
        proof.is_empty()
    } else {
        cfg.is_satisfied_by(proof)
    };

    if accepted {
        Ok(())
    } else {
        Err(TokenError::InvalidProtocol(from.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn configs() -> BTreeMap<String, ProtocolConfig> {
        let mut configs = BTreeMap::new();
        configs.insert(
            "1.ETH".to_string(),
            ProtocolConfig::new(strings(&["a", "b"]), strings(&["c", "d"])),
        );
        configs.insert("1.BSC".to_string(), ProtocolConfig::default());
        configs
    }

    #[test]
    fn rollback_origin_skips_check() {
        assert!(verify_protocols("1.ICON", &configs(), "1.ICON/cxcall", None).is_ok());
    }

    #[test]
    fn unknown_network_is_unconfigured() {
        let err = verify_protocols("1.ICON", &configs(), "1.SUI/0x1", None).unwrap_err();
        assert_eq!(err, TokenError::UnconfiguredNetwork("1.SUI".into()));
    }

    #[test]
    fn all_sources_must_be_present() {
        let cfgs = configs();
        let full = strings(&["b", "a", "z"]);
        let partial = strings(&["a"]);
        assert!(verify_protocols("1.ICON", &cfgs, "1.ETH/0x1", Some(&full)).is_ok());
        assert!(matches!(
            verify_protocols("1.ICON", &cfgs, "1.ETH/0x1", Some(&partial)),
            Err(TokenError::InvalidProtocol(_))
        ));
        assert!(matches!(
            verify_protocols("1.ICON", &cfgs, "1.ETH/0x1", None),
            Err(TokenError::InvalidProtocol(_))
        ));
    }

    #[test]
    fn open_network_rejects_any_proof() {
        let cfgs = configs();
        let proof = strings(&["a"]);
        assert!(verify_protocols("1.ICON", &cfgs, "1.BSC/0x2", None).is_ok());
        assert!(verify_protocols("1.ICON", &cfgs, "1.BSC/0x2", Some(&[])).is_ok());
        assert!(matches!(
            verify_protocols("1.ICON", &cfgs, "1.BSC/0x2", Some(&proof)),
            Err(TokenError::InvalidProtocol(_))
        ));
    }

    #[test]
    fn malformed_origin_is_rejected() {
        assert!(matches!(
            verify_protocols("1.ICON", &configs(), "no-separator", None),
            Err(TokenError::MalformedAddress(_))
        ));
    }
}
