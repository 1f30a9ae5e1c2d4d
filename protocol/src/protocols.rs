//! Transport routes per remote network.
//!
//! A [`ProtocolConfig`] lists which transport adapters ("sources") must
//! have carried an inbound message from a given network, and which adapters
//! ("destinations") outbound messages to that network should travel through.

use serde::{Deserialize, Serialize};

/// Authorized transport sources and destinations for one remote network.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Adapters that must all appear in an inbound message's proof.
    /// Empty means no verification: the message must carry no proof at all.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Adapters used to route outbound messages.
    #[serde(default)]
    pub destinations: Vec<String>,
}

impl ProtocolConfig {
    pub fn new(sources: Vec<String>, destinations: Vec<String>) -> Self {
        Self {
            sources,
            destinations,
        }
    }

    /// Returns `true` if inbound messages need no source proof.
    pub fn is_open(&self) -> bool {
        self.sources.is_empty()
    }

    /// Returns `true` if every configured source appears in `proof`.
    pub fn is_satisfied_by(&self, proof: &[String]) -> bool {
        self.sources.iter().all(|source| has_source(source, proof))
    }
}

/// Returns `true` if `source` is one of `proof`.
pub fn has_source(source: &str, proof: &[String]) -> bool {
    proof.iter().any(|p| p == source)
}
