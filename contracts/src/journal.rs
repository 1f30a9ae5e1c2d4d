//! Call atomicity.
//!
//! Every entry point runs through [`execute`]: the ledger state is
//! snapshotted, the operation collects its events and transport sends in a
//! [`Journal`], and only a successful operation publishes them. A failed
//! operation restores the snapshot and publishes nothing.

use tracing::warn;

use crate::error::TokenResult;
use crate::events::TokenEvent;
use crate::host::{Host, OutboundCall};

/// Side effects buffered until the call commits.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    pub(crate) events: Vec<TokenEvent>,
    pub(crate) outbound: Vec<OutboundCall>,
}

impl Journal {
    pub(crate) fn emit(&mut self, event: TokenEvent) {
        self.events.push(event);
    }

    pub(crate) fn send(&mut self, call: OutboundCall) {
        self.outbound.push(call);
    }
}

/// Runs `op` against `state` as one all-or-nothing call.
pub(crate) fn execute<S, T, F>(
    name: &str,
    state: &mut S,
    log: &mut Vec<TokenEvent>,
    host: &mut dyn Host,
    op: F,
) -> TokenResult<T>
where
    S: Clone,
    F: FnOnce(&mut S, &mut Journal, &mut dyn Host) -> TokenResult<T>,
{
    let snapshot = state.clone();
    let mut journal = Journal::default();

    match op(state, &mut journal, &mut *host) {
        Ok(value) => {
            log.extend(journal.events);
            for call in journal.outbound {
                host.send_call_message(call);
            }
            Ok(value)
        }
        Err(err) => {
            *state = snapshot;
            warn!(call = name, error = %err, "call rejected, state restored");
            Err(err)
        }
    }
}
