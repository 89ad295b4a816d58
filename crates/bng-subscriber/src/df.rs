//! Designated Forwarder gate.

use std::sync::Arc;

use bng_types::{GroupId, RedundancyManager};
use serde::Serialize;

/// Result of a DF query for one access circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DfDecision {
    pub is_df: bool,
    /// Redundancy group owning the S-VLAN, if any.
    pub group: Option<GroupId>,
}

/// Asks the redundancy collaborator whether this instance owns a circuit.
///
/// Without a collaborator every circuit is DF (single-node mode).
#[derive(Clone, Default)]
pub struct DfGate {
    redundancy: Option<Arc<dyn RedundancyManager>>,
}

impl DfGate {
    pub fn new(redundancy: Option<Arc<dyn RedundancyManager>>) -> Self {
        Self { redundancy }
    }

    pub fn single_node() -> Self {
        Self::default()
    }

    pub fn is_configured(&self) -> bool {
        self.redundancy.is_some()
    }

    pub fn is_df(&self, outer_vlan: u16, mac: &str, inner_vlan: Option<u16>) -> bool {
        self.redundancy
            .as_ref()
            .is_none_or(|r| r.is_df(outer_vlan, mac, inner_vlan.unwrap_or(0)))
    }

    pub fn decision(&self, outer_vlan: u16, mac: &str, inner_vlan: Option<u16>) -> DfDecision {
        DfDecision {
            is_df: self.is_df(outer_vlan, mac, inner_vlan),
            group: self
                .redundancy
                .as_ref()
                .and_then(|r| r.group_for_svlan(outer_vlan)),
        }
    }
}
