//! Subscriber redundancy group (SRG) interface.

use async_trait::async_trait;

/// Identifier of a redundancy group.
pub type GroupId = u32;

/// Decides which control-plane instance is Designated Forwarder for an
/// access circuit.
///
/// Implementations guarantee that exactly one member of a configured group
/// reports DF for a given circuit at any instant.
#[async_trait]
pub trait RedundancyManager: Send + Sync {
    async fn start(&self);

    async fn stop(&self);

    /// Whether this instance is DF for the circuit.
    fn is_df(&self, outer_vlan: u16, mac: &str, inner_vlan: u16) -> bool;

    /// Group owning an S-VLAN, for diagnostics.
    fn group_for_svlan(&self, outer_vlan: u16) -> Option<GroupId>;
}
