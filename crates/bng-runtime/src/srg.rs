//! Static subscriber redundancy groups.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bng_config::{SrgRole, SrgSection};
use bng_types::{GroupId, RedundancyManager};
use parking_lot::RwLock;
use tracing::{debug, info};

/// DF status read from a configured group table.
///
/// Each S-VLAN belongs to at most one group, and this instance holds a fixed
/// role in each group. Circuits on S-VLANs outside every group are DF.
/// Roles can be flipped at runtime with [`StaticRedundancy::set_role`] to
/// rehearse a switchover.
pub struct StaticRedundancy {
    svlans: HashMap<u16, GroupId>,
    roles: RwLock<HashMap<GroupId, SrgRole>>,
    running: AtomicBool,
}

impl StaticRedundancy {
    pub fn from_config(section: &SrgSection) -> Self {
        let mut svlans = HashMap::new();
        let mut roles = HashMap::new();
        for group in &section.groups {
            roles.insert(group.id, group.role);
            for svlan in &group.svlans {
                svlans.insert(*svlan, group.id);
            }
        }
        Self {
            svlans,
            roles: RwLock::new(roles),
            running: AtomicBool::new(false),
        }
    }

    /// Role held in `group`, if the group is configured.
    pub fn role(&self, group: GroupId) -> Option<SrgRole> {
        self.roles.read().get(&group).copied()
    }

    /// Change this instance's role in a configured group.
    ///
    /// Returns the previous role, or `None` if the group is unknown.
    pub fn set_role(&self, group: GroupId, role: SrgRole) -> Option<SrgRole> {
        let mut roles = self.roles.write();
        let slot = roles.get_mut(&group)?;
        let previous = std::mem::replace(slot, role);
        if previous != role {
            info!(group, ?previous, ?role, "Redundancy role changed");
        }
        Some(previous)
    }

    pub fn group_count(&self) -> usize {
        self.roles.read().len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

#[async_trait]
impl RedundancyManager for StaticRedundancy {
    async fn start(&self) {
        if !self.running.swap(true, Ordering::AcqRel) {
            info!(
                groups = self.group_count(),
                svlans = self.svlans.len(),
                "Redundancy table loaded"
            );
        }
    }

    async fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            info!("Redundancy table released");
        }
    }

    fn is_df(&self, outer_vlan: u16, mac: &str, inner_vlan: u16) -> bool {
        let Some(group) = self.group_for_svlan(outer_vlan) else {
            return true;
        };
        let df = matches!(self.role(group), Some(SrgRole::Active) | None);
        debug!(group, outer_vlan, inner_vlan, mac = %mac, df, "DF lookup");
        df
    }

    fn group_for_svlan(&self, outer_vlan: u16) -> Option<GroupId> {
        self.svlans.get(&outer_vlan).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bng_config::SrgGroupConfig;

    fn table() -> StaticRedundancy {
        StaticRedundancy::from_config(&SrgSection {
            enabled: true,
            groups: vec![
                SrgGroupConfig {
                    id: 1,
                    svlans: vec![100, 101],
                    role: SrgRole::Active,
                },
                SrgGroupConfig {
                    id: 2,
                    svlans: vec![200],
                    role: SrgRole::Standby,
                },
            ],
        })
    }

    #[test]
    fn test_active_group_is_df() {
        let srg = table();
        assert!(srg.is_df(100, "aa:bb:cc:dd:ee:ff", 0));
        assert!(srg.is_df(101, "aa:bb:cc:dd:ee:ff", 7));
        assert_eq!(srg.group_for_svlan(101), Some(1));
    }

    #[test]
    fn test_standby_group_is_not_df() {
        let srg = table();
        assert!(!srg.is_df(200, "aa:bb:cc:dd:ee:ff", 0));
        assert_eq!(srg.group_for_svlan(200), Some(2));
    }

    #[test]
    fn test_unknown_svlan_is_df() {
        let srg = table();
        assert!(srg.is_df(999, "aa:bb:cc:dd:ee:ff", 0));
        assert_eq!(srg.group_for_svlan(999), None);
    }

    #[test]
    fn test_set_role_flips_df() {
        let srg = table();
        assert_eq!(srg.set_role(2, SrgRole::Active), Some(SrgRole::Standby));
        assert!(srg.is_df(200, "aa:bb:cc:dd:ee:ff", 0));

        assert_eq!(srg.set_role(1, SrgRole::Standby), Some(SrgRole::Active));
        assert!(!srg.is_df(100, "aa:bb:cc:dd:ee:ff", 0));

        assert_eq!(srg.set_role(42, SrgRole::Active), None);
    }

    #[tokio::test]
    async fn test_start_stop() {
        let srg = table();
        assert!(!srg.is_running());
        srg.start().await;
        srg.start().await;
        assert!(srg.is_running());
        srg.stop().await;
        assert!(!srg.is_running());
        assert_eq!(srg.group_count(), 2);
    }
}
