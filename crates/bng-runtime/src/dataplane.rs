//! Logging dataplane driver.

use std::collections::HashMap;

use async_trait::async_trait;
use bng_config::DataplaneSection;
use bng_types::{Dataplane, DataplaneError};
use parking_lot::Mutex;
use tracing::{debug, info};

/// QoS classes applied to an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QosPolicy {
    pub input_class: String,
    pub output_class: String,
}

/// Dataplane that records QoS requests and logs them instead of programming
/// hardware.
#[derive(Debug, Default)]
pub struct LoggingDataplane {
    interfaces: HashMap<String, u32>,
    applied: Mutex<HashMap<u32, QosPolicy>>,
}

impl LoggingDataplane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(section: &DataplaneSection) -> Self {
        Self {
            interfaces: section
                .interfaces
                .iter()
                .map(|(name, index)| (name.clone(), *index))
                .collect(),
            applied: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_interface(mut self, name: impl Into<String>, if_index: u32) -> Self {
        self.interfaces.insert(name.into(), if_index);
        self
    }

    /// Last policy applied to an interface.
    pub fn policy_for(&self, if_index: u32) -> Option<QosPolicy> {
        self.applied.lock().get(&if_index).cloned()
    }

    /// Number of interfaces carrying a policy.
    pub fn applied_count(&self) -> usize {
        self.applied.lock().len()
    }
}

#[async_trait]
impl Dataplane for LoggingDataplane {
    async fn apply_qos(
        &self,
        if_index: u32,
        input_class: &str,
        output_class: &str,
    ) -> Result<(), DataplaneError> {
        if if_index == 0 {
            return Err(DataplaneError::Rejected(
                "interface index 0 is not a subscriber interface".to_string(),
            ));
        }

        info!(if_index, input_class, output_class, "QoS applied");
        self.applied.lock().insert(
            if_index,
            QosPolicy {
                input_class: input_class.to_string(),
                output_class: output_class.to_string(),
            },
        );
        Ok(())
    }

    async fn interface_index(&self, name: &str) -> Result<u32, DataplaneError> {
        let index = self
            .interfaces
            .get(name)
            .copied()
            .ok_or_else(|| DataplaneError::InterfaceNotFound(name.to_string()))?;
        debug!(interface = %name, if_index = index, "Interface resolved");
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_apply_qos_records_policy() {
        let dp = LoggingDataplane::new();
        dp.apply_qos(7, "in", "out").await.unwrap();
        dp.apply_qos(7, "in-2", "out-2").await.unwrap();

        assert_eq!(dp.applied_count(), 1);
        assert_eq!(
            dp.policy_for(7),
            Some(QosPolicy {
                input_class: "in-2".to_string(),
                output_class: "out-2".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_apply_qos_rejects_index_zero() {
        let dp = LoggingDataplane::new();
        let err = dp.apply_qos(0, "in", "out").await.unwrap_err();
        assert!(matches!(err, DataplaneError::Rejected(_)));
        assert_eq!(dp.applied_count(), 0);
    }

    #[tokio::test]
    async fn test_interface_index_from_config() {
        let mut interfaces = BTreeMap::new();
        interfaces.insert("access0".to_string(), 3);
        let dp = LoggingDataplane::from_config(&DataplaneSection { interfaces })
            .with_interface("access1", 4);

        assert_eq!(dp.interface_index("access0").await.unwrap(), 3);
        assert_eq!(dp.interface_index("access1").await.unwrap(), 4);
        assert!(matches!(
            dp.interface_index("missing").await,
            Err(DataplaneError::InterfaceNotFound(name)) if name == "missing"
        ));
    }
}
