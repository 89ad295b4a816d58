//! Southbound dataplane interface.

use async_trait::async_trait;

/// Errors from the dataplane driver.
#[derive(Debug, thiserror::Error)]
pub enum DataplaneError {
    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("dataplane rejected request: {0}")]
    Rejected(String),
}

/// Programs forwarding policy for subscriber interfaces.
#[async_trait]
pub trait Dataplane: Send + Sync {
    /// Attach input/output QoS classes to an interface.
    async fn apply_qos(
        &self,
        if_index: u32,
        input_class: &str,
        output_class: &str,
    ) -> Result<(), DataplaneError>;

    /// Resolve an interface name to its index.
    async fn interface_index(&self, name: &str) -> Result<u32, DataplaneError>;
}
