//! Lease expiry coordinator interface.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Callback invoked when a session timer fires.
#[async_trait]
pub trait ExpiryHandler: Send + Sync {
    /// Called exactly once per armed timer, with the time it fired.
    async fn on_expired(&self, session_id: &str, fired_at: DateTime<Utc>);
}

/// Per-session absolute-time timers.
///
/// `set` and `remove` may be called before `start`; timers only fire while
/// the coordinator is running.
#[async_trait]
pub trait ExpiryCoordinator: Send + Sync {
    /// Start the scheduling loop, delivering fired timers to `handler`.
    async fn start(&self, handler: Arc<dyn ExpiryHandler>);

    /// Stop the scheduling loop and release the handler.
    async fn stop(&self);

    /// Arm, or replace, the timer for `session_id`.
    fn set(&self, session_id: &str, at: DateTime<Utc>);

    /// Cancel the timer for `session_id`, if any.
    fn remove(&self, session_id: &str);
}
