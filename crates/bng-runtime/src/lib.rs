//! In-process collaborators for the BNG subscriber engine.
//!
//! Each type here implements one of the collaborator traits from
//! `bng-types` well enough to run a single control-plane node and to drive
//! integration tests:
//!
//! - [`LocalEventBus`]: topic fan-out to in-process handlers
//! - [`ExpiryScheduler`]: deadline-ordered lease timers on a tokio task
//! - [`StaticRedundancy`]: DF status from a configured group/role table
//! - [`LoggingDataplane`]: records and logs QoS programming requests
//!
//! None of them is a substitute for the production transport, timer
//! service, election protocol or dataplane driver.

mod bus;
mod dataplane;
mod expiry;
mod srg;

pub use bus::LocalEventBus;
pub use dataplane::{LoggingDataplane, QosPolicy};
pub use expiry::ExpiryScheduler;
pub use srg::StaticRedundancy;
