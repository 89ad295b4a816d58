//! Startup composition of the subscriber engine and its collaborators.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use bng_cache::{CacheConfig, MemoryCache};
use bng_config::BngConfig;
use bng_runtime::{ExpiryScheduler, LocalEventBus, LoggingDataplane, StaticRedundancy};
use bng_subscriber::{SubscriberConfig, SubscriberManager};
use bng_types::{Dataplane, RedundancyManager};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A running single-node engine.
pub struct Engine {
    pub expiry: Arc<ExpiryScheduler>,
    pub manager: SubscriberManager,
    redundancy: Option<Arc<StaticRedundancy>>,
    cancel: CancellationToken,
    cleanup: Option<JoinHandle<()>>,
}

impl Engine {
    /// Build every collaborator from `config`, wire them into the manager
    /// and start it.
    pub async fn start(config: &BngConfig) -> Result<Self> {
        let cache_section = config.cache();
        let cache = MemoryCache::new(
            CacheConfig::new()
                .with_cleanup_task(cache_section.enable_cleanup_task)
                .with_cleanup_interval(cache_section.cleanup_interval()),
        );

        let dataplane = Arc::new(LoggingDataplane::from_config(&config.dataplane()));
        for name in config.dataplane().interfaces.keys() {
            match dataplane.interface_index(name).await {
                Ok(if_index) => info!(interface = %name, if_index, "Access interface"),
                Err(e) => warn!(interface = %name, error = %e, "Access interface unavailable"),
            }
        }

        let srg = config.srg();
        let redundancy = if srg.enabled {
            let table = Arc::new(StaticRedundancy::from_config(&srg));
            table.start().await;
            Some(table)
        } else {
            None
        };

        let bus = Arc::new(LocalEventBus::new());
        let expiry = Arc::new(ExpiryScheduler::new());
        let manager = SubscriberManager::new(
            SubscriberConfig::from_sections(&config.subscriber(), &config.qos()),
            Arc::new(cache.clone()),
            bus,
            expiry.clone(),
            redundancy
                .clone()
                .map(|r| r as Arc<dyn RedundancyManager>),
            dataplane,
        );
        manager
            .start()
            .await
            .context("failed to start subscriber manager")?;

        let cancel = CancellationToken::new();
        let cleanup = cache.spawn_cleanup_task(cancel.clone());

        Ok(Self {
            expiry,
            manager,
            redundancy,
            cancel,
            cleanup,
        })
    }

    pub fn topic(&self) -> &str {
        &self.manager.config().topic
    }

    /// Stop the manager, the redundancy table and the cache sweep.
    pub async fn shutdown(self) {
        self.manager.stop().await;
        if let Some(redundancy) = &self.redundancy {
            redundancy.stop().await;
        }
        self.cancel.cancel();
        if let Some(handle) = self.cleanup
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Cache cleanup task ended abnormally");
        }
        info!("Engine stopped");
    }
}
