//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [subscriber]             # lifecycle topic, scan paging
//! [qos]                    # classes applied on activation
//! [cache]                  # in-memory cache housekeeping
//! [srg]                    # static redundancy groups
//! [dataplane]              # interface name → index table
//! [logging]                # console and file outputs
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use bng_types::GroupId;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default values shared with the components that consume them.
pub mod defaults {
    /// Topic carrying session lifecycle events.
    pub const LIFECYCLE_TOPIC: &str = "bng.session.lifecycle";
    /// Keys requested per scan round trip.
    pub const SCAN_PAGE_SIZE: usize = 100;
    /// QoS class attached to subscriber ingress.
    pub const QOS_INPUT_CLASS: &str = "subscriber-default-in";
    /// QoS class attached to subscriber egress.
    pub const QOS_OUTPUT_CLASS: &str = "subscriber-default-out";
    /// Seconds between sweeps of expired cache keys.
    pub const CACHE_CLEANUP_INTERVAL_SECS: u64 = 60;
}

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BngConfig {
    pub subscriber: Option<SubscriberSection>,
    pub qos: Option<QosSection>,
    pub cache: Option<CacheSection>,
    pub srg: Option<SrgSection>,
    pub dataplane: Option<DataplaneSection>,
    pub logging: Option<LoggingSection>,
}

impl BngConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Config with every section populated with its defaults.
    pub fn with_defaults() -> Self {
        Self {
            subscriber: Some(SubscriberSection::default()),
            qos: Some(QosSection::default()),
            cache: Some(CacheSection::default()),
            srg: Some(SrgSection::default()),
            dataplane: Some(DataplaneSection::default()),
            logging: Some(LoggingSection::default()),
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced wholesale, not merged field by field.
    pub fn merge(&mut self, other: BngConfig) {
        if other.subscriber.is_some() {
            self.subscriber = other.subscriber;
        }

        if other.qos.is_some() {
            self.qos = other.qos;
        }

        if other.cache.is_some() {
            self.cache = other.cache;
        }

        if other.srg.is_some() {
            self.srg = other.srg;
        }

        if other.dataplane.is_some() {
            self.dataplane = other.dataplane;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let subscriber = self.subscriber();
        if subscriber.topic.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "subscriber.topic".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if subscriber.scan_page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "subscriber.scan_page_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        if let Some(ref srg) = self.srg {
            srg.validate()?;
        }

        if let Some(ref dataplane) = self.dataplane {
            for (name, index) in &dataplane.interfaces {
                if *index == 0 {
                    return Err(ConfigError::Invalid {
                        field: format!("dataplane.interfaces.{name}"),
                        reason: "interface index 0 is reserved".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn subscriber(&self) -> SubscriberSection {
        self.subscriber.clone().unwrap_or_default()
    }

    pub fn qos(&self) -> QosSection {
        self.qos.clone().unwrap_or_default()
    }

    pub fn cache(&self) -> CacheSection {
        self.cache.clone().unwrap_or_default()
    }

    pub fn srg(&self) -> SrgSection {
        self.srg.clone().unwrap_or_default()
    }

    pub fn dataplane(&self) -> DataplaneSection {
        self.dataplane.clone().unwrap_or_default()
    }

    pub fn logging(&self) -> LoggingSection {
        self.logging.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriber engine
// ─────────────────────────────────────────────────────────────────────────────

/// Subscriber engine configuration.
///
/// ```toml
/// [subscriber]
/// topic = "bng.session.lifecycle"
/// scan_page_size = 100
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriberSection {
    /// Event bus topic carrying lifecycle events.
    pub topic: String,
    /// Keys requested per cache scan round trip.
    pub scan_page_size: usize,
}

impl Default for SubscriberSection {
    fn default() -> Self {
        Self {
            topic: defaults::LIFECYCLE_TOPIC.to_string(),
            scan_page_size: defaults::SCAN_PAGE_SIZE,
        }
    }
}

/// QoS classes applied when a session becomes active.
///
/// ```toml
/// [qos]
/// input_class = "subscriber-default-in"
/// output_class = "subscriber-default-out"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QosSection {
    pub input_class: String,
    pub output_class: String,
}

impl Default for QosSection {
    fn default() -> Self {
        Self {
            input_class: defaults::QOS_INPUT_CLASS.to_string(),
            output_class: defaults::QOS_OUTPUT_CLASS.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Collaborators
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory cache housekeeping.
///
/// ```toml
/// [cache]
/// enable_cleanup_task = true
/// cleanup_interval_secs = 60
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Sweep expired keys in the background instead of only on access.
    pub enable_cleanup_task: bool,
    /// Interval in seconds between sweeps.
    pub cleanup_interval_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enable_cleanup_task: true,
            cleanup_interval_secs: defaults::CACHE_CLEANUP_INTERVAL_SECS,
        }
    }
}

impl CacheSection {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

/// Role of this instance within a redundancy group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SrgRole {
    /// This instance is Designated Forwarder for the group.
    #[default]
    Active,
    /// Another member forwards; this instance only keeps state warm.
    Standby,
}

/// A subscriber redundancy group.
///
/// ```toml
/// [[srg.groups]]
/// id = 1
/// svlans = [100, 101]
/// role = "active"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrgGroupConfig {
    pub id: GroupId,
    pub svlans: Vec<u16>,
    #[serde(default)]
    pub role: SrgRole,
}

/// Static redundancy configuration.
///
/// With `enabled = false` no redundancy collaborator is wired and every
/// session is handled as DF (single-node mode).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SrgSection {
    pub enabled: bool,
    pub groups: Vec<SrgGroupConfig>,
}

impl SrgSection {
    fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let mut svlans = HashSet::new();

        for group in &self.groups {
            if !ids.insert(group.id) {
                return Err(ConfigError::Invalid {
                    field: "srg.groups.id".to_string(),
                    reason: format!("group {} is defined twice", group.id),
                });
            }
            for svlan in &group.svlans {
                if *svlan == 0 || *svlan > 4094 {
                    return Err(ConfigError::Invalid {
                        field: format!("srg.groups[{}].svlans", group.id),
                        reason: format!("{svlan} is not a usable VLAN id"),
                    });
                }
                if !svlans.insert(*svlan) {
                    return Err(ConfigError::Invalid {
                        field: format!("srg.groups[{}].svlans", group.id),
                        reason: format!("S-VLAN {svlan} belongs to more than one group"),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Dataplane interface table.
///
/// ```toml
/// [dataplane.interfaces]
/// "eth1.100" = 12
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataplaneSection {
    pub interfaces: BTreeMap<String, u32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Logging outputs.
///
/// ```toml
/// [logging]
/// directory = "/var/log/bng"
/// console_filter = "bng=info,warn"
/// file_filter = "bng=debug,info"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Directory for the rolling JSON log. Defaults to `<config dir>/logs`.
    pub directory: Option<PathBuf>,
    /// Filter directive for console output.
    pub console_filter: Option<String>,
    /// Filter directive for the JSON file.
    pub file_filter: Option<String>,
}
