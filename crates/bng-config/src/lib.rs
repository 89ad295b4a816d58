//! Configuration system for the BNG subscriber control plane.
//!
//! Provides TOML-based configuration with:
//! - Subscriber engine settings (`[subscriber]`, `[qos]`)
//! - In-process collaborator settings (`[cache]`, `[srg]`, `[dataplane]`)
//! - Logging outputs (`[logging]`)
//! - Config file layering (XDG user config, project-local `bng.toml`,
//!   then an explicit file)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    load_config, load_config_file, save_config, xdg_config_dir, xdg_config_path, ConfigSource,
    LoadedConfig,
};
pub use error::{ConfigError, Result};
pub use types::*;
