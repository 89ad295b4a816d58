//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/bng/config.toml` (XDG user config, or `$BNG_CONFIG_DIR`)
//! 2. `./bng.toml` (project-local)
//! 3. An explicit file passed on the command line

use std::path::{Path, PathBuf};

use crate::{BngConfig, ConfigError, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "bng.toml";

/// Default config filename within the XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "bng";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "BNG_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: BngConfig,
    /// Sources that were checked, in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
    /// Warnings generated while loading optional layers.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Get paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration by discovering and merging all config layers.
///
/// Discovered layers (user, project) that fail to parse produce a warning
/// and are skipped. The `explicit` file must exist and parse; any failure
/// there is returned. The merged result is validated.
pub fn load_config(project_dir: Option<&Path>, explicit: Option<&Path>) -> Result<LoadedConfig> {
    let mut config = BngConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    if let Some(path) = xdg_config_path() {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    if let Some(path) = explicit {
        config.merge(load_config_file(path)?);
        sources.push(ConfigSource {
            path: path.to_path_buf(),
            loaded: true,
        });
    }

    config.validate()?;

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<BngConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    BngConfig::from_toml(&contents)
}

/// Save configuration to a file.
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &BngConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Path of the user config file.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// User config directory.
///
/// Checks `BNG_CONFIG_DIR` first, then falls back to the platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Try to load a config file and merge it into the existing config.
fn load_layer(config: &mut BngConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_xdg_config_path_shape() {
        if let Some(p) = xdg_config_path() {
            assert!(p.ends_with("config.toml"));
        }
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[subscriber]\ntopic = \"t1\"\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.subscriber().topic, "t1");
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config_file(Path::new("/nonexistent/bng.toml"));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_project_layer_then_explicit_layer() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("bng.toml"),
            "[subscriber]\ntopic = \"project\"\n\n[qos]\ninput_class = \"a\"\noutput_class = \"b\"\n",
        )
        .unwrap();
        let explicit = dir.path().join("override.toml");
        fs::write(&explicit, "[subscriber]\ntopic = \"explicit\"\n").unwrap();

        let loaded = load_config(Some(dir.path()), Some(&explicit)).unwrap();
        assert_eq!(loaded.config.subscriber().topic, "explicit");
        assert_eq!(loaded.config.qos().input_class, "a");
        assert!(loaded.loaded_from().contains(&explicit.as_path()));
    }

    #[test]
    fn test_broken_project_layer_is_a_warning() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bng.toml"), "this is = = not toml").unwrap();

        let loaded = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
    }

    #[test]
    fn test_invalid_explicit_layer_is_an_error() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("bad.toml");
        fs::write(&explicit, "[subscriber]\nscan_page_size = 0\n").unwrap();

        let result = load_config(Some(dir.path()), Some(&explicit));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("bng.toml");

        save_config(&BngConfig::with_defaults(), &path).unwrap();
        let config = load_config_file(&path).unwrap();
        assert!(config.subscriber.is_some());
    }
}
