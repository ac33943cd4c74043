//! envseal configuration
//!
//! Configuration file: ~/.config/envseal/config.toml
//!
//! ```toml
//! editor = "code --wait"
//!
//! [key]
//! file = "master.key"
//! env = "MASTER_KEY"
//!
//! [skeleton]
//! max_depth = 2
//! placeholder = "..."
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::paths::Paths;

/// Tool configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Editor command used by `envseal edit` (falls back to $VISUAL / $EDITOR)
    #[serde(default)]
    pub editor: Option<String>,

    /// Where master keys are looked up
    #[serde(default)]
    pub key: KeyConfig,

    /// How the plaintext skeleton header is rendered
    #[serde(default)]
    pub skeleton: SkeletonConfig,
}

/// Master key lookup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Key file name, looked up beside the secrets file and one level up
    #[serde(default = "default_key_file")]
    pub file: String,

    /// Environment variable holding the key; wins over key files
    #[serde(default = "default_key_env")]
    pub env: String,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            file: default_key_file(),
            env: default_key_env(),
        }
    }
}

fn default_key_file() -> String {
    "master.key".to_string()
}

fn default_key_env() -> String {
    "MASTER_KEY".to_string()
}

/// Skeleton header settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonConfig {
    /// Number of table levels kept before values collapse to the placeholder
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Text shown instead of every value
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            placeholder: default_placeholder(),
        }
    }
}

fn default_max_depth() -> usize {
    2
}

fn default_placeholder() -> String {
    "...".to_string()
}

impl Config {
    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Paths::new().config_file())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;

        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.key.file, "master.key");
        assert_eq!(config.key.env, "MASTER_KEY");
        assert_eq!(config.skeleton.max_depth, 2);
        assert_eq!(config.skeleton.placeholder, "...");
        assert!(config.editor.is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "editor = \"nano\"\n\n[key]\nenv = \"APP_KEY\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.editor.as_deref(), Some("nano"));
        assert_eq!(config.key.env, "APP_KEY");
        assert_eq!(config.key.file, "master.key");
        assert_eq!(config.skeleton, SkeletonConfig::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[skeleton\nmax_depth = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.skeleton.max_depth = 3;
        config.skeleton.placeholder = "<hidden>".to_string();
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
