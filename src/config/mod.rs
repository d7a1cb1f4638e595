//! # Configuration Management Module
//!
//! TOML configuration for the `levelup` binary: where the progression store
//! lives, how logging is set up, and which seed data is written.
//!
//! ## Configuration Structure
//!
//! - [`StorageConfig`] - sled data directory and flush interval
//! - [`LoggingConfig`] - log level and optional log file
//! - [`ProgressionConfig`] - starter missions and starter bundle switches
//!
//! ## Usage
//!
//! ```rust,no_run
//! use levelup::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("levelup.toml").await?;
//!     let config = Config::load("levelup.toml").await?;
//!     println!("Data dir: {}", config.storage.data_dir);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [storage]
//! data_dir = "./data/levelup"
//! flush_every_ms = 500
//!
//! [logging]
//! level = "info"
//! file = "levelup.log"
//!
//! [progression]
//! seed_missions = true
//! grant_starter_bundle = true
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::progression::{ProgressionError, ProgressionStore, ProgressionStoreBuilder};

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace", "off"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub progression: ProgressionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    pub data_dir: String,
    /// sled background flush interval; unset keeps sled's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flush_every_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressionConfig {
    /// Seed the starter missions when the mission catalog is empty.
    #[serde(default = "default_true")]
    pub seed_missions: bool,
    /// Give newly registered players the starter bundle.
    #[serde(default = "default_true")]
    pub grant_starter_bundle: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            seed_missions: true,
            grant_starter_bundle: true,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        if self.storage.flush_every_ms == Some(0) {
            return Err(anyhow!("storage.flush_every_ms must be greater than zero"));
        }
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(anyhow!(
                "logging.level '{}' is not one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
        Ok(())
    }

    /// Open the progression store described by `[storage]` and `[progression]`.
    pub fn open_store(&self) -> std::result::Result<ProgressionStore, ProgressionError> {
        let mut builder = ProgressionStoreBuilder::new(&self.storage.data_dir)
            .flush_every_ms(self.storage.flush_every_ms);
        if !self.progression.seed_missions {
            builder = builder.without_mission_seed();
        }
        builder.open()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig {
                data_dir: "./data/levelup".to_string(),
                flush_every_ms: Some(500),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("levelup.log".to_string()),
            },
            progression: ProgressionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.data_dir, "./data/levelup");
        assert!(config.progression.seed_missions);
        assert!(config.progression.grant_starter_bundle);
    }

    #[test]
    fn test_progression_section_is_optional() {
        let raw = r#"
            [storage]
            data_dir = "/tmp/lv"

            [logging]
            level = "debug"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.progression, ProgressionConfig::default());
        assert_eq!(config.storage.flush_every_ms, None);
        assert_eq!(config.logging.file, None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage.data_dir = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage.flush_every_ms = Some(0);
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_create_default_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("levelup.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        let err = Config::load(path.to_str().unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_rejects_invalid_level() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(
            &path,
            "[storage]\ndata_dir = \"./x\"\n\n[logging]\nlevel = \"chatty\"\n",
        )
        .unwrap();
        let result = tokio_test::block_on(Config::load(path.to_str().unwrap()));
        assert!(result.is_err());
    }

    #[test]
    fn test_open_store_honors_seed_switch() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = dir.path().join("db").to_string_lossy().into_owned();
        config.progression.seed_missions = false;
        let store = config.open_store().unwrap();
        assert_eq!(store.count_missions(), 0);
    }
}
