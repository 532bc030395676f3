use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use trellis_renderer::RootOptions;

pub const DEFAULT_CONFIG_NAME: &str = "trellis.config.json";

/// Trellis configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Options for every root the CLI creates
    #[serde(default)]
    pub root: RootOptions,

    /// Defaults for the shuffle benchmark
    #[serde(default)]
    pub shuffle: ShuffleConfig,

    /// Log filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShuffleConfig {
    pub items: usize,
    pub rounds: usize,
    pub seed: u64,
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            items: 1000,
            rounds: 20,
            seed: 0x5eed,
        }
    }
}

impl Config {
    /// Load config from an explicit file, or from the default file in a directory
    pub fn load(cwd: &str, path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else if path.is_some() {
            Err(anyhow::anyhow!(
                "Config file does not exist: {}",
                config_path.display()
            ))
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: RootOptions::default(),
            shuffle: ShuffleConfig::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "root": { "tickMs": 4, "chunkSize": 64, "background": false },
            "shuffle": { "items": 50 },
            "logLevel": "debug"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.root.scheduler.tick_ms, 4);
        assert_eq!(config.root.scheduler.chunk_size, 64);
        assert!(!config.root.background);
        assert_eq!(config.shuffle.items, 50);
        assert_eq!(config.shuffle.rounds, 20);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.root.background);
        assert_eq!(config.shuffle, ShuffleConfig::default());
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let missing = Path::new("/nonexistent/trellis.config.json");
        assert!(Config::load("/", Some(missing)).is_err());
        assert!(Config::load("/nonexistent", None).is_ok());
    }
}
