//! Demo configuration
//!
//! Loaded from reduxift-breeds.toml, with environment overrides.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const CONFIG_FILE: &str = "reduxift-breeds.toml";
const HOME_CONFIG_FILE: &str = ".reduxift-breeds.toml";

const ENV_FETCH_DELAY: &str = "BREEDS_FETCH_DELAY_MS";
const ENV_DOG_COUNT: &str = "BREEDS_DOG_COUNT";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BreedsConfig {
    /// Simulated latency of every catalogue request
    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,

    /// How many dog pictures one random-dog request yields
    #[serde(default = "default_dog_count")]
    pub dog_count: usize,

    /// Used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Breeds the simulated catalogue knows about
    #[serde(default = "default_breeds")]
    pub breeds: Vec<String>,
}

fn default_fetch_delay_ms() -> u64 {
    300
}

fn default_dog_count() -> usize {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_breeds() -> Vec<String> {
    ["akita", "beagle", "corgi", "dalmatian", "husky"]
        .iter()
        .map(|breed| breed.to_string())
        .collect()
}

impl Default for BreedsConfig {
    fn default() -> Self {
        Self {
            fetch_delay_ms: default_fetch_delay_ms(),
            dog_count: default_dog_count(),
            log_level: default_log_level(),
            breeds: default_breeds(),
        }
    }
}

impl BreedsConfig {
    /// Load config from CWD first, then home directory, or use defaults.
    /// Environment variables (including a `.env` file) win over the file.
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("Loaded .env file from: {:?}", path),
            Err(_) => log::debug!(".env file not found, using process environment"),
        }

        let config = match load_config_file() {
            Some(content) => match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded breeds config from file");
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            None => {
                log::debug!("Using default breeds config");
                Self::default()
            }
        };

        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up by environment variable name.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(ENV_FETCH_DELAY) {
            match value.trim().parse() {
                Ok(delay) => self.fetch_delay_ms = delay,
                Err(e) => log::warn!("Ignoring {}={:?}: {}", ENV_FETCH_DELAY, value, e),
            }
        }

        if let Some(value) = lookup(ENV_DOG_COUNT) {
            match value.trim().parse() {
                Ok(count) => self.dog_count = count,
                Err(e) => log::warn!("Ignoring {}={:?}: {}", ENV_DOG_COUNT, value, e),
            }
        }

        self
    }

    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }
}

/// Config file content from CWD first, then `$HOME/.reduxift-breeds.toml`.
fn load_config_file() -> Option<String> {
    if let Ok(content) = std::fs::read_to_string(CONFIG_FILE) {
        log::debug!("Loaded config from {}", CONFIG_FILE);
        return Some(content);
    }

    if let Some(home_config) = home_config_path() {
        if let Ok(content) = std::fs::read_to_string(&home_config) {
            log::debug!("Loaded config from {}", home_config.display());
            return Some(content);
        }
    }

    None
}

fn home_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(HOME_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = BreedsConfig::default();
        assert_eq!(config.fetch_delay(), Duration::from_millis(300));
        assert_eq!(config.dog_count, 3);
        assert_eq!(config.log_level, "info");
        assert!(config.breeds.contains(&"corgi".to_string()));
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml = r#"
            dog_count = 5
            breeds = ["shiba"]
        "#;
        let config: BreedsConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.dog_count, 5);
        assert_eq!(config.breeds, vec!["shiba".to_string()]);
        // Other fields should use defaults
        assert_eq!(config.fetch_delay_ms, 300);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_env_overrides_file() {
        let config = BreedsConfig::default().with_overrides(|key| match key {
            "BREEDS_FETCH_DELAY_MS" => Some("25".to_string()),
            "BREEDS_DOG_COUNT" => Some(" 7 ".to_string()),
            _ => None,
        });
        assert_eq!(config.fetch_delay_ms, 25);
        assert_eq!(config.dog_count, 7);
    }

    #[test]
    fn test_invalid_override_is_ignored() {
        let config = BreedsConfig::default().with_overrides(|key| match key {
            "BREEDS_DOG_COUNT" => Some("many".to_string()),
            _ => None,
        });
        assert_eq!(config.dog_count, 3);
    }
}
