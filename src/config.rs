//! Configuration management for GenAuth

use crate::blockchain::DEFAULT_DIFFICULTY;
use crate::error::ChainError;
use crate::persistence::DEFAULT_CHAIN_FILE;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "genauth.toml";
const MAX_DIFFICULTY: usize = 64;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_chain_file")]
    pub chain_file: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    /// Validate linkage and proof-of-work of the stored chain at startup.
    #[serde(default)]
    pub verify_on_load: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            chain_file: default_chain_file(),
            difficulty: default_difficulty(),
            verify_on_load: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_chain_file() -> String {
    DEFAULT_CHAIN_FILE.to_string()
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Config {
    pub fn from_toml(contents: &str) -> Result<Self, ChainError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.ledger.chain_file.trim().is_empty() {
            return Err(ChainError::Config("ledger.chain_file must not be empty".into()));
        }
        if self.ledger.difficulty == 0 || self.ledger.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::Config(format!(
                "ledger.difficulty must be between 1 and {}, got {}",
                MAX_DIFFICULTY, self.ledger.difficulty
            )));
        }
        Ok(())
    }
}

/// Load configuration from `path`, falling back to defaults when the file is
/// absent. `PORT` overrides `api.port`.
pub fn load_config_from(path: &Path) -> Result<Config, ChainError> {
    let mut config = if path.exists() {
        Config::from_toml(&fs::read_to_string(path)?)?
    } else {
        Config::default()
    };

    if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
        config.api.port = port;
    }

    Ok(config)
}

/// Load configuration from `GENAUTH_CONFIG`, or `genauth.toml` in the working
/// directory.
pub fn load_config() -> Result<Config, ChainError> {
    let path = std::env::var("GENAUTH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    load_config_from(Path::new(&path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.ledger.chain_file, "genauth_chain.json");
        assert_eq!(config.ledger.difficulty, 4);
        assert!(!config.ledger.verify_on_load);
        assert_eq!(config.api.host, "0.0.0.0");
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
            [ledger]
            difficulty = 3
            verify_on_load = true
            "#,
        )
        .unwrap();
        assert_eq!(config.ledger.difficulty, 3);
        assert!(config.ledger.verify_on_load);
        assert_eq!(config.ledger.chain_file, "genauth_chain.json");
    }

    #[test]
    fn test_rejects_out_of_range_difficulty() {
        for bad in ["[ledger]\ndifficulty = 0", "[ledger]\ndifficulty = 65"] {
            assert!(matches!(Config::from_toml(bad), Err(ChainError::Config(_))));
        }
    }

    #[test]
    fn test_rejects_blank_chain_file() {
        assert!(matches!(
            Config::from_toml("[ledger]\nchain_file = \"  \""),
            Err(ChainError::Config(_))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Config::from_toml("[ledger\ndifficulty = "),
            Err(ChainError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.ledger.difficulty, 4);
    }
}
