use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub request_timeout: u64,
    #[serde(default)]
    pub bulk: BulkConfig,
}

/// Limits applied to bulk transaction payloads.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BulkConfig {
    /// Maximum number of operations allowed in one bulk request.
    #[serde(default = "default_payload_limit")]
    pub payload_limit: usize,
    /// When true, a caller presenting the override secret bypasses the limit.
    #[serde(default)]
    pub allow_override_limit: bool,
    /// Secret value expected in the override header.
    #[serde(default)]
    pub override_limit_secret: String,
}

fn default_payload_limit() -> usize {
    30
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            payload_limit: default_payload_limit(),
            allow_override_limit: false,
            override_limit_secret: String::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9758,
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
            log_file: "invgraph".to_string(),
            request_timeout: 30,
            bulk: BulkConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_bulk_limit() {
        let config = Config::default();
        assert_eq!(config.bulk.payload_limit, 30);
        assert!(!config.bulk.allow_override_limit);
    }

    #[test]
    fn load_round_trip() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.port = 9990;
        config.bulk.payload_limit = 5;
        config.bulk.allow_override_limit = true;
        config.bulk.override_limit_secret = "s3cret".to_string();
        config.save(&path).expect("failed to save config");

        let loaded = Config::load(&path).expect("failed to load config");
        assert_eq!(loaded.port, 9990);
        assert_eq!(loaded.bulk.payload_limit, 5);
        assert!(loaded.bulk.allow_override_limit);
        assert_eq!(loaded.bulk.override_limit_secret, "s3cret");
    }

    #[test]
    fn bulk_section_is_optional() {
        let config: Config = toml::from_str(
            r#"
            host = "0.0.0.0"
            port = 8080
            log_level = "debug"
            log_dir = "logs"
            log_file = "invgraph"
            request_timeout = 10
            "#,
        )
        .expect("failed to parse config");
        assert_eq!(config.bulk.payload_limit, 30);
    }
}
