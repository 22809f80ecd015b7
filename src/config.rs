use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_CACHE_CAPACITY, DEFAULT_INFLUX_DB, DEFAULT_INFLUX_HOST,
    DEFAULT_LOG_DIR, DEFAULT_LOOKUP_TIMEOUT_SECONDS, DEFAULT_LOOKUP_URL,
};
use crate::error::{ParserError, Result};
use crate::parser::ParseOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bucket holding the raw log files; handed to the log fetcher as-is
    pub cloudstorage_bucket: Option<String>,
    pub log_dir: String,
    pub influxdb: InfluxConfig,
    pub lookup: LookupConfig,
    pub parser: ParseOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    pub host: String,
    pub db: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub batch_size: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub url: String,
    pub timeout_seconds: u64,
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cloudstorage_bucket: None,
            log_dir: DEFAULT_LOG_DIR.to_string(),
            influxdb: InfluxConfig::default(),
            lookup: LookupConfig::default(),
            parser: ParseOptions::default(),
        }
    }
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_INFLUX_HOST.to_string(),
            db: DEFAULT_INFLUX_DB.to_string(),
            username: None,
            password: None,
            batch_size: DEFAULT_BATCH_SIZE,
            timeout_seconds: 30,
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LOOKUP_URL.to_string(),
            timeout_seconds: DEFAULT_LOOKUP_TIMEOUT_SECONDS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl Config {
    /// Loads the TOML file at `path` (defaults when it does not exist) and
    /// applies `RT_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                ParserError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
            })?;
            Self::from_toml_str(&content)?
        } else {
            info!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overrides settings from a key lookup, normally the process environment
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RT_INFLUX_HOST") {
            self.influxdb.host = v;
        }
        if let Some(v) = lookup("RT_INFLUX_DB") {
            self.influxdb.db = v;
        }
        if let Some(v) = lookup("RT_INFLUX_USERNAME") {
            self.influxdb.username = Some(v);
        }
        if let Some(v) = lookup("RT_INFLUX_PASSWORD") {
            self.influxdb.password = Some(v);
        }
        if let Some(v) = lookup("RT_LOOKUP_URL") {
            self.lookup.url = v;
        }
        if let Some(v) = lookup("RT_CLOUDSTORAGE_BUCKET") {
            self.cloudstorage_bucket = Some(v);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.influxdb.db.trim().is_empty() {
            return Err(ParserError::Config("influxdb.db must not be empty".to_string()));
        }
        if self.influxdb.batch_size == 0 {
            return Err(ParserError::Config("influxdb.batch_size must be at least 1".to_string()));
        }
        if !self.lookup.url.starts_with("https://") && !self.lookup.url.starts_with("http://") {
            return Err(ParserError::Config(format!(
                "lookup.url must be an http(s) URL, got '{}'",
                self.lookup.url
            )));
        }
        Ok(())
    }

    /// Copy safe to print: credentials are masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.influxdb.password.is_some() {
            copy.influxdb.password = Some("********".to_string());
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.influxdb.host, DEFAULT_INFLUX_HOST);
        assert_eq!(config.lookup.cache_capacity, 1000);
        assert_eq!(config.lookup.url, "https://rogerth.at/unauthenticated/service-app");
        assert!(!config.parser.count_received_messages);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml_str(
            r#"
            cloudstorage_bucket = "rogerthat-logs"

            [influxdb]
            host = "http://influx:8086"
            db = "stats"
            username = "writer"

            [parser]
            count_received_messages = true
            "#,
        )
        .unwrap();
        assert_eq!(config.cloudstorage_bucket.as_deref(), Some("rogerthat-logs"));
        assert_eq!(config.influxdb.db, "stats");
        assert_eq!(config.influxdb.username.as_deref(), Some("writer"));
        assert_eq!(config.influxdb.batch_size, DEFAULT_BATCH_SIZE);
        assert!(config.parser.count_received_messages);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("RT_INFLUX_HOST", "http://other:8086"),
            ("RT_INFLUX_PASSWORD", "secret"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.influxdb.host, "http://other:8086");
        assert_eq!(config.influxdb.password.as_deref(), Some("secret"));
        assert_eq!(config.redacted().influxdb.password.as_deref(), Some("********"));
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.influxdb.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.lookup.url = "rogerth.at".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(matches!(
            Config::from_toml_str("[influxdb\nhost ="),
            Err(ParserError::Toml(_))
        ));
    }
}
