use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

/// Errors raised while loading the server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML document did not match [`ServerConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A field parsed but holds an unusable value.
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP service listens on.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// How often expired minute buckets are dropped. `None` keeps every bucket.
    #[serde(default)]
    pub sweep_interval_secs: Option<u64>,
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            sweep_interval_secs: None,
        }
    }
}

impl ServerConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Invalid("listen must not be empty".into()));
        }
        if self.sweep_interval_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "sweep_interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_fields_missing() {
        let config = ServerConfig::from_yaml("{}").expect("empty mapping is valid");
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert!(config.sweep_interval_secs.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
listen: "127.0.0.1:9000"
sweep_interval_secs: 30
"#;
        let config = ServerConfig::from_yaml(yaml).expect("valid config");
        assert_eq!(config.listen, "127.0.0.1:9000");
        assert_eq!(config.sweep_interval_secs, Some(30));
    }

    #[test]
    fn test_rejects_zero_sweep_interval() {
        let err = ServerConfig::from_yaml("sweep_interval_secs: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_empty_listen() {
        let err = ServerConfig::from_yaml("listen: \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unparseable_yaml() {
        let err = ServerConfig::from_yaml("sweep_interval_secs: soon").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen: \"127.0.0.1:7000\"").unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.listen, "127.0.0.1:7000");
    }

    #[test]
    fn test_load_missing_file() {
        let err = ServerConfig::load("/nonexistent/metric-sum.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
