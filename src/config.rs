/// Registry and driver configuration
///
/// Loaded from JSON. Every field has a default so an empty object
/// (`{}`) is a valid configuration.

use crate::error::{CalloutError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Configuration for a `CallOutRegistry` and its `HostDriver`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryConfig {
    /// Upper bound on live call-outs (None = unbounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_call_outs: Option<usize>,

    /// Driver tick cadence in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Publish lifecycle events on the event bus
    #[serde(default = "default_emit_events")]
    pub emit_events: bool,
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_emit_events() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_call_outs: None,
            tick_interval_ms: default_tick_interval_ms(),
            emit_events: default_emit_events(),
        }
    }
}

impl RegistryConfig {
    /// Parse and validate a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RegistryConfig = serde_json::from_str(json)?;
        config.validate()?;
        debug!("Parsed registry config: {:?}", config);
        Ok(config)
    }

    /// Load a configuration file
    ///
    /// # Errors
    /// - `CalloutError::IoError` if the file cannot be read
    /// - `CalloutError::JsonError` if it is not valid JSON
    /// - `CalloutError::ConfigError` if a value is out of range
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading registry config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            warn!("Validation failed: zero tick interval");
            return Err(CalloutError::ConfigError(
                "tick_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.max_call_outs == Some(0) {
            warn!("Validation failed: zero capacity");
            return Err(CalloutError::ConfigError(
                "max_call_outs must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Driver tick cadence as a `Duration`
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = RegistryConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.tick_interval_ms, 100);
        assert!(config.emit_events);
        assert!(config.max_call_outs.is_none());
    }

    #[test]
    fn test_parse_all_fields() {
        let json = r#"{"max_call_outs": 32, "tick_interval_ms": 250, "emit_events": false}"#;
        let config = RegistryConfig::from_json_str(json).unwrap();

        assert_eq!(config.max_call_outs, Some(32));
        assert_eq!(config.tick_interval(), std::time::Duration::from_millis(250));
        assert!(!config.emit_events);
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let result = RegistryConfig::from_json_str(r#"{"tick_interval_ms": 0}"#);
        assert!(matches!(result, Err(CalloutError::ConfigError(_))));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = RegistryConfig::from_json_str(r#"{"max_call_outs": 0}"#);
        assert!(matches!(result, Err(CalloutError::ConfigError(_))));
    }

    #[test]
    fn test_malformed_json() {
        let result = RegistryConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(CalloutError::JsonError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("callout-config-{}.json", uuid::Uuid::new_v4()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(br#"{"max_call_outs": 8}"#).unwrap();
        }

        let config = RegistryConfig::load(&path).unwrap();
        assert_eq!(config.max_call_outs, Some(8));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let result = RegistryConfig::load("/nonexistent/callout.json");
        assert!(matches!(result, Err(CalloutError::IoError(_))));
    }
}
