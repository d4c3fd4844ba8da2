//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a `FunnelConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("funnel.toml")).unwrap();
//! println!("Funnel: {}", config.name);
//! ```

mod parser;
mod validator;

pub use contracts::FunnelConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<FunnelConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<FunnelConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Serialize FunnelConfig to TOML string
    pub fn to_toml(config: &FunnelConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize FunnelConfig to JSON string
    pub fn to_json(config: &FunnelConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BucketType, OverflowPolicy};
    use std::io::Write;

    const ROTATING_TOML: &str = r#"
name = "access-log"

[buffer]
max_chunks = 1024
overflow = "drop_oldest"

[telemetry]
log_format = "json"
log_level = "debug"

[[buckets]]
name = "segment-0"
bucket_type = "file"
high_water_mark = 4096
[buckets.params]
path = "/var/log/app/segment-0.log"

[[buckets]]
name = "audit"
bucket_type = "log"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(ROTATING_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.name, "access-log");
        assert_eq!(config.buffer.max_chunks, Some(1024));
        assert_eq!(config.buffer.overflow, OverflowPolicy::DropOldest);
        assert_eq!(config.buckets.len(), 2);
        assert_eq!(config.buckets[0].bucket_type, BucketType::File);
        assert_eq!(config.buckets[1].high_water_mark, 16 * 1024);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(ROTATING_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let again = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config.name, again.name);
        assert_eq!(config.buckets.len(), again.buckets.len());
        assert_eq!(config.buckets[0].params, again.buckets[0].params);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(ROTATING_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let again = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config.telemetry.log_level, again.telemetry.log_level);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[[buckets]]
name = "seg"
bucket_type = "log"

[[buckets]]
name = "seg"
bucket_type = "log"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(ROTATING_TOML.as_bytes()).unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.name, "access-log");
    }

    #[test]
    fn test_load_from_path_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
