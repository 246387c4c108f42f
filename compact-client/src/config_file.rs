//! Declarative serialization settings from YAML, TOML, and environment variables.
//!
//! Files and the environment only carry scalar settings. Serializers are
//! registered on the returned [`SerializationConfigBuilder`] before it is built.
//!
//! # Supported Formats
//!
//! - **YAML** (requires `config-file` feature): `SerializationConfigBuilder::from_yaml("serialization.yaml")`
//! - **TOML** (requires `config-file` feature): `SerializationConfigBuilder::from_toml("serialization.toml")`
//! - **Environment Variables** (always available): `SerializationConfigBuilder::from_env()`
//!
//! # Example YAML
//!
//! ```yaml
//! schema:
//!   max-put-retry-count: 20
//! invocation-retry-pause-ms: 250
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SerializationConfig, SerializationConfigBuilder};

/// Environment variable overriding the schema put retry count.
pub const ENV_MAX_PUT_RETRY_COUNT: &str = "HZ_SCHEMA_MAX_PUT_RETRY_COUNT";
/// Environment variable overriding the retry pause, in milliseconds.
pub const ENV_RETRY_PAUSE_MS: &str = "HZ_INVOCATION_RETRY_PAUSE_MS";

/// Top-level file-based configuration.
///
/// Mirrors [`SerializationConfig`] with serde-friendly types. Converted into a
/// builder with [`From`], or straight into a configuration with [`TryFrom`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct FileConfig {
    /// Schema replication settings.
    pub schema: Option<FileSchemaConfig>,
    /// Pause between retry attempts in milliseconds (default: 1000).
    pub invocation_retry_pause_ms: Option<u64>,
}

/// File-based schema replication settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct FileSchemaConfig {
    /// Number of attempts to replicate a schema to every member (default: 100).
    pub max_put_retry_count: Option<u32>,
}

impl From<FileConfig> for SerializationConfigBuilder {
    fn from(file: FileConfig) -> Self {
        let mut builder = SerializationConfigBuilder::new();

        if let Some(count) = file.schema.and_then(|s| s.max_put_retry_count) {
            builder = builder.max_put_retry_count(count);
        }

        if let Some(pause_ms) = file.invocation_retry_pause_ms {
            builder = builder.retry_pause(Duration::from_millis(pause_ms));
        }

        builder
    }
}

impl TryFrom<FileConfig> for SerializationConfig {
    type Error = ConfigError;

    fn try_from(file: FileConfig) -> Result<Self, Self::Error> {
        SerializationConfigBuilder::from(file).build()
    }
}

impl SerializationConfigBuilder {
    /// Loads settings from a YAML file.
    ///
    /// Requires the `config-file` feature.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = SerializationConfigBuilder::from_yaml("serialization.yaml")?
    ///     .register_compact::<Employee>()
    ///     .build()?;
    /// ```
    #[cfg(feature = "config-file")]
    pub fn from_yaml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::new(format!("failed to read YAML config file: {e}"))
        })?;
        let file_config: FileConfig = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::new(format!("failed to parse YAML config: {e}"))
        })?;
        Ok(file_config.into())
    }

    /// Loads settings from a TOML file.
    ///
    /// Requires the `config-file` feature.
    #[cfg(feature = "config-file")]
    pub fn from_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::new(format!("failed to read TOML config file: {e}"))
        })?;
        let file_config: FileConfig = toml_crate::from_str(&content).map_err(|e| {
            ConfigError::new(format!("failed to parse TOML config: {e}"))
        })?;
        Ok(file_config.into())
    }

    /// Loads settings from environment variables.
    ///
    /// This method is always available (no feature flag required).
    ///
    /// # Supported Environment Variables
    ///
    /// | Variable | Maps to |
    /// |----------|---------|
    /// | `HZ_SCHEMA_MAX_PUT_RETRY_COUNT` | `max_put_retry_count` |
    /// | `HZ_INVOCATION_RETRY_PAUSE_MS` | `retry_pause` in milliseconds |
    ///
    /// A variable that is set but does not parse as a non-negative integer is
    /// a configuration error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut file_config = FileConfig::default();

        if let Some(count) = env_number::<u32>(ENV_MAX_PUT_RETRY_COUNT)? {
            file_config
                .schema
                .get_or_insert_with(Default::default)
                .max_put_retry_count = Some(count);
        }

        if let Some(ms) = env_number::<u64>(ENV_RETRY_PAUSE_MS)? {
            file_config.invocation_retry_pause_ms = Some(ms);
        }

        Ok(file_config.into())
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::new(format!("{name} must be a non-negative integer, got '{val}'"))),
        Err(_) => Ok(None),
    }
}

/// Loads a settings file, auto-detecting format by extension.
///
/// Supports `.yaml`, `.yml`, and `.toml` extensions.
/// Requires the `config-file` feature.
#[cfg(feature = "config-file")]
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> Result<SerializationConfigBuilder, ConfigError> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => SerializationConfigBuilder::from_yaml(path),
        Some("toml") => SerializationConfigBuilder::from_toml(path),
        Some(ext) => Err(ConfigError::new(format!(
            "unsupported config file extension: .{ext} (expected .yaml, .yml, or .toml)"
        ))),
        None => Err(ConfigError::new(
            "config file has no extension; expected .yaml, .yml, or .toml",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_config_defaults_produce_valid_config() {
        let config: SerializationConfig = FileConfig::default().try_into().unwrap();
        assert_eq!(config.max_put_retry_count(), 100);
        assert_eq!(config.retry_pause(), Duration::from_secs(1));
    }

    #[test]
    fn test_file_config_with_values() {
        let file_config = FileConfig {
            schema: Some(FileSchemaConfig {
                max_put_retry_count: Some(7),
            }),
            invocation_retry_pause_ms: Some(50),
        };
        let config: SerializationConfig = file_config.try_into().unwrap();
        assert_eq!(config.max_put_retry_count(), 7);
        assert_eq!(config.retry_pause(), Duration::from_millis(50));
    }

    #[test]
    fn test_file_config_zero_retries_rejected() {
        let file_config = FileConfig {
            schema: Some(FileSchemaConfig {
                max_put_retry_count: Some(0),
            }),
            ..Default::default()
        };
        assert!(SerializationConfig::try_from(file_config).is_err());
    }

    // The only test touching these variables, so it cannot race another test.
    #[test]
    fn test_from_env() {
        std::env::set_var(ENV_MAX_PUT_RETRY_COUNT, "12");
        std::env::set_var(ENV_RETRY_PAUSE_MS, "30");
        let config = SerializationConfigBuilder::from_env().unwrap().build().unwrap();
        assert_eq!(config.max_put_retry_count(), 12);
        assert_eq!(config.retry_pause(), Duration::from_millis(30));

        std::env::set_var(ENV_RETRY_PAUSE_MS, "soon");
        let err = SerializationConfigBuilder::from_env().unwrap_err();
        assert!(err.to_string().contains(ENV_RETRY_PAUSE_MS));

        std::env::remove_var(ENV_MAX_PUT_RETRY_COUNT);
        std::env::remove_var(ENV_RETRY_PAUSE_MS);
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_from_yaml_file() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "schema:\n  max-put-retry-count: 5\ninvocation-retry-pause-ms: 20").unwrap();
        let config = load_config(file.path()).unwrap().build().unwrap();
        assert_eq!(config.max_put_retry_count(), 5);
        assert_eq!(config.retry_pause(), Duration::from_millis(20));
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_from_toml_file() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "invocation-retry-pause-ms = 15\n\n[schema]\nmax-put-retry-count = 4").unwrap();
        let config = load_config(file.path()).unwrap().build().unwrap();
        assert_eq!(config.max_put_retry_count(), 4);
        assert_eq!(config.retry_pause(), Duration::from_millis(15));
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_unsupported_extension() {
        let err = load_config("settings.ini").unwrap_err();
        assert!(err.to_string().contains(".ini"));
    }
}
