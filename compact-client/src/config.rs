//! Serialization configuration types and builders.

use std::any::Any;
use std::time::Duration;

use compact_core::{Compact, CompactError, CompactSerializer, SerializerRegistry};

/// Default number of attempts to replicate a schema to every member.
pub const DEFAULT_MAX_PUT_RETRY_COUNT: u32 = 100;
/// Default pause between schema replication attempts.
pub const DEFAULT_RETRY_PAUSE: Duration = Duration::from_millis(1000);

/// Configuration error returned when validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for CompactError {
    fn from(err: ConfigError) -> Self {
        CompactError::Configuration(err.message)
    }
}

/// Settings of the serialization service and its schema replication.
#[derive(Debug, Clone)]
pub struct SerializationConfig {
    max_put_retry_count: u32,
    retry_pause: Duration,
    serializers: SerializerRegistry,
}

impl SerializationConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> SerializationConfigBuilder {
        SerializationConfigBuilder::new()
    }

    /// Returns how many times a schema is sent before replication is given up.
    pub fn max_put_retry_count(&self) -> u32 {
        self.max_put_retry_count
    }

    /// Returns the pause between schema replication attempts.
    pub fn retry_pause(&self) -> Duration {
        self.retry_pause
    }

    /// Returns the registered Compact serializers.
    pub fn serializers(&self) -> &SerializerRegistry {
        &self.serializers
    }
}

impl Default for SerializationConfig {
    fn default() -> Self {
        Self {
            max_put_retry_count: DEFAULT_MAX_PUT_RETRY_COUNT,
            retry_pause: DEFAULT_RETRY_PAUSE,
            serializers: SerializerRegistry::new(),
        }
    }
}

/// Builder for `SerializationConfig`.
///
/// Registration failures are kept until [`build`](Self::build), so
/// registrations can be chained.
#[derive(Debug, Clone, Default)]
pub struct SerializationConfigBuilder {
    max_put_retry_count: Option<u32>,
    retry_pause: Option<Duration>,
    serializers: SerializerRegistry,
    registration_error: Option<String>,
}

impl SerializationConfigBuilder {
    /// Creates a new serialization configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many times a schema is sent before replication is given up.
    pub fn max_put_retry_count(mut self, count: u32) -> Self {
        self.max_put_retry_count = Some(count);
        self
    }

    /// Sets the pause between schema replication attempts.
    pub fn retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = Some(pause);
        self
    }

    /// Registers an explicit serializer for `T`.
    pub fn register<T, S>(mut self, serializer: S) -> Self
    where
        T: Any + Send + Sync,
        S: CompactSerializer<T> + 'static,
    {
        if let Err(e) = self.serializers.register::<T, S>(serializer) {
            self.keep_first_error(e);
        }
        self
    }

    /// Registers the derived serializer of a [`Compact`] type.
    pub fn register_compact<T: Compact>(mut self) -> Self {
        if let Err(e) = self.serializers.register_compact::<T>() {
            self.keep_first_error(e);
        }
        self
    }

    fn keep_first_error(&mut self, err: CompactError) {
        if self.registration_error.is_none() {
            let message = match err {
                CompactError::Configuration(message) => message,
                other => other.to_string(),
            };
            self.registration_error = Some(message);
        }
    }

    /// Builds the configuration, returning an error if validation fails.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `max_put_retry_count` is zero
    /// - two serializers were registered for one Rust type or one Compact type name
    pub fn build(self) -> Result<SerializationConfig, ConfigError> {
        if let Some(message) = self.registration_error {
            return Err(ConfigError::new(message));
        }

        let max_put_retry_count = self.max_put_retry_count.unwrap_or(DEFAULT_MAX_PUT_RETRY_COUNT);
        if max_put_retry_count == 0 {
            return Err(ConfigError::new("max_put_retry_count must be at least 1"));
        }

        Ok(SerializationConfig {
            max_put_retry_count,
            retry_pause: self.retry_pause.unwrap_or(DEFAULT_RETRY_PAUSE),
            serializers: self.serializers,
        })
    }
}
