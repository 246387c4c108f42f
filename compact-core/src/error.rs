//! Error types for Compact serialization and schema replication.

use std::any::TypeId;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use thiserror::Error;

use crate::serialization::compact::Schema;

/// The main error type for Compact serialization operations.
#[derive(Debug, Clone, Error)]
pub enum CompactError {
    /// The schema used to encode a value is not yet known to be replicated in the cluster.
    ///
    /// Recoverable: the invocation layer registers `schema` and retries the call.
    #[error("schema {} of type '{}' is not replicated yet", .schema.schema_id(), .schema.type_name())]
    SchemaNotReplicated {
        /// The schema that must be registered before the retry.
        schema: Arc<Schema>,
        /// Rust type that produced the schema, `None` for generic records.
        type_id: Option<TypeId>,
    },

    /// The schema id found in encoded data is not in the local registry.
    ///
    /// Recoverable: the caller fetches the schema from the cluster and retries.
    #[error("The schema can not be found with id {schema_id}")]
    SchemaNotFound {
        /// The unresolved schema id.
        schema_id: i64,
    },

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A serialization error raised because of an underlying error.
    #[error("serialization error: {message}")]
    SerializationCause {
        /// Description of the failed operation.
        message: String,
        /// The error that caused this one, returned by `source()`.
        #[source]
        cause: ErrorCause,
    },

    /// A generic record value has the wrong type or is missing.
    #[error("type error: {0}")]
    Type(String),

    /// A generic record value is outside the range of its field kind.
    #[error("range error: {0}")]
    Range(String),

    /// Operation on a field kind that Compact does not support.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Configuration errors (invalid settings, duplicate serializers).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The client reached a state it cannot continue from.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// Transport failures reported by a schema transport.
    #[error("connection error: {0}")]
    Connection(String),
}

impl CompactError {
    /// Returns true if retrying after registering or fetching a schema can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SchemaNotReplicated { .. } | Self::SchemaNotFound { .. }
        )
    }

    /// Returns the unresolved schema id if this error, or its cause, is a `SchemaNotFound`.
    pub fn schema_not_found_id(&self) -> Option<i64> {
        match self {
            Self::SchemaNotFound { schema_id } => Some(*schema_id),
            Self::SerializationCause { cause, .. } => cause.schema_not_found_id(),
            _ => None,
        }
    }

    /// Wraps `cause` into a serialization error carrying it as its source.
    pub fn caused_by(message: impl Into<String>, cause: CompactError) -> Self {
        Self::SerializationCause {
            message: message.into(),
            cause: ErrorCause(Arc::new(cause)),
        }
    }
}

/// The shared cause of a [`CompactError::SerializationCause`].
///
/// Dereferences to the inner error, which is what `source()` yields, so
/// callers can downcast the source to `CompactError`.
#[derive(Debug, Clone)]
pub struct ErrorCause(Arc<CompactError>);

impl Deref for ErrorCause {
    type Target = CompactError;

    fn deref(&self) -> &CompactError {
        &self.0
    }
}

impl fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

/// A specialized `Result` type for Compact operations.
pub type Result<T> = std::result::Result<T, CompactError>;
