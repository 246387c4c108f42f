//! The seam between the schema service and the cluster connection.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use compact_core::{Result, Schema};
use uuid::Uuid;

/// Sends and fetches schemas on behalf of the [`SchemaService`](crate::SchemaService).
///
/// Implemented by whatever owns the cluster connection. Transport failures are
/// reported as [`CompactError::Connection`](compact_core::CompactError::Connection)
/// and are not retried by the schema service.
#[async_trait]
pub trait SchemaTransport: Send + Sync {
    /// Sends one schema to the cluster.
    ///
    /// Returns the UUIDs of the members known to hold the schema after the call.
    async fn send_schema(&self, schema: &Schema) -> Result<HashSet<Uuid>>;

    /// Fetches a schema by id; `None` if no member knows it.
    async fn fetch_schema(&self, schema_id: i64) -> Result<Option<Schema>>;

    /// Sends every given schema in one request, as after a reconnect.
    async fn send_all_schemas(&self, schemas: &[Arc<Schema>]) -> Result<()>;

    /// Returns the UUIDs of the current cluster members.
    fn members(&self) -> Vec<Uuid>;
}
