//! Schema replication to and from the cluster.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use compact_core::{CompactError, Result, Schema, SchemaRegistry};
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, trace, warn};

use crate::config::SerializationConfig;
use crate::transport::SchemaTransport;

type FetchFuture = Shared<BoxFuture<'static, Result<Arc<Schema>>>>;

/// Keeps the local [`SchemaRegistry`] and the cluster in agreement.
///
/// Schemas used for encoding are registered with [`put`](Self::put) before
/// any data referencing them is sent; schemas met while decoding are fetched
/// with [`fetch`](Self::fetch). Concurrent fetches of one id share a single
/// remote request.
pub struct SchemaService {
    registry: Arc<SchemaRegistry>,
    transport: Arc<dyn SchemaTransport>,
    max_put_retry_count: u32,
    retry_pause: Duration,
    in_flight: Mutex<HashMap<i64, FetchFuture>>,
}

impl SchemaService {
    /// Creates a service over `registry`, replicating through `transport`.
    pub fn new(
        registry: Arc<SchemaRegistry>,
        transport: Arc<dyn SchemaTransport>,
        config: &SerializationConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            max_put_retry_count: config.max_put_retry_count(),
            retry_pause: config.retry_pause(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the local registry.
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Returns a locally known schema without contacting the cluster.
    pub fn get(&self, schema_id: i64) -> Option<Arc<Schema>> {
        self.registry.get(schema_id)
    }

    /// Replicates `schema` to every cluster member.
    ///
    /// Does nothing if the schema is already replicated. Otherwise the schema is
    /// sent until every member in the transport's member list acknowledges it,
    /// pausing between attempts. Transport errors end the call immediately.
    pub async fn put(&self, schema: Arc<Schema>) -> Result<()> {
        let schema_id = schema.schema_id();
        if self.registry.is_replicated(schema_id) {
            trace!(schema_id, "schema already replicated");
            return Ok(());
        }
        let schema = self.registry.define(schema)?;

        for attempt in 1..=self.max_put_retry_count {
            let replicated_on = self.transport.send_schema(&schema).await?;
            let missing = self
                .transport
                .members()
                .into_iter()
                .filter(|member| !replicated_on.contains(member))
                .count();
            if missing == 0 {
                self.registry.mark_replicated(&schema)?;
                debug!(schema_id, type_name = %schema.type_name(), attempt, "schema replicated");
                return Ok(());
            }
            warn!(
                schema_id,
                type_name = %schema.type_name(),
                attempt,
                missing,
                "schema is not replicated to every member yet"
            );
            if attempt < self.max_put_retry_count {
                tokio::time::sleep(self.retry_pause).await;
            }
        }

        Err(CompactError::IllegalState(format!(
            "The schema {} cannot be replicated in the cluster, after {} retries. \
             It might be the case that the client is connected to the two halves of a cluster \
             that is experiencing a split-brain, and continuing to put data associated with that \
             schema might result in data loss. It might be possible to replicate the schema after \
             some time, when the cluster is healed.",
            schema.type_name(),
            self.max_put_retry_count
        )))
    }

    /// Resolves a schema id, asking the cluster if it is not known locally.
    ///
    /// Concurrent calls for the same id wait on one remote request and receive
    /// the same schema instance.
    pub async fn fetch(&self, schema_id: i64) -> Result<Arc<Schema>> {
        if let Some(schema) = self.registry.get(schema_id) {
            trace!(schema_id, "schema found locally");
            return Ok(schema);
        }

        let fetch = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            in_flight
                .entry(schema_id)
                .or_insert_with(|| {
                    let transport = Arc::clone(&self.transport);
                    let registry = Arc::clone(&self.registry);
                    fetch_remote(transport, registry, schema_id).boxed().shared()
                })
                .clone()
        };

        let result = fetch.clone().await;

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight.get(&schema_id).is_some_and(|f| f.ptr_eq(&fetch)) {
            in_flight.remove(&schema_id);
        }
        result
    }

    /// Sends every replicated schema to the cluster again, as after a reconnect.
    pub async fn send_all_schemas(&self) -> Result<()> {
        let schemas = self.registry.replicated_schemas();
        if schemas.is_empty() {
            trace!("no schemas to send to the cluster");
            return Ok(());
        }
        debug!(count = schemas.len(), "sending all schemas to the cluster");
        self.transport.send_all_schemas(&schemas).await
    }

    /// Returns true if at least one schema is replicated.
    pub fn has_any_schemas(&self) -> bool {
        self.registry.has_any_schemas()
    }
}

async fn fetch_remote(
    transport: Arc<dyn SchemaTransport>,
    registry: Arc<SchemaRegistry>,
    schema_id: i64,
) -> Result<Arc<Schema>> {
    match transport.fetch_schema(schema_id).await? {
        Some(schema) if schema.schema_id() != schema_id => Err(CompactError::IllegalState(format!(
            "asked the cluster for schema {} but received {}",
            schema_id, schema
        ))),
        Some(schema) => {
            debug!(schema_id, type_name = %schema.type_name(), "found schema on the cluster");
            registry.put_local(schema)
        }
        None => {
            debug!(schema_id, "did not find schema on the cluster");
            Err(CompactError::Serialization(format!(
                "The schema can not be found with id {}",
                schema_id
            )))
        }
    }
}

impl fmt::Debug for SchemaService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaService")
            .field("schemas", &self.registry.len())
            .field("max_put_retry_count", &self.max_put_retry_count)
            .field("retry_pause", &self.retry_pause)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use compact_core::serialization::compact::SchemaWriter;
    use compact_core::FieldKind;
    use uuid::Uuid;

    /// Two members; only the first ever acknowledges a schema.
    struct HalfCluster {
        members: Vec<Uuid>,
        sends: AtomicUsize,
    }

    impl HalfCluster {
        fn new() -> Self {
            Self {
                members: vec![Uuid::new_v4(), Uuid::new_v4()],
                sends: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SchemaTransport for HalfCluster {
        async fn send_schema(&self, _schema: &Schema) -> Result<HashSet<Uuid>> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(self.members.iter().take(1).copied().collect())
        }

        async fn fetch_schema(&self, _schema_id: i64) -> Result<Option<Schema>> {
            Ok(None)
        }

        async fn send_all_schemas(&self, _schemas: &[Arc<Schema>]) -> Result<()> {
            Err(CompactError::Connection("offline".to_string()))
        }

        fn members(&self) -> Vec<Uuid> {
            self.members.clone()
        }
    }

    fn schema() -> Arc<Schema> {
        let mut writer = SchemaWriter::new("Point");
        writer.add_field_kind("x", FieldKind::Int32).unwrap();
        Arc::new(writer.build())
    }

    fn service(transport: Arc<HalfCluster>, retries: u32) -> SchemaService {
        let config = SerializationConfig::builder()
            .max_put_retry_count(retries)
            .retry_pause(Duration::from_millis(100))
            .build()
            .unwrap();
        SchemaService::new(Arc::new(SchemaRegistry::new()), transport, &config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_gives_up_after_retry_count() {
        let transport = Arc::new(HalfCluster::new());
        let service = service(Arc::clone(&transport), 3);
        let schema = schema();

        let err = service.put(Arc::clone(&schema)).await.unwrap_err();
        assert!(matches!(err, CompactError::IllegalState(_)));
        assert!(err.to_string().contains("split-brain"));
        assert!(err.to_string().contains("after 3 retries"));
        assert_eq!(transport.sends.load(Ordering::SeqCst), 3);
        assert!(!service.has_any_schemas());
        assert!(service.get(schema.schema_id()).is_some());
    }

    #[tokio::test]
    async fn test_fetch_missing_schema() {
        let service = service(Arc::new(HalfCluster::new()), 1);
        let err = service.fetch(99).await.unwrap_err();
        assert!(err.to_string().contains("The schema can not be found with id 99"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_fetch_local_hit_skips_transport() {
        let service = service(Arc::new(HalfCluster::new()), 1);
        let schema = schema();
        service.registry().define(Arc::clone(&schema)).unwrap();
        let found = service.fetch(schema.schema_id()).await.unwrap();
        assert!(Arc::ptr_eq(&found, &schema));
    }

    #[tokio::test]
    async fn test_send_all_schemas_noop_when_empty() {
        let service = service(Arc::new(HalfCluster::new()), 1);
        service.send_all_schemas().await.unwrap();

        service.registry().put_local(schema()).unwrap();
        let err = service.send_all_schemas().await.unwrap_err();
        assert!(matches!(err, CompactError::Connection(_)));
    }
}
