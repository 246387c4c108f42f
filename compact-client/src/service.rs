//! The serialization service: encode and decode with schema replication.

use std::any::Any;
use std::sync::Arc;

use compact_core::{CompactStreamSerializer, Data, GenericRecord, Result, SchemaRegistry};
use futures::future;

use crate::config::SerializationConfig;
use crate::invocation::invoke_with_schema_recovery;
use crate::lazy::ReadOnlyLazyList;
use crate::schema_service::SchemaService;
use crate::transport::SchemaTransport;

/// Converts values to and from [`Data`], replicating and fetching schemas as needed.
///
/// Cheap to clone; clones share the schema registry and serializers.
#[derive(Debug, Clone)]
pub struct SerializationService {
    serializer: Arc<CompactStreamSerializer>,
    schemas: Arc<SchemaService>,
}

impl SerializationService {
    /// Creates a service with an empty schema registry.
    pub fn new(config: &SerializationConfig, transport: Arc<dyn SchemaTransport>) -> Self {
        let registry = Arc::new(SchemaRegistry::new());
        let serializer = CompactStreamSerializer::new(Arc::clone(&registry), config.serializers().clone());
        Self {
            serializer: Arc::new(serializer),
            schemas: Arc::new(SchemaService::new(registry, transport, config)),
        }
    }

    /// Returns the schema service.
    pub fn schema_service(&self) -> &Arc<SchemaService> {
        &self.schemas
    }

    /// Returns the underlying stream serializer.
    pub fn serializer(&self) -> &Arc<CompactStreamSerializer> {
        &self.serializer
    }

    /// Encodes a value of a registered type, replicating its schema first if needed.
    pub async fn to_data<T: Any + Send + Sync>(&self, value: &T) -> Result<Data> {
        invoke_with_schema_recovery(&self.schemas, &self.serializer, || {
            future::ready(self.serializer.to_data(value))
        })
        .await
    }

    /// Encodes a generic record, replicating its schema first if needed.
    pub async fn generic_record_to_data(&self, record: &GenericRecord) -> Result<Data> {
        invoke_with_schema_recovery(&self.schemas, &self.serializer, || {
            future::ready(self.serializer.generic_record_to_data(record))
        })
        .await
    }

    /// Decodes a value, fetching unknown schemas from the cluster.
    ///
    /// `T` may be [`GenericRecord`] to decode any Compact value.
    pub async fn to_object<T: Any>(&self, data: &Data) -> Result<T> {
        invoke_with_schema_recovery(&self.schemas, &self.serializer, || {
            future::ready(self.serializer.from_data::<T>(data))
        })
        .await
    }

    /// Decodes a value as a generic record whether or not its type is registered.
    pub async fn to_generic_record(&self, data: &Data) -> Result<GenericRecord> {
        invoke_with_schema_recovery(&self.schemas, &self.serializer, || {
            future::ready(self.serializer.generic_record_from_data(data))
        })
        .await
    }

    /// Wraps encoded values into a list decoded on access.
    pub fn lazy_list<T: Any>(&self, items: Vec<Data>) -> ReadOnlyLazyList<T> {
        ReadOnlyLazyList::new(items, Arc::clone(&self.serializer))
    }

    /// Decodes every element of `list`, fetching the schemas its elements miss.
    pub async fn resolve_list<T: Any>(&self, list: &ReadOnlyLazyList<T>) -> Result<Vec<T>> {
        invoke_with_schema_recovery(&self.schemas, &self.serializer, || future::ready(list.to_vec())).await
    }
}
