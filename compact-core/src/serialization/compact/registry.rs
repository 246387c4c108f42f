//! Process-local store of known schemas and their replication state.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::schema::Schema;
use crate::error::{CompactError, Result};

/// Replication state of a schema known to this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// Derived locally; the cluster may not know it yet.
    LocallyDefined,
    /// Known to be held by the cluster.
    Replicated,
}

#[derive(Debug)]
struct Entry {
    schema: Arc<Schema>,
    state: SchemaState,
}

/// Thread-safe map from schema id to schema.
///
/// Schemas are never evicted. Share it through an `Arc` between the
/// serializer and the schema service.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entries: RwLock<HashMap<i64, Entry>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> RwLockReadGuard<'_, HashMap<i64, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn entries_mut(&self) -> RwLockWriteGuard<'_, HashMap<i64, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the schema with the given id, whatever its state.
    pub fn get(&self, schema_id: i64) -> Option<Arc<Schema>> {
        self.entries().get(&schema_id).map(|e| Arc::clone(&e.schema))
    }

    /// Returns the state of the schema with the given id.
    pub fn state(&self, schema_id: i64) -> Option<SchemaState> {
        self.entries().get(&schema_id).map(|e| e.state)
    }

    /// Returns true if the schema with the given id is known to the cluster.
    pub fn is_replicated(&self, schema_id: i64) -> bool {
        self.state(schema_id) == Some(SchemaState::Replicated)
    }

    /// Records a locally derived schema.
    ///
    /// Returns the stored instance, which is the existing one if the schema was
    /// already known.
    pub fn define(&self, schema: impl Into<Arc<Schema>>) -> Result<Arc<Schema>> {
        self.insert(schema.into(), SchemaState::LocallyDefined)
    }

    /// Records a schema learned from the cluster as replicated.
    pub fn put_local(&self, schema: impl Into<Arc<Schema>>) -> Result<Arc<Schema>> {
        self.insert(schema.into(), SchemaState::Replicated)
    }

    /// Marks a schema as replicated after the cluster acknowledged it.
    pub fn mark_replicated(&self, schema: &Arc<Schema>) -> Result<()> {
        self.insert(Arc::clone(schema), SchemaState::Replicated)
            .map(|_| ())
    }

    fn insert(&self, schema: Arc<Schema>, state: SchemaState) -> Result<Arc<Schema>> {
        let mut entries = self.entries_mut();
        match entries.get_mut(&schema.schema_id()) {
            Some(existing) if *existing.schema != *schema => Err(CompactError::IllegalState(format!(
                "Schema with id {} already exists. Existing schema: {}, new schema: {}",
                schema.schema_id(),
                existing.schema,
                schema
            ))),
            Some(existing) => {
                if state == SchemaState::Replicated {
                    existing.state = SchemaState::Replicated;
                }
                Ok(Arc::clone(&existing.schema))
            }
            None => {
                tracing::trace!(
                    schema_id = schema.schema_id(),
                    type_name = %schema.type_name(),
                    ?state,
                    "schema stored"
                );
                entries.insert(
                    schema.schema_id(),
                    Entry {
                        schema: Arc::clone(&schema),
                        state,
                    },
                );
                Ok(schema)
            }
        }
    }

    /// Returns every replicated schema, to be sent again after a reconnect.
    pub fn replicated_schemas(&self) -> Vec<Arc<Schema>> {
        self.entries()
            .values()
            .filter(|e| e.state == SchemaState::Replicated)
            .map(|e| Arc::clone(&e.schema))
            .collect()
    }

    /// Returns true if at least one schema is replicated.
    pub fn has_any_schemas(&self) -> bool {
        self.entries()
            .values()
            .any(|e| e.state == SchemaState::Replicated)
    }

    /// Returns the number of known schemas.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns true if no schema is known.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::compact::{FieldDescriptor, FieldKind};

    fn schema(type_name: &str, field: &str) -> Schema {
        Schema::new(type_name, vec![FieldDescriptor::new(field, FieldKind::Int32)]).unwrap()
    }

    #[test]
    fn test_define_then_mark_replicated() {
        let registry = SchemaRegistry::new();
        let stored = registry.define(schema("A", "x")).unwrap();
        assert_eq!(registry.state(stored.schema_id()), Some(SchemaState::LocallyDefined));
        assert!(!registry.is_replicated(stored.schema_id()));
        assert!(!registry.has_any_schemas());

        registry.mark_replicated(&stored).unwrap();
        assert!(registry.is_replicated(stored.schema_id()));
        assert!(registry.has_any_schemas());
        assert_eq!(registry.replicated_schemas().len(), 1);
    }

    #[test]
    fn test_define_returns_existing_instance() {
        let registry = SchemaRegistry::new();
        let first = registry.define(schema("A", "x")).unwrap();
        let second = registry.define(schema("A", "x")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_define_does_not_downgrade_state() {
        let registry = SchemaRegistry::new();
        let stored = registry.put_local(schema("A", "x")).unwrap();
        registry.define(schema("A", "x")).unwrap();
        assert!(registry.is_replicated(stored.schema_id()));
    }

    #[test]
    fn test_put_local_is_replicated() {
        let registry = SchemaRegistry::new();
        let stored = registry.put_local(schema("B", "y")).unwrap();
        assert_eq!(registry.get(stored.schema_id()).unwrap(), stored);
        assert!(registry.is_replicated(stored.schema_id()));
    }

    #[test]
    fn test_unknown_id() {
        let registry = SchemaRegistry::new();
        assert!(registry.get(42).is_none());
        assert!(registry.state(42).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_defines() {
        let registry = Arc::new(SchemaRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry.define(schema("T", &format!("f{}", i % 4))).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 4);
    }
}
