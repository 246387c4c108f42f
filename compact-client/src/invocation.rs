//! Retrying encode/decode work after resolving the schema it was missing.

use std::future::Future;
use std::sync::Arc;

use compact_core::{CompactError, CompactStreamSerializer, Result};
use tracing::{debug, trace};

use crate::schema_service::SchemaService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    Register(i64),
    Fetch(i64),
}

fn recovery_of(err: &CompactError) -> Option<Recovery> {
    match err {
        CompactError::SchemaNotReplicated { schema, .. } => Some(Recovery::Register(schema.schema_id())),
        other => other.schema_not_found_id().map(Recovery::Fetch),
    }
}

/// Runs `attempt` until it succeeds or fails for a reason other than a schema.
///
/// On [`CompactError::SchemaNotReplicated`] the schema is replicated through
/// `schemas` and bound to its Rust type in `serializer`; on
/// [`CompactError::SchemaNotFound`], directly or as the cause of a
/// serialization error, the schema is fetched. Each step is followed by a
/// new attempt. When an attempt fails for the same schema as the one just
/// resolved, that error is returned instead of looping.
pub async fn invoke_with_schema_recovery<T, F, Fut>(
    schemas: &SchemaService,
    serializer: &CompactStreamSerializer,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_step: Option<Recovery> = None;
    loop {
        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let Some(step) = recovery_of(&err) else {
            return Err(err);
        };
        if last_step == Some(step) {
            debug!(?step, "schema recovery made no progress");
            return Err(err);
        }
        trace!(?step, "recovering schema before retry");

        match &err {
            CompactError::SchemaNotReplicated { schema, type_id } => {
                schemas.put(Arc::clone(schema)).await?;
                if let Some(type_id) = type_id {
                    serializer.register_schema_to_type(*type_id, Arc::clone(schema));
                }
            }
            _ => {
                if let Recovery::Fetch(schema_id) = step {
                    schemas.fetch(schema_id).await?;
                }
            }
        }
        last_step = Some(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use compact_core::{FieldKind, Schema, SchemaRegistry, SchemaWriter, SerializerRegistry};
    use uuid::Uuid;

    use crate::config::SerializationConfig;
    use crate::transport::SchemaTransport;

    struct SingleMember(Uuid);

    #[async_trait]
    impl SchemaTransport for SingleMember {
        async fn send_schema(&self, _schema: &Schema) -> Result<HashSet<Uuid>> {
            Ok(HashSet::from([self.0]))
        }

        async fn fetch_schema(&self, _schema_id: i64) -> Result<Option<Schema>> {
            Ok(None)
        }

        async fn send_all_schemas(&self, _schemas: &[Arc<Schema>]) -> Result<()> {
            Ok(())
        }

        fn members(&self) -> Vec<Uuid> {
            vec![self.0]
        }
    }

    fn fixture() -> (SchemaService, CompactStreamSerializer, Arc<Schema>) {
        let registry = Arc::new(SchemaRegistry::new());
        let mut writer = SchemaWriter::new("Point");
        writer.add_field_kind("x", FieldKind::Int32).unwrap();
        let schema = registry.define(writer.build()).unwrap();
        let schemas = SchemaService::new(
            Arc::clone(&registry),
            Arc::new(SingleMember(Uuid::new_v4())),
            &SerializationConfig::default(),
        );
        let serializer = CompactStreamSerializer::new(registry, SerializerRegistry::new());
        (schemas, serializer, schema)
    }

    #[tokio::test]
    async fn test_repeated_not_found_is_returned() {
        let (schemas, serializer, schema) = fixture();
        let attempts = AtomicUsize::new(0);
        let schema_id = schema.schema_id();

        let err = invoke_with_schema_recovery(&schemas, &serializer, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(CompactError::SchemaNotFound { schema_id }) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.schema_not_found_id(), Some(schema_id));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_replicated_registers_then_retries() {
        let (schemas, serializer, schema) = fixture();
        let attempts = AtomicUsize::new(0);

        let value = invoke_with_schema_recovery(&schemas, &serializer, || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            let schema = Arc::clone(&schema);
            async move {
                if attempt == 0 {
                    Err(CompactError::SchemaNotReplicated { schema, type_id: None })
                } else {
                    Ok(7)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert!(schemas.registry().is_replicated(schema.schema_id()));
    }

    #[test]
    fn test_recovery_of_not_found_cause() {
        let err = CompactError::caused_by("element 3", CompactError::SchemaNotFound { schema_id: 7 });
        assert_eq!(recovery_of(&err), Some(Recovery::Fetch(7)));
    }

    #[test]
    fn test_recovery_of_terminal_error() {
        let err = CompactError::Serialization("truncated".to_string());
        assert_eq!(recovery_of(&err), None);
    }
}
