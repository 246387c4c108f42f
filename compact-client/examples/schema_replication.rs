//! Two clients exchanging Compact data through an in-process cluster.
//!
//! Run with: `RUST_LOG=trace cargo run --example schema_replication`

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use compact_client::{SchemaTransport, SerializationConfig, SerializationService};
use compact_core::{GenericRecord, Result, Schema};
use compact_derive::Compact;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Compact, Debug)]
struct Employee {
    age: i32,
    id: i64,
    name: Option<String>,
}

/// Every member acknowledges every schema immediately.
struct LocalCluster {
    members: Vec<Uuid>,
    schemas: Mutex<HashMap<i64, Schema>>,
}

#[async_trait]
impl SchemaTransport for LocalCluster {
    async fn send_schema(&self, schema: &Schema) -> Result<HashSet<Uuid>> {
        if let Ok(mut schemas) = self.schemas.lock() {
            schemas.insert(schema.schema_id(), schema.clone());
        }
        Ok(self.members.iter().copied().collect())
    }

    async fn fetch_schema(&self, schema_id: i64) -> Result<Option<Schema>> {
        Ok(self
            .schemas
            .lock()
            .ok()
            .and_then(|schemas| schemas.get(&schema_id).cloned()))
    }

    async fn send_all_schemas(&self, _schemas: &[Arc<Schema>]) -> Result<()> {
        Ok(())
    }

    fn members(&self) -> Vec<Uuid> {
        self.members.clone()
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Compact Schema Replication Example ===\n");

    let cluster: Arc<dyn SchemaTransport> = Arc::new(LocalCluster {
        members: vec![Uuid::new_v4(), Uuid::new_v4()],
        schemas: Mutex::new(HashMap::new()),
    });

    let writer_config = SerializationConfig::builder()
        .register_compact::<Employee>()
        .build()?;
    let writer = SerializationService::new(&writer_config, Arc::clone(&cluster));

    // The reader has no serializer for Employee and falls back to generic records.
    let reader = SerializationService::new(&SerializationConfig::default(), cluster);

    let employee = Employee {
        age: 23,
        id: 456,
        name: Some("Ada".to_string()),
    };
    let data = writer.to_data(&employee).await?;
    println!("Encoded {:?} into {} bytes", employee, data.len());

    let record: GenericRecord = reader.to_object(&data).await?;
    println!("Reader decoded: {}", record);
    println!("age = {}", record.get_int32("age")?);

    let back: Employee = writer.to_object(&data).await?;
    println!("Writer decoded: {:?}", back);

    Ok(())
}
