//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use compact_client::{SerializationConfig, SerializationConfigBuilder, SerializationService, SchemaTransport};
use compact_core::{CompactError, Result, Schema};
use compact_derive::Compact;
use uuid::Uuid;

#[derive(Compact, Debug, Clone, PartialEq)]
pub struct Employee {
    pub age: i32,
    pub id: i64,
}

#[derive(Compact, Debug, Clone, PartialEq)]
pub struct Team {
    pub name: String,
    pub lead: Employee,
    pub members: Vec<Employee>,
}

/// A cluster held in memory, shared by every client created over it.
///
/// Counts the requests it receives and can be told to leave its last member
/// out of the next acknowledgements, as a member that has not caught up.
pub struct InMemoryCluster {
    members: Vec<Uuid>,
    schemas: Mutex<HashMap<i64, Schema>>,
    lagging_acks: AtomicUsize,
    offline: AtomicBool,
    fetch_delay: Mutex<Duration>,
    pub sends: AtomicUsize,
    pub fetches: AtomicUsize,
    pub send_alls: AtomicUsize,
}

impl InMemoryCluster {
    pub fn new(member_count: usize) -> Arc<Self> {
        Arc::new(Self {
            members: (0..member_count).map(|_| Uuid::new_v4()).collect(),
            schemas: Mutex::new(HashMap::new()),
            lagging_acks: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            fetch_delay: Mutex::new(Duration::ZERO),
            sends: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            send_alls: AtomicUsize::new(0),
        })
    }

    /// The next `count` acknowledgements will miss the last member.
    pub fn lag_next_acks(&self, count: usize) {
        self.lagging_acks.store(count, Ordering::SeqCst);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }

    pub fn holds(&self, schema_id: i64) -> bool {
        self.schemas.lock().unwrap().contains_key(&schema_id)
    }

    pub fn forget_all(&self) {
        self.schemas.lock().unwrap().clear();
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CompactError::Connection("cluster is unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SchemaTransport for InMemoryCluster {
    async fn send_schema(&self, schema: &Schema) -> Result<HashSet<Uuid>> {
        self.check_online()?;
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.schemas
            .lock()
            .unwrap()
            .insert(schema.schema_id(), schema.clone());

        let lagging = self
            .lagging_acks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let acked = if lagging {
            self.members.len().saturating_sub(1)
        } else {
            self.members.len()
        };
        Ok(self.members.iter().take(acked).copied().collect())
    }

    async fn fetch_schema(&self, schema_id: i64) -> Result<Option<Schema>> {
        self.check_online()?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(self.schemas.lock().unwrap().get(&schema_id).cloned())
    }

    async fn send_all_schemas(&self, schemas: &[Arc<Schema>]) -> Result<()> {
        self.check_online()?;
        self.send_alls.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.schemas.lock().unwrap();
        for schema in schemas {
            stored.insert(schema.schema_id(), Schema::clone(schema));
        }
        Ok(())
    }

    fn members(&self) -> Vec<Uuid> {
        self.members.clone()
    }
}

/// Settings with a short retry pause and the test types registered.
pub fn test_config() -> SerializationConfig {
    test_config_builder()
        .register_compact::<Employee>()
        .register_compact::<Team>()
        .build()
        .expect("failed to build config")
}

pub fn test_config_builder() -> SerializationConfigBuilder {
    SerializationConfigBuilder::new()
        .max_put_retry_count(5)
        .retry_pause(Duration::from_millis(10))
}

pub fn create_service(cluster: &Arc<InMemoryCluster>) -> SerializationService {
    create_service_with_config(cluster, &test_config())
}

pub fn create_service_with_config(cluster: &Arc<InMemoryCluster>, config: &SerializationConfig) -> SerializationService {
    SerializationService::new(config, Arc::clone(cluster) as Arc<dyn SchemaTransport>)
}
