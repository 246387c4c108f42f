//! Integration tests for encoding and decoding through the serialization service.

mod common;

use std::collections::HashMap;
use std::error::Error as _;
use std::sync::atomic::Ordering;

use common::{create_service, create_service_with_config, test_config_builder, Employee, InMemoryCluster, Team};
use compact_core::{CompactError, FieldKind, FieldValue, GenericRecord, GenericRecordBuilder};

#[tokio::test]
async fn test_employee_round_trip_between_clients() {
    let cluster = InMemoryCluster::new(2);
    let writer = create_service(&cluster);
    let reader = create_service(&cluster);
    let employee = Employee { age: 23, id: 456 };

    let data = writer.to_data(&employee).await.unwrap();
    assert_eq!(cluster.sends.load(Ordering::SeqCst), 1);

    let decoded: Employee = reader.to_object(&data).await.unwrap();
    assert_eq!(decoded, employee);
    assert_eq!(cluster.fetches.load(Ordering::SeqCst), 1);

    let again: Employee = reader.to_object(&data).await.unwrap();
    assert_eq!(again, employee);
    assert_eq!(cluster.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_schema_is_sent_once_per_type() {
    let cluster = InMemoryCluster::new(2);
    let service = create_service(&cluster);

    for id in 0..5 {
        service.to_data(&Employee { age: 30, id }).await.unwrap();
    }

    assert_eq!(cluster.sends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_nested_schemas_are_replicated() {
    let cluster = InMemoryCluster::new(3);
    let writer = create_service(&cluster);
    let reader = create_service(&cluster);
    let team = Team {
        name: "core".to_string(),
        lead: Employee { age: 40, id: 1 },
        members: vec![Employee { age: 25, id: 2 }, Employee { age: 31, id: 3 }],
    };

    let data = writer.to_data(&team).await.unwrap();
    assert_eq!(cluster.sends.load(Ordering::SeqCst), 2);

    let decoded: Team = reader.to_object(&data).await.unwrap();
    assert_eq!(decoded, team);
    assert_eq!(cluster.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unregistered_type_decodes_as_generic_record() {
    let cluster = InMemoryCluster::new(2);
    let writer = create_service(&cluster);
    let reader = create_service_with_config(&cluster, &test_config_builder().build().unwrap());
    let employee = Employee { age: 23, id: 456 };

    let data = writer.to_data(&employee).await.unwrap();
    let record: GenericRecord = reader.to_object(&data).await.unwrap();

    assert_eq!(record.type_name(), "Employee");
    assert_eq!(record.get_int32("age").unwrap(), 23);
    assert_eq!(record.get_int64("id").unwrap(), 456);
    assert_eq!(record.get_field_kind("age").unwrap(), FieldKind::Int32);
    assert_eq!(record.clone_with(HashMap::new()).unwrap(), record);

    let err = reader.to_object::<Employee>(&data).await.unwrap_err();
    assert!(err.to_string().contains("read it as a generic record"));
}

#[tokio::test]
async fn test_generic_record_round_trip() {
    let cluster = InMemoryCluster::new(2);
    let writer = create_service(&cluster);
    let reader = create_service(&cluster);
    let record = GenericRecordBuilder::compact("Employee")
        .set_int32("age", 23)
        .set_int64("id", 456)
        .build()
        .unwrap();

    let data = writer.generic_record_to_data(&record).await.unwrap();
    assert_eq!(cluster.sends.load(Ordering::SeqCst), 1);

    let employee: Employee = reader.to_object(&data).await.unwrap();
    assert_eq!(employee, Employee { age: 23, id: 456 });

    let decoded = reader.to_generic_record(&data).await.unwrap();
    assert_eq!(decoded, record);

    let older = decoded
        .clone_with(HashMap::from([("age".to_string(), FieldValue::Int32(24))]))
        .unwrap();
    assert_eq!(older.get_int32("age").unwrap(), 24);
    assert_eq!(older.schema(), record.schema());
}

#[tokio::test]
async fn test_lazy_list_decodes_on_access() {
    let cluster = InMemoryCluster::new(2);
    let writer = create_service(&cluster);
    let reader = create_service(&cluster);
    let known = writer.to_data(&Employee { age: 1, id: 1 }).await.unwrap();
    let other = GenericRecordBuilder::compact("Visitor")
        .set_string("name", Some("x".to_string()))
        .build()
        .unwrap();
    let unknown = writer.generic_record_to_data(&other).await.unwrap();

    let _: Employee = reader.to_object(&known).await.unwrap();
    let list = reader.lazy_list::<GenericRecord>(vec![known.clone(), unknown, known]);

    assert_eq!(list.len(), 3);
    assert_eq!(list.get(0).unwrap().unwrap().get_int64("id").unwrap(), 1);
    let err = list.get(1).unwrap().unwrap_err();
    assert!(matches!(err, CompactError::SerializationCause { .. }));
    let source = err.source().unwrap().downcast_ref::<CompactError>().unwrap();
    assert!(matches!(source, CompactError::SchemaNotFound { .. }));
    assert!(list.get(2).unwrap().is_ok());

    let all = reader.resolve_list(&list).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[1].get_string("name").unwrap().as_deref(), Some("x"));
    assert!(list.get(1).unwrap().is_ok());
}

#[tokio::test]
async fn test_unknown_schema_on_cluster_fails_decode() {
    let cluster = InMemoryCluster::new(2);
    let writer = create_service(&cluster);
    let reader = create_service(&cluster);

    let data = writer.to_data(&Employee { age: 5, id: 6 }).await.unwrap();
    cluster.forget_all();

    let err = reader.to_object::<Employee>(&data).await.unwrap_err();
    assert!(err.to_string().contains("The schema can not be found"));
}

#[tokio::test]
async fn test_replication_failure_fails_encode() {
    let cluster = InMemoryCluster::new(2);
    cluster.lag_next_acks(usize::MAX);
    let service = create_service(&cluster);

    let err = service.to_data(&Employee { age: 5, id: 6 }).await.unwrap_err();
    assert!(matches!(err, CompactError::IllegalState(_)));
}
