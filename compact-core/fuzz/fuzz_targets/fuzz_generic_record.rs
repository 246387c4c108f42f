#![no_main]

use std::sync::{Arc, OnceLock};

use libfuzzer_sys::fuzz_target;

use compact_core::{
    CompactStreamSerializer, Data, DataOutput, FieldKind, GenericRecord, ObjectDataOutput, SchemaRegistry,
    SchemaWriter, SerializerRegistry, COMPACT_TYPE_ID,
};

const KINDS: &[(&str, FieldKind)] = &[
    ("flag", FieldKind::Boolean),
    ("small", FieldKind::Int8),
    ("count", FieldKind::Int32),
    ("ratio", FieldKind::Float64),
    ("name", FieldKind::String),
    ("price", FieldKind::Decimal),
    ("at", FieldKind::TimestampWithTimezone),
    ("day", FieldKind::Date),
    ("maybe", FieldKind::NullableInt64),
    ("bits", FieldKind::ArrayOfBoolean),
    ("labels", FieldKind::ArrayOfString),
    ("optional_ints", FieldKind::ArrayOfNullableInt32),
    ("times", FieldKind::ArrayOfTime),
    ("child", FieldKind::Compact),
    ("children", FieldKind::ArrayOfCompact),
];

fn serializer() -> &'static (CompactStreamSerializer, i64) {
    static SERIALIZER: OnceLock<(CompactStreamSerializer, i64)> = OnceLock::new();
    SERIALIZER.get_or_init(|| {
        let mut writer = SchemaWriter::new("FuzzRecord");
        for (name, kind) in KINDS {
            writer.add_field_kind(name, *kind).unwrap();
        }
        let registry = Arc::new(SchemaRegistry::new());
        let schema = registry.put_local(writer.build()).unwrap();
        (
            CompactStreamSerializer::new(registry, SerializerRegistry::new()),
            schema.schema_id(),
        )
    })
}

fn exercise(record: &GenericRecord) {
    let _ = record.to_string();
    for name in record.field_names().collect::<Vec<_>>() {
        let _ = record.get_field_kind(name);
        let _ = record.get_boolean(name);
        let _ = record.get_int32(name);
        let _ = record.get_nullable_int64(name);
        let _ = record.get_string(name);
        let _ = record.get_array_of_int32(name);
        let _ = record.get_array_of_nullable_int32(name);
        let _ = record.get_array_of_string(name);
        if let Ok(Some(child)) = record.get_generic_record(name) {
            let _ = child.to_string();
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let (serializer, schema_id) = serializer();

    if let Ok(envelope) = Data::from_bytes(data.to_vec()) {
        if let Ok(record) = serializer.generic_record_from_data(&envelope) {
            exercise(&record);
        }
    }

    let mut out = ObjectDataOutput::new();
    out.write_int(0).unwrap();
    out.write_int(COMPACT_TYPE_ID).unwrap();
    out.write_long(*schema_id).unwrap();
    out.write_bytes(data).unwrap();
    if let Ok(envelope) = Data::from_bytes(out.into_bytes()) {
        if let Ok(record) = serializer.generic_record_from_data(&envelope) {
            exercise(&record);
            let _ = serializer.generic_record_to_data(&record);
        }
    }
});
