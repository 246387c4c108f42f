//! Derives a schema from the fields a serializer writes.

use std::collections::btree_map::{BTreeMap, Entry};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use super::{CompactObject, CompactWriter, FieldDescriptor, FieldKind, GenericRecord, Schema};
use crate::error::{CompactError, Result};

/// A [`CompactWriter`] that records field names and kinds and ignores values.
///
/// Running a serializer's `write` against it once yields the schema of the type.
#[derive(Debug)]
pub struct SchemaWriter {
    type_name: String,
    fields: BTreeMap<String, FieldKind>,
}

impl SchemaWriter {
    /// Creates a writer for the given type name.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field described by a descriptor.
    pub fn add_field(&mut self, field: FieldDescriptor) -> Result<()> {
        self.add_field_kind(field.name(), field.kind())
    }

    /// Adds a field by name and kind.
    pub fn add_field_kind(&mut self, name: &str, kind: FieldKind) -> Result<()> {
        kind.ensure_supported(name)?;
        match self.fields.entry(name.to_string()) {
            Entry::Occupied(_) => Err(CompactError::Serialization(format!(
                "Field with the name '{}' already exists in compact schema '{}'",
                name, self.type_name
            ))),
            Entry::Vacant(slot) => {
                slot.insert(kind);
                Ok(())
            }
        }
    }

    /// Lays out the recorded fields and computes the schema id.
    pub fn build(self) -> Schema {
        Schema::from_sorted(self.type_name, self.fields)
    }
}

macro_rules! record_fields {
    ($($method:ident($ty:ty) => $kind:ident;)*) => {
        $(
            fn $method(&mut self, name: &str, _value: $ty) -> Result<()> {
                self.add_field_kind(name, FieldKind::$kind)
            }
        )*
    };
}

impl CompactWriter for SchemaWriter {
    record_fields! {
        write_boolean(bool) => Boolean;
        write_int8(i8) => Int8;
        write_int16(i16) => Int16;
        write_int32(i32) => Int32;
        write_int64(i64) => Int64;
        write_float32(f32) => Float32;
        write_float64(f64) => Float64;
        write_string(Option<&str>) => String;
        write_decimal(Option<Decimal>) => Decimal;
        write_time(Option<NaiveTime>) => Time;
        write_date(Option<NaiveDate>) => Date;
        write_timestamp(Option<NaiveDateTime>) => Timestamp;
        write_timestamp_with_timezone(Option<DateTime<FixedOffset>>) => TimestampWithTimezone;
        write_compact_object(Option<&dyn CompactObject>) => Compact;
        write_generic_record(Option<&GenericRecord>) => Compact;
        write_nullable_boolean(Option<bool>) => NullableBoolean;
        write_nullable_int8(Option<i8>) => NullableInt8;
        write_nullable_int16(Option<i16>) => NullableInt16;
        write_nullable_int32(Option<i32>) => NullableInt32;
        write_nullable_int64(Option<i64>) => NullableInt64;
        write_nullable_float32(Option<f32>) => NullableFloat32;
        write_nullable_float64(Option<f64>) => NullableFloat64;
        write_array_of_boolean(Option<&[bool]>) => ArrayOfBoolean;
        write_array_of_int8(Option<&[i8]>) => ArrayOfInt8;
        write_array_of_int16(Option<&[i16]>) => ArrayOfInt16;
        write_array_of_int32(Option<&[i32]>) => ArrayOfInt32;
        write_array_of_int64(Option<&[i64]>) => ArrayOfInt64;
        write_array_of_float32(Option<&[f32]>) => ArrayOfFloat32;
        write_array_of_float64(Option<&[f64]>) => ArrayOfFloat64;
        write_array_of_string(Option<&[Option<String>]>) => ArrayOfString;
        write_array_of_decimal(Option<&[Option<Decimal>]>) => ArrayOfDecimal;
        write_array_of_time(Option<&[Option<NaiveTime>]>) => ArrayOfTime;
        write_array_of_date(Option<&[Option<NaiveDate>]>) => ArrayOfDate;
        write_array_of_timestamp(Option<&[Option<NaiveDateTime>]>) => ArrayOfTimestamp;
        write_array_of_timestamp_with_timezone(Option<&[Option<DateTime<FixedOffset>>]>) => ArrayOfTimestampWithTimezone;
        write_array_of_compact_objects(Option<&[Option<&dyn CompactObject>]>) => ArrayOfCompact;
        write_array_of_generic_record(Option<&[Option<GenericRecord>]>) => ArrayOfCompact;
        write_array_of_nullable_boolean(Option<&[Option<bool>]>) => ArrayOfNullableBoolean;
        write_array_of_nullable_int8(Option<&[Option<i8>]>) => ArrayOfNullableInt8;
        write_array_of_nullable_int16(Option<&[Option<i16>]>) => ArrayOfNullableInt16;
        write_array_of_nullable_int32(Option<&[Option<i32>]>) => ArrayOfNullableInt32;
        write_array_of_nullable_int64(Option<&[Option<i64>]>) => ArrayOfNullableInt64;
        write_array_of_nullable_float32(Option<&[Option<f32>]>) => ArrayOfNullableFloat32;
        write_array_of_nullable_float64(Option<&[Option<f64>]>) => ArrayOfNullableFloat64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_kinds_and_ignores_values() {
        let mut writer = SchemaWriter::new("Employee");
        writer.write_int32("age", 30).unwrap();
        writer.write_string("name", None).unwrap();
        writer.write_array_of_nullable_int64("ids", Some(&[Some(1), None])).unwrap();
        writer.write_compact_object("manager", None).unwrap();
        let schema = writer.build();

        assert_eq!(schema.type_name(), "Employee");
        assert_eq!(schema.field_kind("age"), Some(FieldKind::Int32));
        assert_eq!(schema.field_kind("name"), Some(FieldKind::String));
        assert_eq!(schema.field_kind("ids"), Some(FieldKind::ArrayOfNullableInt64));
        assert_eq!(schema.field_kind("manager"), Some(FieldKind::Compact));
        assert_eq!(schema.field_count(), 4);
    }

    #[test]
    fn test_duplicate_field_fails_immediately() {
        let mut writer = SchemaWriter::new("T");
        writer.write_int32("a", 1).unwrap();
        let err = writer.write_string("a", Some("x")).unwrap_err();
        assert!(matches!(err, CompactError::Serialization(_)));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_add_field_descriptor() {
        let mut writer = SchemaWriter::new("typeName");
        writer.add_field(FieldDescriptor::new("a", FieldKind::Boolean)).unwrap();
        writer.add_field(FieldDescriptor::new("b", FieldKind::ArrayOfBoolean)).unwrap();
        writer
            .add_field(FieldDescriptor::new("c", FieldKind::TimestampWithTimezone))
            .unwrap();
        let schema = writer.build();
        let expected = Schema::new(
            "typeName",
            vec![
                FieldDescriptor::new("c", FieldKind::TimestampWithTimezone),
                FieldDescriptor::new("a", FieldKind::Boolean),
                FieldDescriptor::new("b", FieldKind::ArrayOfBoolean),
            ],
        )
        .unwrap();
        assert_eq!(schema, expected);
    }

    #[test]
    fn test_unsupported_kind_rejected() {
        let mut writer = SchemaWriter::new("T");
        let err = writer.add_field_kind("c", FieldKind::Char).unwrap_err();
        assert!(matches!(err, CompactError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_write_order_does_not_matter() {
        let mut first = SchemaWriter::new("T");
        first.write_int64("id", 0).unwrap();
        first.write_boolean("active", false).unwrap();
        let mut second = SchemaWriter::new("T");
        second.write_boolean("active", true).unwrap();
        second.write_int64("id", 9).unwrap();
        assert_eq!(first.build().schema_id(), second.build().schema_id());
    }
}
