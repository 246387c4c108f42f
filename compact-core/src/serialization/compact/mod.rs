//! Compact serialization: schema-tagged binary objects with random field access.
//!
//! A value is encoded against a [`Schema`] derived from the fields its
//! serializer writes. The schema id travels with every encoded object, so a
//! reader can decode any field without touching the others, and values whose
//! type is not registered locally are decoded as [`GenericRecord`]s.

mod field_kind;
mod field_operations;
mod fingerprint;
mod generic_record;
mod io;
mod reader;
mod registry;
mod schema;
mod schema_writer;
mod serializer;
mod writer;

use std::any::{self, Any};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::error::{CompactError, Result};

pub use field_kind::{FieldKind, VARIABLE_SIZE};
pub use field_operations::{field_operations, FieldOperations};
pub use fingerprint::{fingerprint_of, schema_id as compute_schema_id};
pub use generic_record::{FieldValue, GenericRecord, GenericRecordBuilder};
pub use reader::DefaultCompactReader;
pub use registry::{SchemaRegistry, SchemaState};
pub use schema::{FieldDescriptor, Schema};
pub use schema_writer::SchemaWriter;
pub use serializer::{CompactSerializer, CompactStreamSerializer, DerivedSerializer, SerializerRegistry};
pub use writer::DefaultCompactWriter;

/// Type identifier of Compact-encoded values in the [`Data`](crate::serialization::Data) envelope.
pub const COMPACT_TYPE_ID: i32 = -55;

/// Trait for types that describe their own Compact encoding.
///
/// Usually derived with `#[derive(Compact)]` from `compact-derive`.
pub trait Compact: Send + Sync + Sized + 'static {
    /// Returns the Compact type name, shared by every client that reads this type.
    fn type_name() -> &'static str;

    /// Writes this object's fields to the given writer.
    fn write(&self, writer: &mut dyn CompactWriter) -> Result<()>;

    /// Reads an object from the given reader.
    fn read(reader: &mut dyn CompactReader) -> Result<Self>;
}

/// A value that can be written as a nested Compact object.
///
/// Implemented for every `Send + Sync + 'static` type; whether a serializer
/// exists for it is only known when it is written.
pub trait CompactObject: Any + Send + Sync {
    /// Returns `self` as `Any` for serializer lookup.
    fn as_any(&self) -> &dyn Any;

    /// Returns the Rust type name, used in error messages.
    fn rust_type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> CompactObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn rust_type_name(&self) -> &'static str {
        any::type_name::<T>()
    }
}

/// Writes named fields of a Compact object.
///
/// `None` arguments encode null values of variable-size fields.
#[allow(missing_docs)]
pub trait CompactWriter {
    fn write_boolean(&mut self, name: &str, value: bool) -> Result<()>;
    fn write_int8(&mut self, name: &str, value: i8) -> Result<()>;
    fn write_int16(&mut self, name: &str, value: i16) -> Result<()>;
    fn write_int32(&mut self, name: &str, value: i32) -> Result<()>;
    fn write_int64(&mut self, name: &str, value: i64) -> Result<()>;
    fn write_float32(&mut self, name: &str, value: f32) -> Result<()>;
    fn write_float64(&mut self, name: &str, value: f64) -> Result<()>;

    fn write_string(&mut self, name: &str, value: Option<&str>) -> Result<()>;
    fn write_decimal(&mut self, name: &str, value: Option<Decimal>) -> Result<()>;
    fn write_time(&mut self, name: &str, value: Option<NaiveTime>) -> Result<()>;
    fn write_date(&mut self, name: &str, value: Option<NaiveDate>) -> Result<()>;
    fn write_timestamp(&mut self, name: &str, value: Option<NaiveDateTime>) -> Result<()>;
    fn write_timestamp_with_timezone(
        &mut self,
        name: &str,
        value: Option<DateTime<FixedOffset>>,
    ) -> Result<()>;

    /// Writes a nested object through its registered serializer.
    fn write_compact_object(&mut self, name: &str, value: Option<&dyn CompactObject>) -> Result<()>;

    /// Writes a nested generic record.
    fn write_generic_record(&mut self, name: &str, value: Option<&GenericRecord>) -> Result<()>;

    fn write_nullable_boolean(&mut self, name: &str, value: Option<bool>) -> Result<()>;
    fn write_nullable_int8(&mut self, name: &str, value: Option<i8>) -> Result<()>;
    fn write_nullable_int16(&mut self, name: &str, value: Option<i16>) -> Result<()>;
    fn write_nullable_int32(&mut self, name: &str, value: Option<i32>) -> Result<()>;
    fn write_nullable_int64(&mut self, name: &str, value: Option<i64>) -> Result<()>;
    fn write_nullable_float32(&mut self, name: &str, value: Option<f32>) -> Result<()>;
    fn write_nullable_float64(&mut self, name: &str, value: Option<f64>) -> Result<()>;

    fn write_array_of_boolean(&mut self, name: &str, value: Option<&[bool]>) -> Result<()>;
    fn write_array_of_int8(&mut self, name: &str, value: Option<&[i8]>) -> Result<()>;
    fn write_array_of_int16(&mut self, name: &str, value: Option<&[i16]>) -> Result<()>;
    fn write_array_of_int32(&mut self, name: &str, value: Option<&[i32]>) -> Result<()>;
    fn write_array_of_int64(&mut self, name: &str, value: Option<&[i64]>) -> Result<()>;
    fn write_array_of_float32(&mut self, name: &str, value: Option<&[f32]>) -> Result<()>;
    fn write_array_of_float64(&mut self, name: &str, value: Option<&[f64]>) -> Result<()>;

    fn write_array_of_string(&mut self, name: &str, value: Option<&[Option<String>]>) -> Result<()>;
    fn write_array_of_decimal(&mut self, name: &str, value: Option<&[Option<Decimal>]>) -> Result<()>;
    fn write_array_of_time(&mut self, name: &str, value: Option<&[Option<NaiveTime>]>) -> Result<()>;
    fn write_array_of_date(&mut self, name: &str, value: Option<&[Option<NaiveDate>]>) -> Result<()>;
    fn write_array_of_timestamp(
        &mut self,
        name: &str,
        value: Option<&[Option<NaiveDateTime>]>,
    ) -> Result<()>;
    fn write_array_of_timestamp_with_timezone(
        &mut self,
        name: &str,
        value: Option<&[Option<DateTime<FixedOffset>>]>,
    ) -> Result<()>;

    /// Writes an array of nested objects. Every non-null item must have the same type.
    fn write_array_of_compact_objects(
        &mut self,
        name: &str,
        value: Option<&[Option<&dyn CompactObject>]>,
    ) -> Result<()>;

    /// Writes an array of nested generic records. Every non-null item must have the same schema.
    fn write_array_of_generic_record(
        &mut self,
        name: &str,
        value: Option<&[Option<GenericRecord>]>,
    ) -> Result<()>;

    fn write_array_of_nullable_boolean(&mut self, name: &str, value: Option<&[Option<bool>]>) -> Result<()>;
    fn write_array_of_nullable_int8(&mut self, name: &str, value: Option<&[Option<i8>]>) -> Result<()>;
    fn write_array_of_nullable_int16(&mut self, name: &str, value: Option<&[Option<i16>]>) -> Result<()>;
    fn write_array_of_nullable_int32(&mut self, name: &str, value: Option<&[Option<i32>]>) -> Result<()>;
    fn write_array_of_nullable_int64(&mut self, name: &str, value: Option<&[Option<i64>]>) -> Result<()>;
    fn write_array_of_nullable_float32(&mut self, name: &str, value: Option<&[Option<f32>]>) -> Result<()>;
    fn write_array_of_nullable_float64(&mut self, name: &str, value: Option<&[Option<f64>]>) -> Result<()>;
}

impl<'w> dyn CompactWriter + 'w {
    /// Writes a nested object of a registered type.
    pub fn write_compact<T: Any + Send + Sync>(&mut self, name: &str, value: Option<&T>) -> Result<()> {
        self.write_compact_object(name, value.map(|v| v as &dyn CompactObject))
    }

    /// Writes an array of nested objects of a registered type.
    pub fn write_array_of_compact<T: Any + Send + Sync>(
        &mut self,
        name: &str,
        value: Option<&[Option<T>]>,
    ) -> Result<()> {
        match value {
            None => self.write_array_of_compact_objects(name, None),
            Some(items) => {
                let items: Vec<Option<&dyn CompactObject>> = items
                    .iter()
                    .map(|item| item.as_ref().map(|v| v as &dyn CompactObject))
                    .collect();
                self.write_array_of_compact_objects(name, Some(&items))
            }
        }
    }
}

/// Reads named fields of a Compact object.
///
/// Fixed-size accessors also accept the nullable kind of the field and fail
/// if the stored value is null; see [`DefaultCompactReader`] for the rules.
#[allow(missing_docs)]
pub trait CompactReader {
    /// Returns the kind of a field, or [`FieldKind::NotAvailable`] if the schema has no such field.
    fn get_field_kind(&self, name: &str) -> FieldKind;

    fn read_boolean(&mut self, name: &str) -> Result<bool>;
    fn read_int8(&mut self, name: &str) -> Result<i8>;
    fn read_int16(&mut self, name: &str) -> Result<i16>;
    fn read_int32(&mut self, name: &str) -> Result<i32>;
    fn read_int64(&mut self, name: &str) -> Result<i64>;
    fn read_float32(&mut self, name: &str) -> Result<f32>;
    fn read_float64(&mut self, name: &str) -> Result<f64>;

    fn read_string(&mut self, name: &str) -> Result<Option<String>>;
    fn read_decimal(&mut self, name: &str) -> Result<Option<Decimal>>;
    fn read_time(&mut self, name: &str) -> Result<Option<NaiveTime>>;
    fn read_date(&mut self, name: &str) -> Result<Option<NaiveDate>>;
    fn read_timestamp(&mut self, name: &str) -> Result<Option<NaiveDateTime>>;
    fn read_timestamp_with_timezone(&mut self, name: &str) -> Result<Option<DateTime<FixedOffset>>>;

    /// Reads a nested object: typed if its type name is registered, a [`GenericRecord`] otherwise.
    fn read_compact_object(&mut self, name: &str) -> Result<Option<Box<dyn Any + Send + Sync>>>;

    /// Reads a nested object as a generic record whether or not its type is registered.
    fn read_generic_record(&mut self, name: &str) -> Result<Option<GenericRecord>>;

    fn read_nullable_boolean(&mut self, name: &str) -> Result<Option<bool>>;
    fn read_nullable_int8(&mut self, name: &str) -> Result<Option<i8>>;
    fn read_nullable_int16(&mut self, name: &str) -> Result<Option<i16>>;
    fn read_nullable_int32(&mut self, name: &str) -> Result<Option<i32>>;
    fn read_nullable_int64(&mut self, name: &str) -> Result<Option<i64>>;
    fn read_nullable_float32(&mut self, name: &str) -> Result<Option<f32>>;
    fn read_nullable_float64(&mut self, name: &str) -> Result<Option<f64>>;

    fn read_array_of_boolean(&mut self, name: &str) -> Result<Option<Vec<bool>>>;
    fn read_array_of_int8(&mut self, name: &str) -> Result<Option<Vec<i8>>>;
    fn read_array_of_int16(&mut self, name: &str) -> Result<Option<Vec<i16>>>;
    fn read_array_of_int32(&mut self, name: &str) -> Result<Option<Vec<i32>>>;
    fn read_array_of_int64(&mut self, name: &str) -> Result<Option<Vec<i64>>>;
    fn read_array_of_float32(&mut self, name: &str) -> Result<Option<Vec<f32>>>;
    fn read_array_of_float64(&mut self, name: &str) -> Result<Option<Vec<f64>>>;

    fn read_array_of_string(&mut self, name: &str) -> Result<Option<Vec<Option<String>>>>;
    fn read_array_of_decimal(&mut self, name: &str) -> Result<Option<Vec<Option<Decimal>>>>;
    fn read_array_of_time(&mut self, name: &str) -> Result<Option<Vec<Option<NaiveTime>>>>;
    fn read_array_of_date(&mut self, name: &str) -> Result<Option<Vec<Option<NaiveDate>>>>;
    fn read_array_of_timestamp(&mut self, name: &str) -> Result<Option<Vec<Option<NaiveDateTime>>>>;
    fn read_array_of_timestamp_with_timezone(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<Option<DateTime<FixedOffset>>>>>;

    #[allow(clippy::type_complexity)]
    fn read_array_of_compact_objects(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<Option<Box<dyn Any + Send + Sync>>>>>;
    fn read_array_of_generic_record(&mut self, name: &str) -> Result<Option<Vec<Option<GenericRecord>>>>;

    fn read_array_of_nullable_boolean(&mut self, name: &str) -> Result<Option<Vec<Option<bool>>>>;
    fn read_array_of_nullable_int8(&mut self, name: &str) -> Result<Option<Vec<Option<i8>>>>;
    fn read_array_of_nullable_int16(&mut self, name: &str) -> Result<Option<Vec<Option<i16>>>>;
    fn read_array_of_nullable_int32(&mut self, name: &str) -> Result<Option<Vec<Option<i32>>>>;
    fn read_array_of_nullable_int64(&mut self, name: &str) -> Result<Option<Vec<Option<i64>>>>;
    fn read_array_of_nullable_float32(&mut self, name: &str) -> Result<Option<Vec<Option<f32>>>>;
    fn read_array_of_nullable_float64(&mut self, name: &str) -> Result<Option<Vec<Option<f64>>>>;
}

fn downcast_nested<T: Any>(name: &str, value: Box<dyn Any + Send + Sync>) -> Result<T> {
    value.downcast::<T>().map(|v| *v).map_err(|_| {
        CompactError::Serialization(format!(
            "nested field '{}' was not decoded as {}; is a serializer registered for it?",
            name,
            any::type_name::<T>()
        ))
    })
}

impl<'r> dyn CompactReader + 'r {
    /// Reads a nested object of type `T`.
    pub fn read_compact<T: Any>(&mut self, name: &str) -> Result<Option<T>> {
        self.read_compact_object(name)?
            .map(|value| downcast_nested(name, value))
            .transpose()
    }

    /// Reads an array of nested objects of type `T`.
    pub fn read_array_of_compact<T: Any>(&mut self, name: &str) -> Result<Option<Vec<Option<T>>>> {
        let Some(items) = self.read_array_of_compact_objects(name)? else {
            return Ok(None);
        };
        items
            .into_iter()
            .map(|item| item.map(|value| downcast_nested(name, value)).transpose())
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// Reads a field that may be missing from older or newer schemas of the type.
    ///
    /// Returns `default` when the schema has no field called `name`; otherwise
    /// calls `read`, so kind checks still apply.
    pub fn read_or_default<T>(
        &mut self,
        name: &str,
        default: T,
        read: impl FnOnce(&mut Self, &str) -> Result<T>,
    ) -> Result<T> {
        if self.get_field_kind(name) == FieldKind::NotAvailable {
            Ok(default)
        } else {
            read(self, name)
        }
    }
}
