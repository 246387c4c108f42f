//! Encodes one Compact object against its schema.

use std::any::{Any, TypeId};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use super::field_operations::check_single_schema;
use super::io::{self, FixedPrimitive, OffsetReader, Primitive, INT_SIZE_IN_BYTES, NULL_OFFSET};
use super::schema::{FieldDescriptor, Schema};
use super::serializer::CompactStreamSerializer;
use super::{CompactObject, CompactWriter, FieldKind, GenericRecord};
use crate::error::{CompactError, Result};
use crate::serialization::{DataOutput, ObjectDataOutput};

/// Writes the fields of one object into an [`ObjectDataOutput`].
///
/// The fixed-size block is reserved on construction and filled in place;
/// variable-size values are appended and located through an offset table that
/// [`end`](Self::end) writes once every field is known. The schema id must
/// already be in the output.
pub struct DefaultCompactWriter<'a> {
    serializer: &'a CompactStreamSerializer,
    out: &'a mut ObjectDataOutput,
    schema: &'a Schema,
    field_offsets: Vec<i32>,
    data_start: usize,
}

impl<'a> DefaultCompactWriter<'a> {
    /// Reserves the object's header and fixed-size block at the end of `out`.
    pub fn new(serializer: &'a CompactStreamSerializer, out: &'a mut ObjectDataOutput, schema: &'a Schema) -> Self {
        let var_size_fields = schema.number_var_size_fields();
        if var_size_fields > 0 {
            out.write_zero_bytes(INT_SIZE_IN_BYTES);
        }
        let data_start = out.position();
        out.write_zero_bytes(schema.fixed_size_fields_length());
        Self {
            serializer,
            out,
            schema,
            field_offsets: vec![NULL_OFFSET; var_size_fields],
            data_start,
        }
    }

    /// Writes the offset table and the data length. Must be called once, after all fields.
    pub fn end(self) -> Result<()> {
        if self.field_offsets.is_empty() {
            return Ok(());
        }
        let data_length = self.out.position() - self.data_start;
        OffsetReader::for_data_length(data_length).write_all(self.out, &self.field_offsets)?;
        self.out
            .pwrite_int(self.data_start - INT_SIZE_IN_BYTES, io::to_wire_length(data_length)?)
    }

    fn check_field_definition(&self, name: &str, kind: FieldKind) -> Result<&'a FieldDescriptor> {
        let schema: &'a Schema = self.schema;
        let field = schema.field(name).ok_or_else(|| {
            CompactError::Serialization(format!("Invalid field name: '{}' for {}", name, schema))
        })?;
        if field.kind() != kind {
            return Err(CompactError::Serialization(format!(
                "Invalid field type: '{}' for {}",
                name, schema
            )));
        }
        Ok(field)
    }

    fn write_fixed<T: FixedPrimitive>(&mut self, name: &str, value: T) -> Result<()> {
        let field = self.check_field_definition(name, T::KIND)?;
        value.pwrite_to(self.out, self.data_start + field.offset() as usize)
    }

    fn write_variable_size<T: ?Sized>(
        &mut self,
        name: &str,
        kind: FieldKind,
        value: Option<&T>,
        write: impl FnOnce(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        let index = self.check_field_definition(name, kind)?.index() as usize;
        match value {
            None => self.field_offsets[index] = NULL_OFFSET,
            Some(value) => {
                self.field_offsets[index] = io::to_wire_length(self.out.position() - self.data_start)?;
                write(self, value)?;
            }
        }
        Ok(())
    }

    /// Writes `[data length][count][items][item offsets]`; a null item gets offset -1.
    fn write_array_of_variable_size<T>(
        &mut self,
        name: &str,
        kind: FieldKind,
        value: Option<&[Option<T>]>,
        mut write_item: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        self.write_variable_size(name, kind, value, |w, items| {
            let data_length_position = w.out.position();
            w.out.write_int(0)?;
            w.out.write_int(io::to_wire_length(items.len())?)?;
            let data_start = w.out.position();
            let mut offsets = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    None => offsets.push(NULL_OFFSET),
                    Some(item) => {
                        offsets.push(io::to_wire_length(w.out.position() - data_start)?);
                        write_item(w, item)?;
                    }
                }
            }
            let data_length = w.out.position() - data_start;
            w.out.pwrite_int(data_length_position, io::to_wire_length(data_length)?)?;
            OffsetReader::for_data_length(data_length).write_all(w.out, &offsets)
        })
    }

    fn write_nullable<T: Primitive>(&mut self, name: &str, value: Option<T>) -> Result<()> {
        self.write_variable_size(name, T::NULLABLE_KIND, value.as_ref(), |w, v| v.write_to(w.out))
    }

    fn write_array<T: Primitive>(&mut self, name: &str, value: Option<&[T]>) -> Result<()> {
        self.write_variable_size(name, T::ARRAY_KIND, value, |w, v| io::write_primitive_array(w.out, v))
    }

    fn write_array_of_nullable<T: Primitive>(&mut self, name: &str, value: Option<&[Option<T>]>) -> Result<()> {
        self.write_array_of_variable_size(name, T::ARRAY_OF_NULLABLE_KIND, value, |w, v| v.write_to(w.out))
    }
}

/// Fails unless every non-null item has the same Rust type.
fn check_single_type(items: &[Option<&dyn CompactObject>]) -> Result<()> {
    let mut expected: Option<(TypeId, &'static str)> = None;
    for &item in items.iter().flatten() {
        let current = (Any::type_id(item.as_any()), item.rust_type_name());
        match expected {
            None => expected = Some(current),
            Some((type_id, type_name)) if type_id != current.0 => {
                return Err(CompactError::Serialization(format!(
                    "It is not allowed to serialize an array of Compact serializable objects containing different item types. Expected array item type: {}, current item type: {}",
                    type_name, current.1
                )))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

macro_rules! fixed_writers {
    ($($method:ident($ty:ty);)*) => {
        $(
            fn $method(&mut self, name: &str, value: $ty) -> Result<()> {
                self.write_fixed(name, value)
            }
        )*
    };
}

macro_rules! nullable_writers {
    ($($method:ident($ty:ty);)*) => {
        $(
            fn $method(&mut self, name: &str, value: Option<$ty>) -> Result<()> {
                self.write_nullable(name, value)
            }
        )*
    };
}

macro_rules! array_writers {
    ($($method:ident($ty:ty);)*) => {
        $(
            fn $method(&mut self, name: &str, value: Option<&[$ty]>) -> Result<()> {
                self.write_array(name, value)
            }
        )*
    };
}

macro_rules! array_of_nullable_writers {
    ($($method:ident($ty:ty);)*) => {
        $(
            fn $method(&mut self, name: &str, value: Option<&[Option<$ty>]>) -> Result<()> {
                self.write_array_of_nullable(name, value)
            }
        )*
    };
}

macro_rules! value_writers {
    ($($method:ident, $array_method:ident: $ty:ty, $kind:ident, $array_kind:ident, $codec:path;)*) => {
        $(
            fn $method(&mut self, name: &str, value: Option<$ty>) -> Result<()> {
                self.write_variable_size(name, FieldKind::$kind, value.as_ref(), |w, v| $codec(w.out, v))
            }

            fn $array_method(&mut self, name: &str, value: Option<&[Option<$ty>]>) -> Result<()> {
                self.write_array_of_variable_size(name, FieldKind::$array_kind, value, |w, v| $codec(w.out, v))
            }
        )*
    };
}

impl CompactWriter for DefaultCompactWriter<'_> {
    fixed_writers! {
        write_int8(i8);
        write_int16(i16);
        write_int32(i32);
        write_int64(i64);
        write_float32(f32);
        write_float64(f64);
    }

    fn write_boolean(&mut self, name: &str, value: bool) -> Result<()> {
        let field = self.check_field_definition(name, FieldKind::Boolean)?;
        self.out.pwrite_boolean_bit(
            self.data_start + field.offset() as usize,
            field.bit_offset() as u8,
            value,
        )
    }

    fn write_string(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        self.write_variable_size(name, FieldKind::String, value, |w, v| w.out.write_string(v))
    }

    fn write_array_of_string(&mut self, name: &str, value: Option<&[Option<String>]>) -> Result<()> {
        self.write_array_of_variable_size(name, FieldKind::ArrayOfString, value, |w, v| w.out.write_string(v))
    }

    value_writers! {
        write_decimal, write_array_of_decimal: Decimal, Decimal, ArrayOfDecimal, io::write_decimal;
        write_time, write_array_of_time: NaiveTime, Time, ArrayOfTime, io::write_time;
        write_date, write_array_of_date: NaiveDate, Date, ArrayOfDate, io::write_date;
        write_timestamp, write_array_of_timestamp: NaiveDateTime, Timestamp, ArrayOfTimestamp, io::write_timestamp;
        write_timestamp_with_timezone, write_array_of_timestamp_with_timezone:
            DateTime<FixedOffset>, TimestampWithTimezone, ArrayOfTimestampWithTimezone, io::write_timestamp_with_timezone;
    }

    fn write_compact_object(&mut self, name: &str, value: Option<&dyn CompactObject>) -> Result<()> {
        self.write_variable_size(name, FieldKind::Compact, value, |w, v| w.serializer.write_dyn(w.out, v))
    }

    fn write_generic_record(&mut self, name: &str, value: Option<&GenericRecord>) -> Result<()> {
        self.write_variable_size(name, FieldKind::Compact, value, |w, v| {
            w.serializer.write_generic_record(w.out, v)
        })
    }

    fn write_array_of_compact_objects(
        &mut self,
        name: &str,
        value: Option<&[Option<&dyn CompactObject>]>,
    ) -> Result<()> {
        if let Some(items) = value {
            check_single_type(items)?;
        }
        self.write_array_of_variable_size(name, FieldKind::ArrayOfCompact, value, |w, v| {
            w.serializer.write_dyn(w.out, *v)
        })
    }

    fn write_array_of_generic_record(&mut self, name: &str, value: Option<&[Option<GenericRecord>]>) -> Result<()> {
        if let Some(items) = value {
            check_single_schema(items.iter().flatten())?;
        }
        self.write_array_of_variable_size(name, FieldKind::ArrayOfCompact, value, |w, v| {
            w.serializer.write_generic_record(w.out, v)
        })
    }

    nullable_writers! {
        write_nullable_boolean(bool);
        write_nullable_int8(i8);
        write_nullable_int16(i16);
        write_nullable_int32(i32);
        write_nullable_int64(i64);
        write_nullable_float32(f32);
        write_nullable_float64(f64);
    }

    fn write_array_of_boolean(&mut self, name: &str, value: Option<&[bool]>) -> Result<()> {
        self.write_variable_size(name, FieldKind::ArrayOfBoolean, value, |w, v| io::write_boolean_bits(w.out, v))
    }

    array_writers! {
        write_array_of_int8(i8);
        write_array_of_int16(i16);
        write_array_of_int32(i32);
        write_array_of_int64(i64);
        write_array_of_float32(f32);
        write_array_of_float64(f64);
    }

    array_of_nullable_writers! {
        write_array_of_nullable_boolean(bool);
        write_array_of_nullable_int8(i8);
        write_array_of_nullable_int16(i16);
        write_array_of_nullable_int32(i32);
        write_array_of_nullable_int64(i64);
        write_array_of_nullable_float32(f32);
        write_array_of_nullable_float64(f64);
    }
}
