//! Decodes fields of one Compact object by name.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use super::field_operations::{field_operations, kind_not_one_of, mismatched_kind, unexpected_null, unknown_field};
use super::io::{self, FixedPrimitive, OffsetReader, Primitive, NULL_OFFSET};
use super::schema::{FieldDescriptor, Schema};
use super::serializer::CompactStreamSerializer;
use super::{CompactReader, FieldKind, GenericRecord};
use crate::error::{CompactError, Result};
use crate::serialization::{DataInput, ObjectDataInput};

/// Random-access reader over one encoded object.
///
/// Construction validates the header and moves the caller's input past the
/// object, so an enclosing object keeps decoding from the right place. Each
/// `read_*` call jumps straight to its field; other fields are never decoded.
///
/// Fixed-size accessors also accept the nullable kind of the field and fail if
/// the value is null. `read_nullable_*` accept both kinds. Primitive array
/// accessors likewise accept the array-of-nullable kind and fail on a null
/// item. Every other accessor requires the exact kind.
pub struct DefaultCompactReader<'s, 'd> {
    serializer: &'s CompactStreamSerializer,
    input: ObjectDataInput<'d>,
    schema: Arc<Schema>,
    offset_reader: OffsetReader,
    data_start: usize,
    offset_table_start: usize,
}

impl<'s, 'd> DefaultCompactReader<'s, 'd> {
    /// Opens the object at the input's position, whose schema id was already read.
    pub fn new(
        serializer: &'s CompactStreamSerializer,
        input: &mut ObjectDataInput<'d>,
        schema: Arc<Schema>,
    ) -> Result<Self> {
        let (data_start, offset_reader, offset_table_start, end) = if schema.number_var_size_fields() > 0 {
            let data_length = io::from_wire_length(input.read_int()?, "data")?;
            let data_start = input.position();
            let offset_reader = OffsetReader::for_data_length(data_length);
            let offset_table_start = data_start + data_length;
            let end = offset_table_start + schema.number_var_size_fields() * offset_reader.width();
            (data_start, offset_reader, offset_table_start, end)
        } else {
            let data_start = input.position();
            (data_start, OffsetReader::Byte, data_start, data_start + schema.fixed_size_fields_length())
        };
        if end > input.len() || data_start + schema.fixed_size_fields_length() > end {
            return Err(CompactError::Serialization(format!(
                "object of type '{}' ends at {} but the input has {} bytes",
                schema.type_name(),
                end,
                input.len()
            )));
        }
        input.set_position(end);
        Ok(Self {
            serializer,
            input: ObjectDataInput::new(input.as_slice()),
            schema,
            offset_reader,
            data_start,
            offset_table_start,
        })
    }

    /// Returns the schema the object was encoded with.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Decodes every field into a [`GenericRecord`].
    pub fn to_generic_record(&mut self) -> Result<GenericRecord> {
        let schema = Arc::clone(&self.schema);
        let mut values = HashMap::with_capacity(schema.field_count());
        for field in schema.fields() {
            let value = (field_operations(field.kind()).read)(&mut *self, field.name())?;
            values.insert(field.name().to_string(), value);
        }
        Ok(GenericRecord::from_parts(schema, values))
    }

    fn field(&self, name: &str) -> Result<&FieldDescriptor> {
        self.schema.field(name).ok_or_else(|| unknown_field(name, &self.schema))
    }

    fn check_kind(&self, name: &str, kind: FieldKind) -> Result<&FieldDescriptor> {
        let field = self.field(name)?;
        if field.kind() != kind {
            return Err(mismatched_kind(name, kind, field.kind()));
        }
        Ok(field)
    }

    /// Moves to the value at var-size `index` and reads it, or returns `None` for null.
    fn read_at_index<T>(&mut self, index: i32, read: impl FnOnce(&mut Self) -> Result<T>) -> Result<Option<T>> {
        let position = self.offset_table_start + index as usize * self.offset_reader.width();
        let offset = self.offset_reader.read(&self.input, position)?;
        if offset == NULL_OFFSET {
            return Ok(None);
        }
        if offset < 0 {
            return Err(CompactError::Serialization(format!("invalid field offset {}", offset)));
        }
        self.input.set_position(self.data_start + offset as usize);
        read(self).map(Some)
    }

    fn read_variable_size<T>(
        &mut self,
        name: &str,
        kind: FieldKind,
        read: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<Option<T>> {
        let index = self.check_kind(name, kind)?.index();
        self.read_at_index(index, read)
    }

    /// Reads `[data length][count][items][item offsets]` at the current position.
    fn read_items<T>(&mut self, mut read_item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<Option<T>>> {
        let data_length = io::from_wire_length(self.input.read_int()?, "array data")?;
        let count = io::from_wire_length(self.input.read_int()?, "array")?;
        let data_start = self.input.position();
        let offset_reader = OffsetReader::for_data_length(data_length);
        let offset_table_start = data_start + data_length;
        let mut items = Vec::with_capacity(count.min(self.input.remaining()));
        for i in 0..count {
            let offset = offset_reader.read(&self.input, offset_table_start + i * offset_reader.width())?;
            if offset == NULL_OFFSET {
                items.push(None);
            } else if offset < 0 {
                return Err(CompactError::Serialization(format!("invalid item offset {}", offset)));
            } else {
                self.input.set_position(data_start + offset as usize);
                items.push(Some(read_item(self)?));
            }
        }
        Ok(items)
    }

    fn read_array_of_variable_size<T>(
        &mut self,
        name: &str,
        kind: FieldKind,
        read_item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Option<Vec<Option<T>>>> {
        self.read_variable_size(name, kind, |r| r.read_items(read_item))
    }

    fn read_primitive<T: Primitive>(
        &mut self,
        name: &str,
        method: &str,
        nullable_method: &str,
        read_fixed: impl FnOnce(&ObjectDataInput<'d>, usize, u8) -> Result<T>,
    ) -> Result<T> {
        let field = self.field(name)?;
        let (kind, offset, bit, index) = (field.kind(), field.offset(), field.bit_offset() as u8, field.index());
        if kind == T::KIND {
            read_fixed(&self.input, self.data_start + offset as usize, bit)
        } else if kind == T::NULLABLE_KIND {
            self.read_at_index(index, |r| T::read_from(&mut r.input))?
                .ok_or_else(|| unexpected_null(name, method, nullable_method))
        } else {
            Err(kind_not_one_of(name, &[T::KIND, T::NULLABLE_KIND], kind))
        }
    }

    fn read_nullable<T: Primitive>(
        &mut self,
        name: &str,
        read_fixed: impl FnOnce(&ObjectDataInput<'d>, usize, u8) -> Result<T>,
    ) -> Result<Option<T>> {
        let field = self.field(name)?;
        let (kind, offset, bit, index) = (field.kind(), field.offset(), field.bit_offset() as u8, field.index());
        if kind == T::KIND {
            read_fixed(&self.input, self.data_start + offset as usize, bit).map(Some)
        } else if kind == T::NULLABLE_KIND {
            self.read_at_index(index, |r| T::read_from(&mut r.input))
        } else {
            Err(kind_not_one_of(name, &[T::KIND, T::NULLABLE_KIND], kind))
        }
    }

    fn read_array<T: Primitive>(
        &mut self,
        name: &str,
        method: &str,
        nullable_method: &str,
        read_array: fn(&mut ObjectDataInput<'d>) -> Result<Vec<T>>,
    ) -> Result<Option<Vec<T>>> {
        let field = self.field(name)?;
        let (kind, index) = (field.kind(), field.index());
        if kind == T::ARRAY_KIND {
            self.read_at_index(index, |r| read_array(&mut r.input))
        } else if kind == T::ARRAY_OF_NULLABLE_KIND {
            let Some(items) = self.read_at_index(index, |r| r.read_items(|r| T::read_from(&mut r.input)))? else {
                return Ok(None);
            };
            items
                .into_iter()
                .map(|item| item.ok_or_else(|| unexpected_null(name, method, nullable_method)))
                .collect::<Result<Vec<_>>>()
                .map(Some)
        } else {
            Err(kind_not_one_of(name, &[T::ARRAY_KIND, T::ARRAY_OF_NULLABLE_KIND], kind))
        }
    }

    fn read_array_of_nullable<T: Primitive>(
        &mut self,
        name: &str,
        read_array: fn(&mut ObjectDataInput<'d>) -> Result<Vec<T>>,
    ) -> Result<Option<Vec<Option<T>>>> {
        let field = self.field(name)?;
        let (kind, index) = (field.kind(), field.index());
        if kind == T::ARRAY_KIND {
            Ok(self
                .read_at_index(index, |r| read_array(&mut r.input))?
                .map(|items| items.into_iter().map(Some).collect()))
        } else if kind == T::ARRAY_OF_NULLABLE_KIND {
            self.read_at_index(index, |r| r.read_items(|r| T::read_from(&mut r.input)))
        } else {
            Err(kind_not_one_of(name, &[T::ARRAY_KIND, T::ARRAY_OF_NULLABLE_KIND], kind))
        }
    }
}

fn fixed<T: FixedPrimitive>(input: &ObjectDataInput<'_>, position: usize, _bit: u8) -> Result<T> {
    T::read_at(input, position)
}

fn boolean_bit(input: &ObjectDataInput<'_>, position: usize, bit: u8) -> Result<bool> {
    input.read_boolean_bit_at(position, bit)
}

macro_rules! primitive_readers {
    ($($ty:ty: $read:ident, $read_nullable:ident, $read_array:ident, $read_array_nullable:ident,
        $fixed:expr, $array_codec:expr;)*) => {
        $(
            fn $read(&mut self, name: &str) -> Result<$ty> {
                self.read_primitive(name, stringify!($read), stringify!($read_nullable), $fixed)
            }

            fn $read_nullable(&mut self, name: &str) -> Result<Option<$ty>> {
                self.read_nullable(name, $fixed)
            }

            fn $read_array(&mut self, name: &str) -> Result<Option<Vec<$ty>>> {
                self.read_array(name, stringify!($read_array), stringify!($read_array_nullable), $array_codec)
            }

            fn $read_array_nullable(&mut self, name: &str) -> Result<Option<Vec<Option<$ty>>>> {
                self.read_array_of_nullable(name, $array_codec)
            }
        )*
    };
}

macro_rules! value_readers {
    ($($read:ident, $read_array:ident: $ty:ty, $kind:ident, $array_kind:ident, $codec:path;)*) => {
        $(
            fn $read(&mut self, name: &str) -> Result<Option<$ty>> {
                self.read_variable_size(name, FieldKind::$kind, |r| $codec(&mut r.input))
            }

            fn $read_array(&mut self, name: &str) -> Result<Option<Vec<Option<$ty>>>> {
                self.read_array_of_variable_size(name, FieldKind::$array_kind, |r| $codec(&mut r.input))
            }
        )*
    };
}

impl CompactReader for DefaultCompactReader<'_, '_> {
    fn get_field_kind(&self, name: &str) -> FieldKind {
        self.schema.field_kind(name).unwrap_or(FieldKind::NotAvailable)
    }

    primitive_readers! {
        bool: read_boolean, read_nullable_boolean, read_array_of_boolean, read_array_of_nullable_boolean,
            boolean_bit, io::read_boolean_bits;
        i8: read_int8, read_nullable_int8, read_array_of_int8, read_array_of_nullable_int8,
            fixed::<i8>, io::read_primitive_array::<i8>;
        i16: read_int16, read_nullable_int16, read_array_of_int16, read_array_of_nullable_int16,
            fixed::<i16>, io::read_primitive_array::<i16>;
        i32: read_int32, read_nullable_int32, read_array_of_int32, read_array_of_nullable_int32,
            fixed::<i32>, io::read_primitive_array::<i32>;
        i64: read_int64, read_nullable_int64, read_array_of_int64, read_array_of_nullable_int64,
            fixed::<i64>, io::read_primitive_array::<i64>;
        f32: read_float32, read_nullable_float32, read_array_of_float32, read_array_of_nullable_float32,
            fixed::<f32>, io::read_primitive_array::<f32>;
        f64: read_float64, read_nullable_float64, read_array_of_float64, read_array_of_nullable_float64,
            fixed::<f64>, io::read_primitive_array::<f64>;
    }

    fn read_string(&mut self, name: &str) -> Result<Option<String>> {
        self.read_variable_size(name, FieldKind::String, |r| r.input.read_string())
    }

    fn read_array_of_string(&mut self, name: &str) -> Result<Option<Vec<Option<String>>>> {
        self.read_array_of_variable_size(name, FieldKind::ArrayOfString, |r| r.input.read_string())
    }

    value_readers! {
        read_decimal, read_array_of_decimal: Decimal, Decimal, ArrayOfDecimal, io::read_decimal;
        read_time, read_array_of_time: NaiveTime, Time, ArrayOfTime, io::read_time;
        read_date, read_array_of_date: NaiveDate, Date, ArrayOfDate, io::read_date;
        read_timestamp, read_array_of_timestamp: NaiveDateTime, Timestamp, ArrayOfTimestamp, io::read_timestamp;
        read_timestamp_with_timezone, read_array_of_timestamp_with_timezone:
            DateTime<FixedOffset>, TimestampWithTimezone, ArrayOfTimestampWithTimezone, io::read_timestamp_with_timezone;
    }

    fn read_compact_object(&mut self, name: &str) -> Result<Option<Box<dyn Any + Send + Sync>>> {
        let serializer = self.serializer;
        self.read_variable_size(name, FieldKind::Compact, |r| serializer.read_any(&mut r.input))
    }

    fn read_generic_record(&mut self, name: &str) -> Result<Option<GenericRecord>> {
        let serializer = self.serializer;
        self.read_variable_size(name, FieldKind::Compact, |r| serializer.read_generic_record(&mut r.input))
    }

    fn read_array_of_compact_objects(&mut self, name: &str) -> Result<Option<Vec<Option<Box<dyn Any + Send + Sync>>>>> {
        let serializer = self.serializer;
        self.read_array_of_variable_size(name, FieldKind::ArrayOfCompact, |r| serializer.read_any(&mut r.input))
    }

    fn read_array_of_generic_record(&mut self, name: &str) -> Result<Option<Vec<Option<GenericRecord>>>> {
        let serializer = self.serializer;
        self.read_array_of_variable_size(name, FieldKind::ArrayOfCompact, |r| {
            serializer.read_generic_record(&mut r.input)
        })
    }
}
