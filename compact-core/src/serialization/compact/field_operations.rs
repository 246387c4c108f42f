//! Per-kind operations used by generic records: read, write and value validation.
//!
//! One table entry per field kind replaces the kind switches that generic
//! record encoding, decoding and validation would otherwise repeat.

use super::generic_record::{FieldValue, GenericRecord};
use super::schema::Schema;
use super::{CompactReader, CompactWriter, FieldKind};
use crate::error::{CompactError, Result};

/// Operations available for one field kind.
#[derive(Debug)]
pub struct FieldOperations {
    /// The kind these operations handle.
    pub kind: FieldKind,
    /// Reads the field from a reader as a [`FieldValue`] of this kind.
    pub read: fn(&mut dyn CompactReader, &str) -> Result<FieldValue>,
    /// Writes a value, already validated for this kind, to a writer.
    pub write: fn(&mut dyn CompactWriter, &str, &FieldValue) -> Result<()>,
    /// Checks that a value fits this kind and converts it to the kind's variant.
    pub validate: fn(&str, FieldKind, FieldValue) -> Result<FieldValue>,
}

impl FieldOperations {
    /// Fixed wire width of the kind, or [`VARIABLE_SIZE`](super::VARIABLE_SIZE).
    pub fn size_in_bytes(&self) -> i32 {
        self.kind.size_in_bytes()
    }
}

pub(crate) fn unknown_field(name: &str, schema: &Schema) -> CompactError {
    CompactError::Serialization(format!(
        "No field with the name '{}' in compact schema {}; use read_or_default to supply a value for fields that may be absent",
        name, schema
    ))
}

pub(crate) fn mismatched_kind(name: &str, requested: FieldKind, actual: FieldKind) -> CompactError {
    CompactError::Serialization(format!(
        "Mismatched field kinds while reading a compact field: Requested field kind for {} is {} but the field's actual type is {}",
        name, requested, actual
    ))
}

pub(crate) fn kind_not_one_of(name: &str, expected: &[FieldKind], actual: FieldKind) -> CompactError {
    let expected: Vec<&str> = expected.iter().map(|k| k.name()).collect();
    CompactError::Serialization(format!(
        "The kind of field {} must be one of {} but it is {}",
        name,
        expected.join(", "),
        actual
    ))
}

pub(crate) fn unexpected_null(name: &str, method: &str, nullable_method: &str) -> CompactError {
    CompactError::Serialization(format!(
        "Error while reading {}. null value can not be read via {} methods. Use {} instead.",
        name, method, nullable_method
    ))
}

fn value_mismatch(name: &str, kind: FieldKind, value: &FieldValue) -> CompactError {
    CompactError::Type(format!(
        "Expected a value of kind {} for field {}, but got a value of kind {}",
        kind,
        name,
        value.kind()
    ))
}

fn null_not_allowed(name: &str, kind: FieldKind) -> CompactError {
    CompactError::Type(format!(
        "Expected a non-null value of kind {} for field {}",
        kind, name
    ))
}

fn null_item_not_allowed(name: &str, kind: FieldKind, index: usize) -> CompactError {
    CompactError::Type(format!(
        "Expected a non-null element at index {} of field {} of kind {}",
        index, name, kind
    ))
}

fn out_of_range(name: &str, kind: FieldKind, value: i64) -> CompactError {
    CompactError::Range(format!(
        "Generic field {} of kind {} can not hold {}: value out of range",
        name, kind, value
    ))
}

fn narrow<T: TryFrom<i64>>(name: &str, kind: FieldKind, value: i64) -> Result<T> {
    T::try_from(value).map_err(|_| out_of_range(name, kind, value))
}

/// Converts to `f32` only when the value survives the round trip; NaN passes.
fn narrow_float(name: &str, kind: FieldKind, value: f64) -> Result<f32> {
    let narrowed = value as f32;
    if f64::from(narrowed) == value || value.is_nan() {
        Ok(narrowed)
    } else {
        Err(CompactError::Range(format!(
            "Generic field {} of kind {} can not hold {} without losing precision",
            name, kind, value
        )))
    }
}

fn validate_exact(name: &str, kind: FieldKind, value: FieldValue) -> Result<FieldValue> {
    if value.kind() == kind {
        Ok(value)
    } else {
        Err(value_mismatch(name, kind, &value))
    }
}

fn validate_unsupported(name: &str, kind: FieldKind, _value: FieldValue) -> Result<FieldValue> {
    kind.ensure_supported(name)?;
    Err(CompactError::UnsupportedOperation(format!(
        "field {} has kind {}, which generic records can not hold",
        name, kind
    )))
}

/// Any integer variant, nullable or not.
fn integer_of(value: &FieldValue) -> Option<Option<i64>> {
    Some(match *value {
        FieldValue::Int8(v) => Some(v.into()),
        FieldValue::Int16(v) => Some(v.into()),
        FieldValue::Int32(v) => Some(v.into()),
        FieldValue::Int64(v) => Some(v),
        FieldValue::NullableInt8(v) => v.map(i64::from),
        FieldValue::NullableInt16(v) => v.map(i64::from),
        FieldValue::NullableInt32(v) => v.map(i64::from),
        FieldValue::NullableInt64(v) => v,
        _ => return None,
    })
}

fn validate_integer(name: &str, kind: FieldKind, value: FieldValue) -> Result<FieldValue> {
    let v = integer_of(&value).ok_or_else(|| value_mismatch(name, kind, &value))?;
    let non_null = || v.ok_or_else(|| null_not_allowed(name, kind));
    Ok(match kind {
        FieldKind::Int8 => FieldValue::Int8(narrow(name, kind, non_null()?)?),
        FieldKind::Int16 => FieldValue::Int16(narrow(name, kind, non_null()?)?),
        FieldKind::Int32 => FieldValue::Int32(narrow(name, kind, non_null()?)?),
        FieldKind::Int64 => FieldValue::Int64(non_null()?),
        FieldKind::NullableInt8 => FieldValue::NullableInt8(v.map(|v| narrow(name, kind, v)).transpose()?),
        FieldKind::NullableInt16 => FieldValue::NullableInt16(v.map(|v| narrow(name, kind, v)).transpose()?),
        FieldKind::NullableInt32 => FieldValue::NullableInt32(v.map(|v| narrow(name, kind, v)).transpose()?),
        FieldKind::NullableInt64 => FieldValue::NullableInt64(v),
        _ => return Err(value_mismatch(name, kind, &value)),
    })
}

/// Items of any integer array variant, nullable or not.
fn integer_items_of(value: &FieldValue) -> Option<Option<Vec<Option<i64>>>> {
    fn widen<T: Copy + Into<i64>>(items: &Option<Vec<T>>) -> Option<Vec<Option<i64>>> {
        items.as_ref().map(|items| items.iter().map(|&v| Some(v.into())).collect())
    }
    fn widen_nullable<T: Copy + Into<i64>>(items: &Option<Vec<Option<T>>>) -> Option<Vec<Option<i64>>> {
        items
            .as_ref()
            .map(|items| items.iter().map(|v| v.map(Into::into)).collect())
    }
    Some(match value {
        FieldValue::ArrayOfInt8(items) => widen(items),
        FieldValue::ArrayOfInt16(items) => widen(items),
        FieldValue::ArrayOfInt32(items) => widen(items),
        FieldValue::ArrayOfInt64(items) => widen(items),
        FieldValue::ArrayOfNullableInt8(items) => widen_nullable(items),
        FieldValue::ArrayOfNullableInt16(items) => widen_nullable(items),
        FieldValue::ArrayOfNullableInt32(items) => widen_nullable(items),
        FieldValue::ArrayOfNullableInt64(items) => widen_nullable(items),
        _ => return None,
    })
}

fn narrow_items<T: TryFrom<i64>>(name: &str, kind: FieldKind, items: &[Option<i64>]) -> Result<Vec<T>> {
    items
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let v = v.ok_or_else(|| null_item_not_allowed(name, kind, i))?;
            narrow(name, kind, v)
        })
        .collect()
}

fn narrow_nullable_items<T: TryFrom<i64>>(
    name: &str,
    kind: FieldKind,
    items: &[Option<i64>],
) -> Result<Vec<Option<T>>> {
    items
        .iter()
        .map(|v| v.map(|v| narrow(name, kind, v)).transpose())
        .collect()
}

fn validate_integer_array(name: &str, kind: FieldKind, value: FieldValue) -> Result<FieldValue> {
    let items = integer_items_of(&value).ok_or_else(|| value_mismatch(name, kind, &value))?;
    let items = items.as_deref();
    Ok(match kind {
        FieldKind::ArrayOfInt8 => FieldValue::ArrayOfInt8(items.map(|i| narrow_items(name, kind, i)).transpose()?),
        FieldKind::ArrayOfInt16 => FieldValue::ArrayOfInt16(items.map(|i| narrow_items(name, kind, i)).transpose()?),
        FieldKind::ArrayOfInt32 => FieldValue::ArrayOfInt32(items.map(|i| narrow_items(name, kind, i)).transpose()?),
        FieldKind::ArrayOfInt64 => FieldValue::ArrayOfInt64(items.map(|i| narrow_items(name, kind, i)).transpose()?),
        FieldKind::ArrayOfNullableInt8 => {
            FieldValue::ArrayOfNullableInt8(items.map(|i| narrow_nullable_items(name, kind, i)).transpose()?)
        }
        FieldKind::ArrayOfNullableInt16 => {
            FieldValue::ArrayOfNullableInt16(items.map(|i| narrow_nullable_items(name, kind, i)).transpose()?)
        }
        FieldKind::ArrayOfNullableInt32 => {
            FieldValue::ArrayOfNullableInt32(items.map(|i| narrow_nullable_items(name, kind, i)).transpose()?)
        }
        FieldKind::ArrayOfNullableInt64 => {
            FieldValue::ArrayOfNullableInt64(items.map(|i| narrow_nullable_items(name, kind, i)).transpose()?)
        }
        _ => return Err(value_mismatch(name, kind, &value)),
    })
}

fn validate_float(name: &str, kind: FieldKind, value: FieldValue) -> Result<FieldValue> {
    let v = match value {
        FieldValue::Float32(v) => Some(f64::from(v)),
        FieldValue::Float64(v) => Some(v),
        FieldValue::NullableFloat32(v) => v.map(f64::from),
        FieldValue::NullableFloat64(v) => v,
        ref other => return Err(value_mismatch(name, kind, other)),
    };
    let non_null = || v.ok_or_else(|| null_not_allowed(name, kind));
    Ok(match kind {
        FieldKind::Float32 => FieldValue::Float32(narrow_float(name, kind, non_null()?)?),
        FieldKind::Float64 => FieldValue::Float64(non_null()?),
        FieldKind::NullableFloat32 => {
            FieldValue::NullableFloat32(v.map(|v| narrow_float(name, kind, v)).transpose()?)
        }
        FieldKind::NullableFloat64 => FieldValue::NullableFloat64(v),
        _ => return Err(value_mismatch(name, kind, &value)),
    })
}

fn validate_float_array(name: &str, kind: FieldKind, value: FieldValue) -> Result<FieldValue> {
    let items: Option<Vec<Option<f64>>> = match &value {
        FieldValue::ArrayOfFloat32(items) => items
            .as_ref()
            .map(|items| items.iter().map(|&v| Some(f64::from(v))).collect()),
        FieldValue::ArrayOfFloat64(items) => items.as_ref().map(|items| items.iter().map(|&v| Some(v)).collect()),
        FieldValue::ArrayOfNullableFloat32(items) => items
            .as_ref()
            .map(|items| items.iter().map(|v| v.map(f64::from)).collect()),
        FieldValue::ArrayOfNullableFloat64(items) => items.clone(),
        other => return Err(value_mismatch(name, kind, other)),
    };
    let non_null = |items: Vec<Option<f64>>| -> Result<Vec<f64>> {
        items
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.ok_or_else(|| null_item_not_allowed(name, kind, i)))
            .collect()
    };
    Ok(match kind {
        FieldKind::ArrayOfFloat32 => FieldValue::ArrayOfFloat32(
            items
                .map(non_null)
                .transpose()?
                .map(|items| items.into_iter().map(|v| narrow_float(name, kind, v)).collect::<Result<_>>())
                .transpose()?,
        ),
        FieldKind::ArrayOfFloat64 => FieldValue::ArrayOfFloat64(items.map(non_null).transpose()?),
        FieldKind::ArrayOfNullableFloat32 => FieldValue::ArrayOfNullableFloat32(
            items
                .map(|items| {
                    items
                        .into_iter()
                        .map(|v| v.map(|v| narrow_float(name, kind, v)).transpose())
                        .collect::<Result<_>>()
                })
                .transpose()?,
        ),
        FieldKind::ArrayOfNullableFloat64 => FieldValue::ArrayOfNullableFloat64(items),
        _ => return Err(value_mismatch(name, kind, &value)),
    })
}

fn validate_boolean(name: &str, kind: FieldKind, value: FieldValue) -> Result<FieldValue> {
    let v = match value {
        FieldValue::Boolean(v) => Some(v),
        FieldValue::NullableBoolean(v) => v,
        ref other => return Err(value_mismatch(name, kind, other)),
    };
    Ok(match kind {
        FieldKind::Boolean => FieldValue::Boolean(v.ok_or_else(|| null_not_allowed(name, kind))?),
        FieldKind::NullableBoolean => FieldValue::NullableBoolean(v),
        _ => return Err(value_mismatch(name, kind, &value)),
    })
}

fn validate_boolean_array(name: &str, kind: FieldKind, value: FieldValue) -> Result<FieldValue> {
    Ok(match (kind, value) {
        (FieldKind::ArrayOfBoolean, v @ FieldValue::ArrayOfBoolean(_)) => v,
        (FieldKind::ArrayOfNullableBoolean, v @ FieldValue::ArrayOfNullableBoolean(_)) => v,
        (FieldKind::ArrayOfBoolean, FieldValue::ArrayOfNullableBoolean(items)) => FieldValue::ArrayOfBoolean(
            items
                .map(|items| {
                    items
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| v.ok_or_else(|| null_item_not_allowed(name, kind, i)))
                        .collect::<Result<Vec<_>>>()
                })
                .transpose()?,
        ),
        (FieldKind::ArrayOfNullableBoolean, FieldValue::ArrayOfBoolean(items)) => {
            FieldValue::ArrayOfNullableBoolean(items.map(|items| items.into_iter().map(Some).collect()))
        }
        (_, other) => return Err(value_mismatch(name, kind, &other)),
    })
}

fn validate_compact_array(name: &str, kind: FieldKind, value: FieldValue) -> Result<FieldValue> {
    let value = validate_exact(name, kind, value)?;
    if let FieldValue::ArrayOfCompact(Some(items)) = &value {
        check_single_schema(items.iter().flatten())?;
    }
    Ok(value)
}

/// Fails if the records do not all share one schema.
pub(crate) fn check_single_schema<'a>(records: impl IntoIterator<Item = &'a GenericRecord>) -> Result<()> {
    let mut expected: Option<&Schema> = None;
    for record in records {
        let schema = record.schema();
        match expected {
            None => expected = Some(schema),
            Some(first) if first.schema_id() != schema.schema_id() => {
                return Err(CompactError::Serialization(format!(
                    "It is not allowed to serialize an array of Compact serializable GenericRecord objects containing different schemas. Expected array item schema: {}, current schema: {}",
                    first, schema
                )))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn read_unsupported(_reader: &mut dyn CompactReader, name: &str) -> Result<FieldValue> {
    Err(CompactError::UnsupportedOperation(format!(
        "field {} has a kind Compact can not read",
        name
    )))
}

fn write_unsupported(_writer: &mut dyn CompactWriter, name: &str, _value: &FieldValue) -> Result<()> {
    Err(CompactError::UnsupportedOperation(format!(
        "field {} has a kind Compact can not write",
        name
    )))
}

macro_rules! kind_operations {
    ($($module:ident: $kind:ident, $read:ident, $write:ident, |$v:ident| $arg:expr, $validate:ident;)*) => {
        $(
            mod $module {
                use super::*;

                fn read(reader: &mut dyn CompactReader, name: &str) -> Result<FieldValue> {
                    Ok(FieldValue::$kind(reader.$read(name)?))
                }

                fn write(writer: &mut dyn CompactWriter, name: &str, value: &FieldValue) -> Result<()> {
                    match value {
                        FieldValue::$kind($v) => writer.$write(name, $arg),
                        other => Err(value_mismatch(name, FieldKind::$kind, other)),
                    }
                }

                pub(super) const OPERATIONS: FieldOperations = FieldOperations {
                    kind: FieldKind::$kind,
                    read,
                    write,
                    validate: $validate,
                };
            }
        )*
    };
}

kind_operations! {
    boolean: Boolean, read_boolean, write_boolean, |v| *v, validate_boolean;
    array_of_boolean: ArrayOfBoolean, read_array_of_boolean, write_array_of_boolean, |v| v.as_deref(), validate_boolean_array;
    int8: Int8, read_int8, write_int8, |v| *v, validate_integer;
    array_of_int8: ArrayOfInt8, read_array_of_int8, write_array_of_int8, |v| v.as_deref(), validate_integer_array;
    int16: Int16, read_int16, write_int16, |v| *v, validate_integer;
    array_of_int16: ArrayOfInt16, read_array_of_int16, write_array_of_int16, |v| v.as_deref(), validate_integer_array;
    int32: Int32, read_int32, write_int32, |v| *v, validate_integer;
    array_of_int32: ArrayOfInt32, read_array_of_int32, write_array_of_int32, |v| v.as_deref(), validate_integer_array;
    int64: Int64, read_int64, write_int64, |v| *v, validate_integer;
    array_of_int64: ArrayOfInt64, read_array_of_int64, write_array_of_int64, |v| v.as_deref(), validate_integer_array;
    float32: Float32, read_float32, write_float32, |v| *v, validate_float;
    array_of_float32: ArrayOfFloat32, read_array_of_float32, write_array_of_float32, |v| v.as_deref(), validate_float_array;
    float64: Float64, read_float64, write_float64, |v| *v, validate_float;
    array_of_float64: ArrayOfFloat64, read_array_of_float64, write_array_of_float64, |v| v.as_deref(), validate_float_array;
    string: String, read_string, write_string, |v| v.as_deref(), validate_exact;
    array_of_string: ArrayOfString, read_array_of_string, write_array_of_string, |v| v.as_deref(), validate_exact;
    decimal: Decimal, read_decimal, write_decimal, |v| *v, validate_exact;
    array_of_decimal: ArrayOfDecimal, read_array_of_decimal, write_array_of_decimal, |v| v.as_deref(), validate_exact;
    time: Time, read_time, write_time, |v| *v, validate_exact;
    array_of_time: ArrayOfTime, read_array_of_time, write_array_of_time, |v| v.as_deref(), validate_exact;
    date: Date, read_date, write_date, |v| *v, validate_exact;
    array_of_date: ArrayOfDate, read_array_of_date, write_array_of_date, |v| v.as_deref(), validate_exact;
    timestamp: Timestamp, read_timestamp, write_timestamp, |v| *v, validate_exact;
    array_of_timestamp: ArrayOfTimestamp, read_array_of_timestamp, write_array_of_timestamp, |v| v.as_deref(), validate_exact;
    timestamp_with_timezone: TimestampWithTimezone, read_timestamp_with_timezone, write_timestamp_with_timezone, |v| *v, validate_exact;
    array_of_timestamp_with_timezone: ArrayOfTimestampWithTimezone, read_array_of_timestamp_with_timezone, write_array_of_timestamp_with_timezone, |v| v.as_deref(), validate_exact;
    compact: Compact, read_generic_record, write_generic_record, |v| v.as_ref(), validate_exact;
    array_of_compact: ArrayOfCompact, read_array_of_generic_record, write_array_of_generic_record, |v| v.as_deref(), validate_compact_array;
    nullable_boolean: NullableBoolean, read_nullable_boolean, write_nullable_boolean, |v| *v, validate_boolean;
    array_of_nullable_boolean: ArrayOfNullableBoolean, read_array_of_nullable_boolean, write_array_of_nullable_boolean, |v| v.as_deref(), validate_boolean_array;
    nullable_int8: NullableInt8, read_nullable_int8, write_nullable_int8, |v| *v, validate_integer;
    array_of_nullable_int8: ArrayOfNullableInt8, read_array_of_nullable_int8, write_array_of_nullable_int8, |v| v.as_deref(), validate_integer_array;
    nullable_int16: NullableInt16, read_nullable_int16, write_nullable_int16, |v| *v, validate_integer;
    array_of_nullable_int16: ArrayOfNullableInt16, read_array_of_nullable_int16, write_array_of_nullable_int16, |v| v.as_deref(), validate_integer_array;
    nullable_int32: NullableInt32, read_nullable_int32, write_nullable_int32, |v| *v, validate_integer;
    array_of_nullable_int32: ArrayOfNullableInt32, read_array_of_nullable_int32, write_array_of_nullable_int32, |v| v.as_deref(), validate_integer_array;
    nullable_int64: NullableInt64, read_nullable_int64, write_nullable_int64, |v| *v, validate_integer;
    array_of_nullable_int64: ArrayOfNullableInt64, read_array_of_nullable_int64, write_array_of_nullable_int64, |v| v.as_deref(), validate_integer_array;
    nullable_float32: NullableFloat32, read_nullable_float32, write_nullable_float32, |v| *v, validate_float;
    array_of_nullable_float32: ArrayOfNullableFloat32, read_array_of_nullable_float32, write_array_of_nullable_float32, |v| v.as_deref(), validate_float_array;
    nullable_float64: NullableFloat64, read_nullable_float64, write_nullable_float64, |v| *v, validate_float;
    array_of_nullable_float64: ArrayOfNullableFloat64, read_array_of_nullable_float64, write_array_of_nullable_float64, |v| v.as_deref(), validate_float_array;
}

macro_rules! unsupported_operations {
    ($($name:ident: $kind:ident;)*) => {
        $(
            const $name: FieldOperations = FieldOperations {
                kind: FieldKind::$kind,
                read: read_unsupported,
                write: write_unsupported,
                validate: validate_unsupported,
            };
        )*
    };
}

unsupported_operations! {
    NOT_AVAILABLE: NotAvailable;
    CHAR: Char;
    ARRAY_OF_CHAR: ArrayOfChar;
    PORTABLE: Portable;
    ARRAY_OF_PORTABLE: ArrayOfPortable;
}

static OPERATIONS: [FieldOperations; 47] = [
    NOT_AVAILABLE,
    boolean::OPERATIONS,
    array_of_boolean::OPERATIONS,
    int8::OPERATIONS,
    array_of_int8::OPERATIONS,
    CHAR,
    ARRAY_OF_CHAR,
    int16::OPERATIONS,
    array_of_int16::OPERATIONS,
    int32::OPERATIONS,
    array_of_int32::OPERATIONS,
    int64::OPERATIONS,
    array_of_int64::OPERATIONS,
    float32::OPERATIONS,
    array_of_float32::OPERATIONS,
    float64::OPERATIONS,
    array_of_float64::OPERATIONS,
    string::OPERATIONS,
    array_of_string::OPERATIONS,
    decimal::OPERATIONS,
    array_of_decimal::OPERATIONS,
    time::OPERATIONS,
    array_of_time::OPERATIONS,
    date::OPERATIONS,
    array_of_date::OPERATIONS,
    timestamp::OPERATIONS,
    array_of_timestamp::OPERATIONS,
    timestamp_with_timezone::OPERATIONS,
    array_of_timestamp_with_timezone::OPERATIONS,
    compact::OPERATIONS,
    array_of_compact::OPERATIONS,
    PORTABLE,
    ARRAY_OF_PORTABLE,
    nullable_boolean::OPERATIONS,
    array_of_nullable_boolean::OPERATIONS,
    nullable_int8::OPERATIONS,
    array_of_nullable_int8::OPERATIONS,
    nullable_int16::OPERATIONS,
    array_of_nullable_int16::OPERATIONS,
    nullable_int32::OPERATIONS,
    array_of_nullable_int32::OPERATIONS,
    nullable_int64::OPERATIONS,
    array_of_nullable_int64::OPERATIONS,
    nullable_float32::OPERATIONS,
    array_of_nullable_float32::OPERATIONS,
    nullable_float64::OPERATIONS,
    array_of_nullable_float64::OPERATIONS,
];

/// Returns the operations of a field kind.
pub fn field_operations(kind: FieldKind) -> &'static FieldOperations {
    &OPERATIONS[kind.id() as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_kind_id() {
        for kind in FieldKind::ALL {
            assert_eq!(field_operations(kind).kind, kind);
            assert_eq!(field_operations(kind).size_in_bytes(), kind.size_in_bytes());
        }
    }

    #[test]
    fn test_integer_widening_and_narrowing() {
        let ops = field_operations(FieldKind::Int8);
        let v = (ops.validate)("age", FieldKind::Int8, FieldValue::Int64(23)).unwrap();
        assert_eq!(v, FieldValue::Int8(23));

        let v = (ops.validate)("age", FieldKind::Int8, FieldValue::NullableInt32(Some(-128))).unwrap();
        assert_eq!(v, FieldValue::Int8(-128));
    }

    #[test]
    fn test_integer_out_of_range_is_range_error() {
        let ops = field_operations(FieldKind::Int16);
        let err = (ops.validate)("n", FieldKind::Int16, FieldValue::Int32(40_000)).unwrap_err();
        assert!(matches!(err, CompactError::Range(_)));

        let ops = field_operations(FieldKind::ArrayOfNullableInt8);
        let err = (ops.validate)(
            "n",
            FieldKind::ArrayOfNullableInt8,
            FieldValue::ArrayOfInt32(Some(vec![1, 300])),
        )
        .unwrap_err();
        assert!(matches!(err, CompactError::Range(_)));
    }

    #[test]
    fn test_wrong_variant_is_type_error() {
        let ops = field_operations(FieldKind::Int32);
        let err = (ops.validate)("n", FieldKind::Int32, FieldValue::String(Some("1".into()))).unwrap_err();
        assert!(matches!(err, CompactError::Type(_)));

        let ops = field_operations(FieldKind::String);
        let err = (ops.validate)("s", FieldKind::String, FieldValue::Int32(1)).unwrap_err();
        assert!(matches!(err, CompactError::Type(_)));
    }

    #[test]
    fn test_null_for_primitive_is_type_error() {
        let ops = field_operations(FieldKind::Int32);
        let err = (ops.validate)("n", FieldKind::Int32, FieldValue::NullableInt32(None)).unwrap_err();
        assert!(matches!(err, CompactError::Type(_)));

        let ops = field_operations(FieldKind::ArrayOfBoolean);
        let err = (ops.validate)(
            "b",
            FieldKind::ArrayOfBoolean,
            FieldValue::ArrayOfNullableBoolean(Some(vec![Some(true), None])),
        )
        .unwrap_err();
        assert!(matches!(err, CompactError::Type(_)));
    }

    #[test]
    fn test_float_conversions() {
        let ops = field_operations(FieldKind::ArrayOfFloat32);
        let v = (ops.validate)(
            "f",
            FieldKind::ArrayOfFloat32,
            FieldValue::ArrayOfNullableFloat64(Some(vec![Some(1.5)])),
        )
        .unwrap();
        assert_eq!(v, FieldValue::ArrayOfFloat32(Some(vec![1.5])));

        let ops = field_operations(FieldKind::NullableFloat64);
        let v = (ops.validate)("f", FieldKind::NullableFloat64, FieldValue::Float32(0.5)).unwrap();
        assert_eq!(v, FieldValue::NullableFloat64(Some(0.5)));
    }

    #[test]
    fn test_float32_rejects_precision_loss() {
        let ops = field_operations(FieldKind::Float32);
        let err = (ops.validate)("f", FieldKind::Float32, FieldValue::Float64(0.1)).unwrap_err();
        assert!(matches!(err, CompactError::Range(_)));
        assert!(err.to_string().contains("without losing precision"));

        let v = (ops.validate)("f", FieldKind::Float32, FieldValue::Float64(f64::INFINITY)).unwrap();
        assert_eq!(v, FieldValue::Float32(f32::INFINITY));

        let ops = field_operations(FieldKind::ArrayOfNullableFloat32);
        let err = (ops.validate)(
            "f",
            FieldKind::ArrayOfNullableFloat32,
            FieldValue::ArrayOfFloat64(Some(vec![0.25, 1e300])),
        )
        .unwrap_err();
        assert!(matches!(err, CompactError::Range(_)));
    }

    #[test]
    fn test_unsupported_kinds() {
        for kind in [FieldKind::Char, FieldKind::Portable, FieldKind::ArrayOfPortable] {
            let ops = field_operations(kind);
            let err = (ops.validate)("x", kind, FieldValue::Int32(1)).unwrap_err();
            assert!(matches!(err, CompactError::UnsupportedOperation(_)));
        }
    }

    #[test]
    fn test_kind_messages() {
        let err = mismatched_kind("name", FieldKind::String, FieldKind::Int32);
        assert_eq!(
            err.to_string(),
            "serialization error: Mismatched field kinds while reading a compact field: Requested field kind for name is STRING but the field's actual type is INT32"
        );
        let err = kind_not_one_of("age", &[FieldKind::Int32, FieldKind::NullableInt32], FieldKind::String);
        assert_eq!(
            err.to_string(),
            "serialization error: The kind of field age must be one of INT32, NULLABLE_INT32 but it is STRING"
        );
    }
}
