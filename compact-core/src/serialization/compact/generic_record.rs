//! Schema-carrying records for reading and writing Compact data without a Rust type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use super::field_operations::{field_operations, kind_not_one_of, mismatched_kind, unexpected_null};
use super::schema::Schema;
use super::schema_writer::SchemaWriter;
use super::FieldKind;
use crate::error::{CompactError, Result};

macro_rules! field_values {
    ($($kind:ident($ty:ty),)*) => {
        /// A value of a generic record field, tagged with its field kind.
        ///
        /// Variable-size and nullable values use `Option`, with `None` for null.
        #[allow(missing_docs)]
        #[derive(Debug, Clone, PartialEq)]
        pub enum FieldValue {
            $($kind($ty),)*
        }

        impl FieldValue {
            /// Returns the field kind this value is encoded as.
            pub fn kind(&self) -> FieldKind {
                match self {
                    $(Self::$kind(_) => FieldKind::$kind,)*
                }
            }
        }
    };
}

field_values! {
    Boolean(bool),
    ArrayOfBoolean(Option<Vec<bool>>),
    Int8(i8),
    ArrayOfInt8(Option<Vec<i8>>),
    Int16(i16),
    ArrayOfInt16(Option<Vec<i16>>),
    Int32(i32),
    ArrayOfInt32(Option<Vec<i32>>),
    Int64(i64),
    ArrayOfInt64(Option<Vec<i64>>),
    Float32(f32),
    ArrayOfFloat32(Option<Vec<f32>>),
    Float64(f64),
    ArrayOfFloat64(Option<Vec<f64>>),
    String(Option<String>),
    ArrayOfString(Option<Vec<Option<String>>>),
    Decimal(Option<Decimal>),
    ArrayOfDecimal(Option<Vec<Option<Decimal>>>),
    Time(Option<NaiveTime>),
    ArrayOfTime(Option<Vec<Option<NaiveTime>>>),
    Date(Option<NaiveDate>),
    ArrayOfDate(Option<Vec<Option<NaiveDate>>>),
    Timestamp(Option<NaiveDateTime>),
    ArrayOfTimestamp(Option<Vec<Option<NaiveDateTime>>>),
    TimestampWithTimezone(Option<DateTime<FixedOffset>>),
    ArrayOfTimestampWithTimezone(Option<Vec<Option<DateTime<FixedOffset>>>>),
    Compact(Option<GenericRecord>),
    ArrayOfCompact(Option<Vec<Option<GenericRecord>>>),
    NullableBoolean(Option<bool>),
    ArrayOfNullableBoolean(Option<Vec<Option<bool>>>),
    NullableInt8(Option<i8>),
    ArrayOfNullableInt8(Option<Vec<Option<i8>>>),
    NullableInt16(Option<i16>),
    ArrayOfNullableInt16(Option<Vec<Option<i16>>>),
    NullableInt32(Option<i32>),
    ArrayOfNullableInt32(Option<Vec<Option<i32>>>),
    NullableInt64(Option<i64>),
    ArrayOfNullableInt64(Option<Vec<Option<i64>>>),
    NullableFloat32(Option<f32>),
    ArrayOfNullableFloat32(Option<Vec<Option<f32>>>),
    NullableFloat64(Option<f64>),
    ArrayOfNullableFloat64(Option<Vec<Option<f64>>>),
}

fn tagged(type_name: &str, text: String) -> Value {
    let mut map = Map::new();
    map.insert("type".to_string(), Value::from(type_name));
    map.insert("data".to_string(), Value::from(text));
    Value::Object(map)
}

fn nullable<T>(value: &Option<T>, to_json: impl Fn(&T) -> Value) -> Value {
    value.as_ref().map_or(Value::Null, to_json)
}

fn items<T>(value: &Option<Vec<T>>, to_json: impl Fn(&T) -> Value) -> Value {
    value
        .as_ref()
        .map_or(Value::Null, |items| Value::Array(items.iter().map(to_json).collect()))
}

impl FieldValue {
    fn to_json(&self) -> Value {
        let decimal = |v: &Decimal| tagged("BigDecimal", v.to_string());
        let time = |v: &NaiveTime| tagged("LocalTime", v.to_string());
        let date = |v: &NaiveDate| tagged("LocalDate", v.to_string());
        let timestamp = |v: &NaiveDateTime| tagged("LocalDateTime", v.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
        let timestamp_tz = |v: &DateTime<FixedOffset>| tagged("OffsetDateTime", v.to_rfc3339());
        let record = |v: &GenericRecord| v.values_json();

        match self {
            Self::Boolean(v) => Value::from(*v),
            Self::Int8(v) => Value::from(*v),
            Self::Int16(v) => Value::from(*v),
            Self::Int32(v) => Value::from(*v),
            Self::Int64(v) => Value::from(*v),
            Self::Float32(v) => Value::from(*v),
            Self::Float64(v) => Value::from(*v),
            Self::NullableBoolean(v) => Value::from(*v),
            Self::NullableInt8(v) => Value::from(*v),
            Self::NullableInt16(v) => Value::from(*v),
            Self::NullableInt32(v) => Value::from(*v),
            Self::NullableInt64(v) => Value::from(*v),
            Self::NullableFloat32(v) => Value::from(*v),
            Self::NullableFloat64(v) => Value::from(*v),
            Self::ArrayOfBoolean(v) => Value::from(v.clone()),
            Self::ArrayOfInt8(v) => Value::from(v.clone()),
            Self::ArrayOfInt16(v) => Value::from(v.clone()),
            Self::ArrayOfInt32(v) => Value::from(v.clone()),
            Self::ArrayOfInt64(v) => Value::from(v.clone()),
            Self::ArrayOfFloat32(v) => Value::from(v.clone()),
            Self::ArrayOfFloat64(v) => Value::from(v.clone()),
            Self::ArrayOfNullableBoolean(v) => items(v, |v| Value::from(*v)),
            Self::ArrayOfNullableInt8(v) => items(v, |v| Value::from(*v)),
            Self::ArrayOfNullableInt16(v) => items(v, |v| Value::from(*v)),
            Self::ArrayOfNullableInt32(v) => items(v, |v| Value::from(*v)),
            Self::ArrayOfNullableInt64(v) => items(v, |v| Value::from(*v)),
            Self::ArrayOfNullableFloat32(v) => items(v, |v| Value::from(*v)),
            Self::ArrayOfNullableFloat64(v) => items(v, |v| Value::from(*v)),
            Self::String(v) => Value::from(v.clone()),
            Self::ArrayOfString(v) => items(v, |v| Value::from(v.clone())),
            Self::Decimal(v) => nullable(v, decimal),
            Self::ArrayOfDecimal(v) => items(v, |v| nullable(v, decimal)),
            Self::Time(v) => nullable(v, time),
            Self::ArrayOfTime(v) => items(v, |v| nullable(v, time)),
            Self::Date(v) => nullable(v, date),
            Self::ArrayOfDate(v) => items(v, |v| nullable(v, date)),
            Self::Timestamp(v) => nullable(v, timestamp),
            Self::ArrayOfTimestamp(v) => items(v, |v| nullable(v, timestamp)),
            Self::TimestampWithTimezone(v) => nullable(v, timestamp_tz),
            Self::ArrayOfTimestampWithTimezone(v) => items(v, |v| nullable(v, timestamp_tz)),
            Self::Compact(v) => nullable(v, record),
            Self::ArrayOfCompact(v) => items(v, |v| nullable(v, record)),
        }
    }
}

/// A Compact object held as a schema and a value per field.
///
/// Produced when decoding data whose type has no registered serializer, and
/// built by hand through [`GenericRecord::compact`] or
/// [`GenericRecordBuilder`] to write data without a Rust type.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericRecord {
    schema: Arc<Schema>,
    values: HashMap<String, FieldValue>,
}

impl GenericRecord {
    /// Creates a record of the given type from `(name, kind)` field declarations.
    ///
    /// Every declared field needs a value in `values`; values for undeclared
    /// names are ignored. Values are converted to the declared kind where that
    /// is lossless: integers are range checked, a 64-bit float fills a 32-bit
    /// kind only if it is exactly representable, and primitives fill their
    /// nullable kinds.
    pub fn compact<N: Into<String>>(
        type_name: impl Into<String>,
        fields: impl IntoIterator<Item = (N, FieldKind)>,
        mut values: HashMap<String, FieldValue>,
    ) -> Result<Self> {
        let fields: Vec<(String, FieldKind)> = fields.into_iter().map(|(name, kind)| (name.into(), kind)).collect();
        let mut writer = SchemaWriter::new(type_name);
        for (name, kind) in &fields {
            writer.add_field_kind(name, *kind)?;
        }
        let mut validated = HashMap::new();
        for (name, kind) in fields {
            let value = values.remove(&name).ok_or_else(|| {
                CompactError::Type(format!("No value is provided for the generic field {}", name))
            })?;
            let value = (field_operations(kind).validate)(&name, kind, value)?;
            validated.insert(name, value);
        }
        Ok(Self {
            schema: Arc::new(writer.build()),
            values: validated,
        })
    }

    /// Wraps values decoded against `schema`; they already match its kinds.
    pub(crate) fn from_parts(schema: Arc<Schema>, values: HashMap<String, FieldValue>) -> Self {
        Self { schema, values }
    }

    /// Returns a copy with some fields replaced.
    ///
    /// Fails with a range error if `overrides` names a field this record does
    /// not have. The copy keeps the schema of this record.
    pub fn clone_with(&self, overrides: HashMap<String, FieldValue>) -> Result<Self> {
        let mut values = self.values.clone();
        for (name, value) in overrides {
            let kind = self.schema.field_kind(&name).ok_or_else(|| {
                CompactError::Range(format!(
                    "Generic to be cloned does not have a field with name {}",
                    name
                ))
            })?;
            let value = (field_operations(kind).validate)(&name, kind, value)?;
            values.insert(name, value);
        }
        Ok(Self {
            schema: Arc::clone(&self.schema),
            values,
        })
    }

    /// Returns the schema of the record.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn schema_arc(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the Compact type name.
    pub fn type_name(&self) -> &str {
        self.schema.type_name()
    }

    /// Returns true if the schema has a field called `name`.
    pub fn has_field(&self, name: &str) -> bool {
        self.schema.has_field(name)
    }

    /// Returns field names in schema order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.schema.field_names()
    }

    /// Returns the kind of a field; fails with a range error for unknown names.
    pub fn get_field_kind(&self, name: &str) -> Result<FieldKind> {
        self.schema
            .field_kind(name)
            .ok_or_else(|| CompactError::Range(format!("There is no field named as {}", name)))
    }

    /// Returns the raw value of a field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    fn field_value(&self, name: &str, allowed: &[FieldKind]) -> Result<&FieldValue> {
        let value = self.values.get(name).ok_or_else(|| {
            CompactError::Serialization(format!(
                "Invalid field name: '{}' for schema {}",
                name, self.schema
            ))
        })?;
        let kind = value.kind();
        match allowed {
            [only] if *only != kind => Err(mismatched_kind(name, *only, kind)),
            _ if !allowed.contains(&kind) => Err(kind_not_one_of(name, allowed, kind)),
            _ => Ok(value),
        }
    }

    fn values_json(&self) -> Value {
        let map = self
            .schema
            .fields()
            .iter()
            .filter_map(|f| self.values.get(f.name()).map(|v| (f.name().to_string(), v.to_json())))
            .collect();
        Value::Object(map)
    }
}

macro_rules! primitive_getters {
    ($($ty:ty: $kind:ident, $nullable:ident, $array:ident, $array_nullable:ident =>
        $get:ident, $get_nullable:ident, $get_array:ident, $get_array_nullable:ident;)*) => {
        impl GenericRecord {
            $(
                /// Reads the field; also accepts its nullable kind and fails if the value is null.
                pub fn $get(&self, name: &str) -> Result<$ty> {
                    match self.field_value(name, &[FieldKind::$kind, FieldKind::$nullable])? {
                        FieldValue::$kind(v) => Ok(*v),
                        FieldValue::$nullable(v) => v.ok_or_else(|| {
                            unexpected_null(name, stringify!($get), stringify!($get_nullable))
                        }),
                        other => Err(mismatched_kind(name, FieldKind::$kind, other.kind())),
                    }
                }

                #[allow(missing_docs)]
                pub fn $get_nullable(&self, name: &str) -> Result<Option<$ty>> {
                    match self.field_value(name, &[FieldKind::$kind, FieldKind::$nullable])? {
                        FieldValue::$kind(v) => Ok(Some(*v)),
                        FieldValue::$nullable(v) => Ok(*v),
                        other => Err(mismatched_kind(name, FieldKind::$nullable, other.kind())),
                    }
                }

                /// Reads the array; also accepts the array-of-nullable kind and fails on a null item.
                pub fn $get_array(&self, name: &str) -> Result<Option<Vec<$ty>>> {
                    match self.field_value(name, &[FieldKind::$array, FieldKind::$array_nullable])? {
                        FieldValue::$array(v) => Ok(v.clone()),
                        FieldValue::$array_nullable(v) => v
                            .as_ref()
                            .map(|items| {
                                items
                                    .iter()
                                    .map(|item| {
                                        item.ok_or_else(|| {
                                            unexpected_null(name, stringify!($get_array), stringify!($get_array_nullable))
                                        })
                                    })
                                    .collect::<Result<Vec<_>>>()
                            })
                            .transpose(),
                        other => Err(mismatched_kind(name, FieldKind::$array, other.kind())),
                    }
                }

                #[allow(missing_docs)]
                pub fn $get_array_nullable(&self, name: &str) -> Result<Option<Vec<Option<$ty>>>> {
                    match self.field_value(name, &[FieldKind::$array, FieldKind::$array_nullable])? {
                        FieldValue::$array(v) => Ok(v.as_ref().map(|items| items.iter().map(|&v| Some(v)).collect())),
                        FieldValue::$array_nullable(v) => Ok(v.clone()),
                        other => Err(mismatched_kind(name, FieldKind::$array_nullable, other.kind())),
                    }
                }
            )*
        }
    };
}

primitive_getters! {
    bool: Boolean, NullableBoolean, ArrayOfBoolean, ArrayOfNullableBoolean =>
        get_boolean, get_nullable_boolean, get_array_of_boolean, get_array_of_nullable_boolean;
    i8: Int8, NullableInt8, ArrayOfInt8, ArrayOfNullableInt8 =>
        get_int8, get_nullable_int8, get_array_of_int8, get_array_of_nullable_int8;
    i16: Int16, NullableInt16, ArrayOfInt16, ArrayOfNullableInt16 =>
        get_int16, get_nullable_int16, get_array_of_int16, get_array_of_nullable_int16;
    i32: Int32, NullableInt32, ArrayOfInt32, ArrayOfNullableInt32 =>
        get_int32, get_nullable_int32, get_array_of_int32, get_array_of_nullable_int32;
    i64: Int64, NullableInt64, ArrayOfInt64, ArrayOfNullableInt64 =>
        get_int64, get_nullable_int64, get_array_of_int64, get_array_of_nullable_int64;
    f32: Float32, NullableFloat32, ArrayOfFloat32, ArrayOfNullableFloat32 =>
        get_float32, get_nullable_float32, get_array_of_float32, get_array_of_nullable_float32;
    f64: Float64, NullableFloat64, ArrayOfFloat64, ArrayOfNullableFloat64 =>
        get_float64, get_nullable_float64, get_array_of_float64, get_array_of_nullable_float64;
}

macro_rules! exact_getters {
    ($($get:ident: $kind:ident -> $ty:ty;)*) => {
        #[allow(missing_docs)]
        impl GenericRecord {
            $(
                pub fn $get(&self, name: &str) -> Result<$ty> {
                    match self.field_value(name, &[FieldKind::$kind])? {
                        FieldValue::$kind(v) => Ok(Clone::clone(v)),
                        other => Err(mismatched_kind(name, FieldKind::$kind, other.kind())),
                    }
                }
            )*
        }
    };
}

exact_getters! {
    get_string: String -> Option<String>;
    get_decimal: Decimal -> Option<Decimal>;
    get_time: Time -> Option<NaiveTime>;
    get_date: Date -> Option<NaiveDate>;
    get_timestamp: Timestamp -> Option<NaiveDateTime>;
    get_timestamp_with_timezone: TimestampWithTimezone -> Option<DateTime<FixedOffset>>;
    get_generic_record: Compact -> Option<GenericRecord>;
    get_array_of_string: ArrayOfString -> Option<Vec<Option<String>>>;
    get_array_of_decimal: ArrayOfDecimal -> Option<Vec<Option<Decimal>>>;
    get_array_of_time: ArrayOfTime -> Option<Vec<Option<NaiveTime>>>;
    get_array_of_date: ArrayOfDate -> Option<Vec<Option<NaiveDate>>>;
    get_array_of_timestamp: ArrayOfTimestamp -> Option<Vec<Option<NaiveDateTime>>>;
    get_array_of_timestamp_with_timezone: ArrayOfTimestampWithTimezone -> Option<Vec<Option<DateTime<FixedOffset>>>>;
    get_array_of_generic_record: ArrayOfCompact -> Option<Vec<Option<GenericRecord>>>;
}

/// Renders the record as JSON: `{"<type name>": {<field>: <value>, ...}}`.
impl fmt::Display for GenericRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut root = Map::new();
        root.insert(self.type_name().to_string(), self.values_json());
        write!(f, "{}", Value::Object(root))
    }
}

/// Builds a [`GenericRecord`] field by field.
///
/// # Example
///
/// ```
/// use compact_core::serialization::compact::GenericRecordBuilder;
///
/// let record = GenericRecordBuilder::compact("Employee")
///     .set_int32("age", 23)
///     .set_int64("id", 456)
///     .build()
///     .unwrap();
/// assert_eq!(record.get_int32("age").unwrap(), 23);
/// ```
#[derive(Debug, Clone)]
pub struct GenericRecordBuilder {
    type_name: String,
    fields: Vec<(String, FieldKind)>,
    values: HashMap<String, FieldValue>,
}

impl GenericRecordBuilder {
    /// Starts a record of the given Compact type name.
    pub fn compact(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            values: HashMap::new(),
        }
    }

    /// Adds a field whose kind is the kind of `value`.
    pub fn set(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        let name = name.into();
        self.fields.push((name.clone(), value.kind()));
        self.values.insert(name, value);
        self
    }

    /// Builds the record. Fails if a field name was set twice.
    pub fn build(self) -> Result<GenericRecord> {
        GenericRecord::compact(self.type_name, self.fields, self.values)
    }
}

macro_rules! setters {
    ($($set:ident: $kind:ident($ty:ty);)*) => {
        #[allow(missing_docs)]
        impl GenericRecordBuilder {
            $(
                pub fn $set(self, name: impl Into<String>, value: $ty) -> Self {
                    self.set(name, FieldValue::$kind(value))
                }
            )*
        }
    };
}

setters! {
    set_boolean: Boolean(bool);
    set_int8: Int8(i8);
    set_int16: Int16(i16);
    set_int32: Int32(i32);
    set_int64: Int64(i64);
    set_float32: Float32(f32);
    set_float64: Float64(f64);
    set_string: String(Option<String>);
    set_decimal: Decimal(Option<Decimal>);
    set_time: Time(Option<NaiveTime>);
    set_date: Date(Option<NaiveDate>);
    set_timestamp: Timestamp(Option<NaiveDateTime>);
    set_timestamp_with_timezone: TimestampWithTimezone(Option<DateTime<FixedOffset>>);
    set_generic_record: Compact(Option<GenericRecord>);
    set_nullable_boolean: NullableBoolean(Option<bool>);
    set_nullable_int8: NullableInt8(Option<i8>);
    set_nullable_int16: NullableInt16(Option<i16>);
    set_nullable_int32: NullableInt32(Option<i32>);
    set_nullable_int64: NullableInt64(Option<i64>);
    set_nullable_float32: NullableFloat32(Option<f32>);
    set_nullable_float64: NullableFloat64(Option<f64>);
    set_array_of_boolean: ArrayOfBoolean(Option<Vec<bool>>);
    set_array_of_int8: ArrayOfInt8(Option<Vec<i8>>);
    set_array_of_int16: ArrayOfInt16(Option<Vec<i16>>);
    set_array_of_int32: ArrayOfInt32(Option<Vec<i32>>);
    set_array_of_int64: ArrayOfInt64(Option<Vec<i64>>);
    set_array_of_float32: ArrayOfFloat32(Option<Vec<f32>>);
    set_array_of_float64: ArrayOfFloat64(Option<Vec<f64>>);
    set_array_of_string: ArrayOfString(Option<Vec<Option<String>>>);
    set_array_of_decimal: ArrayOfDecimal(Option<Vec<Option<Decimal>>>);
    set_array_of_time: ArrayOfTime(Option<Vec<Option<NaiveTime>>>);
    set_array_of_date: ArrayOfDate(Option<Vec<Option<NaiveDate>>>);
    set_array_of_timestamp: ArrayOfTimestamp(Option<Vec<Option<NaiveDateTime>>>);
    set_array_of_timestamp_with_timezone: ArrayOfTimestampWithTimezone(Option<Vec<Option<DateTime<FixedOffset>>>>);
    set_array_of_generic_record: ArrayOfCompact(Option<Vec<Option<GenericRecord>>>);
    set_array_of_nullable_boolean: ArrayOfNullableBoolean(Option<Vec<Option<bool>>>);
    set_array_of_nullable_int8: ArrayOfNullableInt8(Option<Vec<Option<i8>>>);
    set_array_of_nullable_int16: ArrayOfNullableInt16(Option<Vec<Option<i16>>>);
    set_array_of_nullable_int32: ArrayOfNullableInt32(Option<Vec<Option<i32>>>);
    set_array_of_nullable_int64: ArrayOfNullableInt64(Option<Vec<Option<i64>>>);
    set_array_of_nullable_float32: ArrayOfNullableFloat32(Option<Vec<Option<f32>>>);
    set_array_of_nullable_float64: ArrayOfNullableFloat64(Option<Vec<Option<f64>>>);
}
