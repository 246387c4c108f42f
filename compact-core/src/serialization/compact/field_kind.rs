//! Field kinds of the Compact format and their wire metadata.

use std::fmt;

use crate::error::{CompactError, Result};

/// Size marker returned by [`FieldKind::size_in_bytes`] for variable-size kinds.
pub const VARIABLE_SIZE: i32 = -1;

/// Field kind identifiers for Compact serialization.
///
/// The discriminants are wire constants shared with the cluster and with
/// clients in other languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i32)]
pub enum FieldKind {
    /// Returned when a schema has no field with the requested name.
    NotAvailable = 0,
    /// A boolean, stored as one bit of the fixed block.
    Boolean = 1,
    /// Array of boolean items.
    ArrayOfBoolean = 2,
    /// An 8-bit signed integer.
    Int8 = 3,
    /// Array of 8-bit signed integer items.
    ArrayOfInt8 = 4,
    /// Not supported by Compact.
    Char = 5,
    /// Not supported by Compact.
    ArrayOfChar = 6,
    /// A 16-bit signed integer.
    Int16 = 7,
    /// Array of 16-bit signed integer items.
    ArrayOfInt16 = 8,
    /// A 32-bit signed integer.
    Int32 = 9,
    /// Array of 32-bit signed integer items.
    ArrayOfInt32 = 10,
    /// A 64-bit signed integer.
    Int64 = 11,
    /// Array of 64-bit signed integer items.
    ArrayOfInt64 = 12,
    /// A 32-bit IEEE 754 float.
    Float32 = 13,
    /// Array of 32-bit IEEE 754 float items.
    ArrayOfFloat32 = 14,
    /// A 64-bit IEEE 754 float.
    Float64 = 15,
    /// Array of 64-bit IEEE 754 float items.
    ArrayOfFloat64 = 16,
    /// A UTF-8 string.
    String = 17,
    /// Array of UTF-8 string items.
    ArrayOfString = 18,
    /// An arbitrary precision decimal.
    Decimal = 19,
    /// Array of arbitrary precision decimal items.
    ArrayOfDecimal = 20,
    /// A local time of day.
    Time = 21,
    /// Array of local times.
    ArrayOfTime = 22,
    /// A local date.
    Date = 23,
    /// Array of local date items.
    ArrayOfDate = 24,
    /// A local date and time.
    Timestamp = 25,
    /// Array of local timestamps.
    ArrayOfTimestamp = 26,
    /// A date and time with a UTC offset.
    TimestampWithTimezone = 27,
    /// Array of timestamps with a UTC offset.
    ArrayOfTimestampWithTimezone = 28,
    /// A nested Compact object.
    Compact = 29,
    /// Array of nested Compact objects of one type.
    ArrayOfCompact = 30,
    /// Not supported by Compact.
    Portable = 31,
    /// Not supported by Compact.
    ArrayOfPortable = 32,
    /// A boolean that may be null.
    NullableBoolean = 33,
    /// Array of nullable boolean items.
    ArrayOfNullableBoolean = 34,
    /// An 8-bit signed integer that may be null.
    NullableInt8 = 35,
    /// Array of nullable 8-bit signed integer items.
    ArrayOfNullableInt8 = 36,
    /// A 16-bit signed integer that may be null.
    NullableInt16 = 37,
    /// Array of nullable 16-bit signed integer items.
    ArrayOfNullableInt16 = 38,
    /// A 32-bit signed integer that may be null.
    NullableInt32 = 39,
    /// Array of nullable 32-bit signed integer items.
    ArrayOfNullableInt32 = 40,
    /// A 64-bit signed integer that may be null.
    NullableInt64 = 41,
    /// Array of nullable 64-bit signed integer items.
    ArrayOfNullableInt64 = 42,
    /// A 32-bit IEEE 754 float that may be null.
    NullableFloat32 = 43,
    /// Array of nullable 32-bit IEEE 754 float items.
    ArrayOfNullableFloat32 = 44,
    /// A 64-bit IEEE 754 float that may be null.
    NullableFloat64 = 45,
    /// Array of nullable 64-bit IEEE 754 float items.
    ArrayOfNullableFloat64 = 46,
}

impl FieldKind {
    /// Every kind, indexed by its wire id.
    pub const ALL: [FieldKind; 47] = [
        Self::NotAvailable,
        Self::Boolean,
        Self::ArrayOfBoolean,
        Self::Int8,
        Self::ArrayOfInt8,
        Self::Char,
        Self::ArrayOfChar,
        Self::Int16,
        Self::ArrayOfInt16,
        Self::Int32,
        Self::ArrayOfInt32,
        Self::Int64,
        Self::ArrayOfInt64,
        Self::Float32,
        Self::ArrayOfFloat32,
        Self::Float64,
        Self::ArrayOfFloat64,
        Self::String,
        Self::ArrayOfString,
        Self::Decimal,
        Self::ArrayOfDecimal,
        Self::Time,
        Self::ArrayOfTime,
        Self::Date,
        Self::ArrayOfDate,
        Self::Timestamp,
        Self::ArrayOfTimestamp,
        Self::TimestampWithTimezone,
        Self::ArrayOfTimestampWithTimezone,
        Self::Compact,
        Self::ArrayOfCompact,
        Self::Portable,
        Self::ArrayOfPortable,
        Self::NullableBoolean,
        Self::ArrayOfNullableBoolean,
        Self::NullableInt8,
        Self::ArrayOfNullableInt8,
        Self::NullableInt16,
        Self::ArrayOfNullableInt16,
        Self::NullableInt32,
        Self::ArrayOfNullableInt32,
        Self::NullableInt64,
        Self::ArrayOfNullableInt64,
        Self::NullableFloat32,
        Self::ArrayOfNullableFloat32,
        Self::NullableFloat64,
        Self::ArrayOfNullableFloat64,
    ];

    /// Converts a wire id into a field kind.
    pub fn from_id(id: i32) -> Result<Self> {
        usize::try_from(id)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| CompactError::Serialization(format!("unknown field kind id: {}", id)))
    }

    /// Returns the wire id of this kind.
    pub fn id(self) -> i32 {
        self as i32
    }

    /// Returns the fixed wire width in bytes, or [`VARIABLE_SIZE`].
    ///
    /// Booleans report 0: they are bit-packed after every other fixed-size field.
    pub fn size_in_bytes(self) -> i32 {
        match self {
            Self::Boolean => 0,
            Self::Int8 => 1,
            Self::Int16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Int64 | Self::Float64 => 8,
            _ => VARIABLE_SIZE,
        }
    }

    /// Returns true if the field lives in the fixed-size block of an object.
    pub fn is_fixed_size(self) -> bool {
        self.size_in_bytes() != VARIABLE_SIZE
    }

    /// Returns true for the array kinds.
    pub fn is_array(self) -> bool {
        matches!(
            self,
            Self::ArrayOfBoolean
                | Self::ArrayOfInt8
                | Self::ArrayOfChar
                | Self::ArrayOfInt16
                | Self::ArrayOfInt32
                | Self::ArrayOfInt64
                | Self::ArrayOfFloat32
                | Self::ArrayOfFloat64
                | Self::ArrayOfString
                | Self::ArrayOfDecimal
                | Self::ArrayOfTime
                | Self::ArrayOfDate
                | Self::ArrayOfTimestamp
                | Self::ArrayOfTimestampWithTimezone
                | Self::ArrayOfCompact
                | Self::ArrayOfPortable
                | Self::ArrayOfNullableBoolean
                | Self::ArrayOfNullableInt8
                | Self::ArrayOfNullableInt16
                | Self::ArrayOfNullableInt32
                | Self::ArrayOfNullableInt64
                | Self::ArrayOfNullableFloat32
                | Self::ArrayOfNullableFloat64
        )
    }

    /// Returns true for the boxed primitive kinds and their arrays.
    pub fn is_nullable(self) -> bool {
        self.id() >= Self::NullableBoolean.id()
    }

    /// Returns false for kinds that exist in the id space but cannot be used with Compact.
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            Self::NotAvailable | Self::Char | Self::ArrayOfChar | Self::Portable | Self::ArrayOfPortable
        )
    }

    /// Returns the upper-snake name used in error messages and schema dumps.
    pub fn name(self) -> &'static str {
        match self {
            Self::NotAvailable => "NOT_AVAILABLE",
            Self::Boolean => "BOOLEAN",
            Self::ArrayOfBoolean => "ARRAY_OF_BOOLEAN",
            Self::Int8 => "INT8",
            Self::ArrayOfInt8 => "ARRAY_OF_INT8",
            Self::Char => "CHAR",
            Self::ArrayOfChar => "ARRAY_OF_CHAR",
            Self::Int16 => "INT16",
            Self::ArrayOfInt16 => "ARRAY_OF_INT16",
            Self::Int32 => "INT32",
            Self::ArrayOfInt32 => "ARRAY_OF_INT32",
            Self::Int64 => "INT64",
            Self::ArrayOfInt64 => "ARRAY_OF_INT64",
            Self::Float32 => "FLOAT32",
            Self::ArrayOfFloat32 => "ARRAY_OF_FLOAT32",
            Self::Float64 => "FLOAT64",
            Self::ArrayOfFloat64 => "ARRAY_OF_FLOAT64",
            Self::String => "STRING",
            Self::ArrayOfString => "ARRAY_OF_STRING",
            Self::Decimal => "DECIMAL",
            Self::ArrayOfDecimal => "ARRAY_OF_DECIMAL",
            Self::Time => "TIME",
            Self::ArrayOfTime => "ARRAY_OF_TIME",
            Self::Date => "DATE",
            Self::ArrayOfDate => "ARRAY_OF_DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::ArrayOfTimestamp => "ARRAY_OF_TIMESTAMP",
            Self::TimestampWithTimezone => "TIMESTAMP_WITH_TIMEZONE",
            Self::ArrayOfTimestampWithTimezone => "ARRAY_OF_TIMESTAMP_WITH_TIMEZONE",
            Self::Compact => "COMPACT",
            Self::ArrayOfCompact => "ARRAY_OF_COMPACT",
            Self::Portable => "PORTABLE",
            Self::ArrayOfPortable => "ARRAY_OF_PORTABLE",
            Self::NullableBoolean => "NULLABLE_BOOLEAN",
            Self::ArrayOfNullableBoolean => "ARRAY_OF_NULLABLE_BOOLEAN",
            Self::NullableInt8 => "NULLABLE_INT8",
            Self::ArrayOfNullableInt8 => "ARRAY_OF_NULLABLE_INT8",
            Self::NullableInt16 => "NULLABLE_INT16",
            Self::ArrayOfNullableInt16 => "ARRAY_OF_NULLABLE_INT16",
            Self::NullableInt32 => "NULLABLE_INT32",
            Self::ArrayOfNullableInt32 => "ARRAY_OF_NULLABLE_INT32",
            Self::NullableInt64 => "NULLABLE_INT64",
            Self::ArrayOfNullableInt64 => "ARRAY_OF_NULLABLE_INT64",
            Self::NullableFloat32 => "NULLABLE_FLOAT32",
            Self::ArrayOfNullableFloat32 => "ARRAY_OF_NULLABLE_FLOAT32",
            Self::NullableFloat64 => "NULLABLE_FLOAT64",
            Self::ArrayOfNullableFloat64 => "ARRAY_OF_NULLABLE_FLOAT64",
        }
    }

    /// Fails with an unsupported-operation error for kinds Compact cannot carry.
    pub(crate) fn ensure_supported(self, field_name: &str) -> Result<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(CompactError::UnsupportedOperation(format!(
                "field '{}' has kind {}, which is not supported by Compact serialization",
                field_name,
                self.name()
            )))
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
