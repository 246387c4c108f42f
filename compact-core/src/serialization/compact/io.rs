//! Wire encodings of Compact values: offsets, primitives, decimals and temporal values.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use rust_decimal::Decimal;

use super::field_kind::FieldKind;
use crate::error::{CompactError, Result};
use crate::serialization::{DataInput, DataOutput, ObjectDataInput, ObjectDataOutput};

/// Offset stored for a null variable-size value.
pub(crate) const NULL_OFFSET: i32 = -1;

pub(crate) const INT_SIZE_IN_BYTES: usize = 4;

const BYTE_OFFSET_READER_RANGE: usize = u8::MAX as usize;
const SHORT_OFFSET_READER_RANGE: usize = u16::MAX as usize;

/// Width of the entries of an offset table, chosen from the data length it indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OffsetReader {
    Byte,
    Short,
    Int,
}

impl OffsetReader {
    pub(crate) fn for_data_length(data_length: usize) -> Self {
        if data_length < BYTE_OFFSET_READER_RANGE {
            Self::Byte
        } else if data_length < SHORT_OFFSET_READER_RANGE {
            Self::Short
        } else {
            Self::Int
        }
    }

    pub(crate) fn width(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Short => 2,
            Self::Int => 4,
        }
    }

    /// Reads the entry at `position`; returns [`NULL_OFFSET`] for a null marker.
    pub(crate) fn read(self, input: &ObjectDataInput<'_>, position: usize) -> Result<i32> {
        Ok(match self {
            Self::Byte => match input.read_byte_at(position)? as u8 {
                u8::MAX => NULL_OFFSET,
                v => i32::from(v),
            },
            Self::Short => match input.read_short_at(position)? as u16 {
                u16::MAX => NULL_OFFSET,
                v => i32::from(v),
            },
            Self::Int => input.read_int_at(position)?,
        })
    }

    pub(crate) fn write_all(self, out: &mut ObjectDataOutput, offsets: &[i32]) -> Result<()> {
        for &offset in offsets {
            match self {
                Self::Byte => out.write_byte(offset as i8)?,
                Self::Short => out.write_short(offset as i16)?,
                Self::Int => out.write_int(offset)?,
            }
        }
        Ok(())
    }
}

pub(crate) fn to_wire_length(len: usize) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| CompactError::Serialization(format!("length {} exceeds the wire limit", len)))
}

pub(crate) fn from_wire_length(len: i32, what: &str) -> Result<usize> {
    usize::try_from(len)
        .map_err(|_| CompactError::Serialization(format!("invalid {} length: {}", what, len)))
}

/// Primitive values that can appear as nullable fields and array items.
pub(crate) trait Primitive: Copy + Send + Sync + 'static {
    const KIND: FieldKind;
    const NULLABLE_KIND: FieldKind;
    const ARRAY_KIND: FieldKind;
    const ARRAY_OF_NULLABLE_KIND: FieldKind;

    fn write_to(self, out: &mut ObjectDataOutput) -> Result<()>;
    fn read_from(input: &mut ObjectDataInput<'_>) -> Result<Self>;
}

/// Primitives stored in the fixed-size block at a byte offset.
pub(crate) trait FixedPrimitive: Primitive {
    fn pwrite_to(self, out: &mut ObjectDataOutput, position: usize) -> Result<()>;
    fn read_at(input: &ObjectDataInput<'_>, position: usize) -> Result<Self>;
}

macro_rules! primitive {
    ($ty:ty, $kind:ident, $nullable:ident, $array:ident, $array_nullable:ident,
     $write:ident, $read:ident, $pwrite:ident, $read_at:ident) => {
        impl Primitive for $ty {
            const KIND: FieldKind = FieldKind::$kind;
            const NULLABLE_KIND: FieldKind = FieldKind::$nullable;
            const ARRAY_KIND: FieldKind = FieldKind::$array;
            const ARRAY_OF_NULLABLE_KIND: FieldKind = FieldKind::$array_nullable;

            fn write_to(self, out: &mut ObjectDataOutput) -> Result<()> {
                out.$write(self)
            }

            fn read_from(input: &mut ObjectDataInput<'_>) -> Result<Self> {
                input.$read()
            }
        }

        impl FixedPrimitive for $ty {
            fn pwrite_to(self, out: &mut ObjectDataOutput, position: usize) -> Result<()> {
                out.$pwrite(position, self)
            }

            fn read_at(input: &ObjectDataInput<'_>, position: usize) -> Result<Self> {
                input.$read_at(position)
            }
        }
    };
}

primitive!(i8, Int8, NullableInt8, ArrayOfInt8, ArrayOfNullableInt8, write_byte, read_byte, pwrite_byte, read_byte_at);
primitive!(i16, Int16, NullableInt16, ArrayOfInt16, ArrayOfNullableInt16, write_short, read_short, pwrite_short, read_short_at);
primitive!(i32, Int32, NullableInt32, ArrayOfInt32, ArrayOfNullableInt32, write_int, read_int, pwrite_int, read_int_at);
primitive!(i64, Int64, NullableInt64, ArrayOfInt64, ArrayOfNullableInt64, write_long, read_long, pwrite_long, read_long_at);
primitive!(f32, Float32, NullableFloat32, ArrayOfFloat32, ArrayOfNullableFloat32, write_float, read_float, pwrite_float, read_float_at);
primitive!(f64, Float64, NullableFloat64, ArrayOfFloat64, ArrayOfNullableFloat64, write_double, read_double, pwrite_double, read_double_at);

impl Primitive for bool {
    const KIND: FieldKind = FieldKind::Boolean;
    const NULLABLE_KIND: FieldKind = FieldKind::NullableBoolean;
    const ARRAY_KIND: FieldKind = FieldKind::ArrayOfBoolean;
    const ARRAY_OF_NULLABLE_KIND: FieldKind = FieldKind::ArrayOfNullableBoolean;

    fn write_to(self, out: &mut ObjectDataOutput) -> Result<()> {
        out.write_bool(self)
    }

    fn read_from(input: &mut ObjectDataInput<'_>) -> Result<Self> {
        input.read_bool()
    }
}

/// Writes a count followed by the elements of a primitive array.
pub(crate) fn write_primitive_array<T: Primitive>(out: &mut ObjectDataOutput, values: &[T]) -> Result<()> {
    out.write_int(to_wire_length(values.len())?)?;
    values.iter().try_for_each(|v| v.write_to(out))
}

pub(crate) fn read_primitive_array<T: Primitive>(input: &mut ObjectDataInput<'_>) -> Result<Vec<T>> {
    let len = from_wire_length(input.read_int()?, "array")?;
    let mut values = Vec::with_capacity(len.min(input.remaining()));
    for _ in 0..len {
        values.push(T::read_from(input)?);
    }
    Ok(values)
}

/// Writes a count followed by the booleans packed eight per byte, least significant bit first.
pub(crate) fn write_boolean_bits(out: &mut ObjectDataOutput, values: &[bool]) -> Result<()> {
    out.write_int(to_wire_length(values.len())?)?;
    for chunk in values.chunks(8) {
        let byte = chunk
            .iter()
            .enumerate()
            .fold(0u8, |byte, (bit, &v)| byte | (u8::from(v) << bit));
        out.write_byte(byte as i8)?;
    }
    Ok(())
}

pub(crate) fn read_boolean_bits(input: &mut ObjectDataInput<'_>) -> Result<Vec<bool>> {
    let len = from_wire_length(input.read_int()?, "boolean array")?;
    let bytes = input.read_bytes((len + 7) / 8)?;
    Ok((0..len).map(|i| (bytes[i / 8] >> (i % 8)) & 1 != 0).collect())
}

/// Writes a decimal as its two's-complement big-endian unscaled value followed by the scale.
pub(crate) fn write_decimal(out: &mut ObjectDataOutput, value: &Decimal) -> Result<()> {
    let bytes = value.mantissa().to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    let unscaled = &bytes[start..];
    out.write_int(unscaled.len() as i32)?;
    out.write_bytes(unscaled)?;
    out.write_int(value.scale() as i32)
}

pub(crate) fn read_decimal(input: &mut ObjectDataInput<'_>) -> Result<Decimal> {
    let len = from_wire_length(input.read_int()?, "decimal")?;
    if len == 0 {
        return Err(CompactError::Serialization(
            "decimal with an empty unscaled value".to_string(),
        ));
    }
    let bytes = input.read_bytes(len)?;
    let scale = input.read_int()?;

    let negative = bytes[0] & 0x80 != 0;
    let sign_byte = if negative { 0xFF } else { 0x00 };
    let significant = bytes
        .iter()
        .position(|&b| b != sign_byte)
        .map_or(&bytes[bytes.len() - 1..], |i| &bytes[i..]);
    if significant.len() > 16 {
        return Err(decimal_out_of_range(scale));
    }
    let mut unscaled: i128 = if negative { -1 } else { 0 };
    for &b in significant {
        unscaled = (unscaled << 8) | i128::from(b);
    }

    let (unscaled, scale) = if scale < 0 {
        let factor = 10i128
            .checked_pow(scale.unsigned_abs())
            .ok_or_else(|| decimal_out_of_range(scale))?;
        let unscaled = unscaled
            .checked_mul(factor)
            .ok_or_else(|| decimal_out_of_range(scale))?;
        (unscaled, 0)
    } else {
        (unscaled, scale as u32)
    };
    Decimal::try_from_i128_with_scale(unscaled, scale).map_err(|_| decimal_out_of_range(scale as i32))
}

fn decimal_out_of_range(scale: i32) -> CompactError {
    CompactError::Serialization(format!(
        "decimal with scale {} does not fit into a 96-bit decimal",
        scale
    ))
}

pub(crate) fn write_time(out: &mut ObjectDataOutput, value: &NaiveTime) -> Result<()> {
    out.write_byte(value.hour() as i8)?;
    out.write_byte(value.minute() as i8)?;
    out.write_byte(value.second() as i8)?;
    out.write_int(value.nanosecond() as i32)
}

pub(crate) fn read_time(input: &mut ObjectDataInput<'_>) -> Result<NaiveTime> {
    let hour = input.read_byte()?;
    let minute = input.read_byte()?;
    let second = input.read_byte()?;
    let nano = input.read_int()?;
    NaiveTime::from_hms_nano_opt(hour as u32, minute as u32, second as u32, nano as u32).ok_or_else(|| {
        CompactError::Serialization(format!(
            "invalid time {}:{}:{}.{}",
            hour, minute, second, nano
        ))
    })
}

pub(crate) fn write_date(out: &mut ObjectDataOutput, value: &NaiveDate) -> Result<()> {
    out.write_int(value.year())?;
    out.write_byte(value.month() as i8)?;
    out.write_byte(value.day() as i8)
}

pub(crate) fn read_date(input: &mut ObjectDataInput<'_>) -> Result<NaiveDate> {
    let year = input.read_int()?;
    let month = input.read_byte()?;
    let day = input.read_byte()?;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32).ok_or_else(|| {
        CompactError::Serialization(format!("invalid date {}-{}-{}", year, month, day))
    })
}

pub(crate) fn write_timestamp(out: &mut ObjectDataOutput, value: &NaiveDateTime) -> Result<()> {
    write_date(out, &value.date())?;
    write_time(out, &value.time())
}

pub(crate) fn read_timestamp(input: &mut ObjectDataInput<'_>) -> Result<NaiveDateTime> {
    let date = read_date(input)?;
    let time = read_time(input)?;
    Ok(date.and_time(time))
}

pub(crate) fn write_timestamp_with_timezone(
    out: &mut ObjectDataOutput,
    value: &DateTime<FixedOffset>,
) -> Result<()> {
    write_timestamp(out, &value.naive_local())?;
    out.write_int(value.offset().local_minus_utc())
}

pub(crate) fn read_timestamp_with_timezone(input: &mut ObjectDataInput<'_>) -> Result<DateTime<FixedOffset>> {
    let local = read_timestamp(input)?;
    let offset_seconds = input.read_int()?;
    let offset = FixedOffset::east_opt(offset_seconds).ok_or_else(|| {
        CompactError::Serialization(format!("invalid zone offset of {} seconds", offset_seconds))
    })?;
    offset
        .from_local_datetime(&local)
        .single()
        .ok_or_else(|| CompactError::Serialization(format!("invalid local timestamp {}", local)))
}
