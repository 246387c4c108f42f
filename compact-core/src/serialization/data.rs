//! The `Data` envelope: serialized bytes as exchanged with the cluster.

use bytes::Bytes;

use crate::error::{CompactError, Result};
use crate::serialization::{DataOutput, ObjectDataOutput};

const PARTITION_HASH_OFFSET: usize = 0;
const TYPE_OFFSET: usize = 4;
const DATA_OFFSET: usize = 8;

/// Serialized value: `[partition hash: i32][type id: i32][payload]`, big-endian.
///
/// Cheap to clone; the bytes are reference counted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Data {
    bytes: Bytes,
}

impl Data {
    /// Starts an output with the header of a value of `type_id` and no partition hash.
    pub fn output(type_id: i32) -> Result<ObjectDataOutput> {
        let mut out = ObjectDataOutput::new();
        out.write_int(0)?;
        out.write_int(type_id)?;
        Ok(out)
    }

    /// Wraps serialized bytes; fails if they are shorter than the header.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() < DATA_OFFSET {
            return Err(CompactError::Serialization(format!(
                "data of {} bytes is shorter than its {} byte header",
                bytes.len(),
                DATA_OFFSET
            )));
        }
        Ok(Self { bytes })
    }

    fn int_at(&self, offset: usize) -> i32 {
        let mut be = [0u8; 4];
        be.copy_from_slice(&self.bytes[offset..offset + 4]);
        i32::from_be_bytes(be)
    }

    /// Returns the partition hash; 0 when none was set.
    pub fn partition_hash(&self) -> i32 {
        self.int_at(PARTITION_HASH_OFFSET)
    }

    /// Returns the serializer type id.
    pub fn type_id(&self) -> i32 {
        self.int_at(TYPE_OFFSET)
    }

    /// Returns the bytes after the header.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[DATA_OFFSET..]
    }

    /// Returns every byte, header included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the total length, header included.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if there is no payload.
    pub fn is_empty(&self) -> bool {
        self.bytes.len() == DATA_OFFSET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_header() {
        let mut out = Data::output(-55).unwrap();
        out.write_byte(7).unwrap();
        let data = Data::from_bytes(out.into_bytes()).unwrap();
        assert_eq!(data.partition_hash(), 0);
        assert_eq!(data.type_id(), -55);
        assert_eq!(data.payload(), &[7]);
        assert_eq!(data.len(), 9);
        assert!(!data.is_empty());
    }

    #[test]
    fn test_short_bytes_rejected() {
        assert!(Data::from_bytes(vec![0u8; 7]).is_err());
        assert!(Data::from_bytes(vec![0u8; 8]).unwrap().is_empty());
    }
}
