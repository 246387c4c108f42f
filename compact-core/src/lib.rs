//! Compact serialization for data grid clients.
//!
//! Values are encoded against schemas derived from the fields their
//! serializers write. This crate holds the format itself: the field model,
//! schemas and their fingerprints, the reader and writer, generic records and
//! the process-local schema registry. Replicating schemas to a cluster is the
//! job of `compact-client`.

#![warn(missing_docs)]

pub mod error;
pub mod serialization;

pub use error::{CompactError, ErrorCause, Result};
pub use serialization::compact::{
    Compact, CompactReader, CompactSerializer, CompactStreamSerializer, CompactWriter, DefaultCompactReader,
    DefaultCompactWriter, FieldDescriptor, FieldKind, FieldValue, GenericRecord, GenericRecordBuilder, Schema,
    SchemaRegistry, SchemaState, SchemaWriter, SerializerRegistry, COMPACT_TYPE_ID,
};
pub use serialization::{Data, DataInput, DataOutput, ObjectDataInput, ObjectDataOutput};
