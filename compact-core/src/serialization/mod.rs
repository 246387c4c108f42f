//! Big-endian data input/output, the `Data` envelope and the Compact format.

mod data;
mod data_input;
mod data_output;
pub mod compact;

pub use compact::{
    Compact, CompactReader, CompactSerializer, CompactStreamSerializer, CompactWriter, DefaultCompactReader,
    DefaultCompactWriter, FieldDescriptor, FieldKind, FieldValue, GenericRecord, GenericRecordBuilder, Schema,
    SchemaRegistry, SchemaState, SerializerRegistry, COMPACT_TYPE_ID,
};
pub use data::Data;
pub use data_input::{DataInput, ObjectDataInput};
pub use data_output::{DataOutput, ObjectDataOutput};
