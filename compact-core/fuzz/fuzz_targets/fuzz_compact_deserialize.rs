#![no_main]

use std::sync::{Arc, OnceLock};

use libfuzzer_sys::fuzz_target;

use compact_core::{
    Compact, CompactReader, CompactStreamSerializer, CompactWriter, DataOutput, ObjectDataInput,
    ObjectDataOutput, Result, SchemaRegistry, SchemaWriter, SerializerRegistry,
};

#[derive(Debug, Default)]
struct FuzzCompact {
    bool_val: bool,
    int8_val: i8,
    int16_val: i16,
    int32_val: i32,
    int64_val: i64,
    float32_val: f32,
    float64_val: f64,
    string_val: Option<String>,
    nullable_int32: Option<i32>,
    ints: Option<Vec<i32>>,
    names: Option<Vec<Option<String>>>,
}

impl Compact for FuzzCompact {
    fn type_name() -> &'static str {
        "FuzzCompact"
    }

    fn write(&self, writer: &mut dyn CompactWriter) -> Result<()> {
        writer.write_boolean("bool", self.bool_val)?;
        writer.write_int8("int8", self.int8_val)?;
        writer.write_int16("int16", self.int16_val)?;
        writer.write_int32("int32", self.int32_val)?;
        writer.write_int64("int64", self.int64_val)?;
        writer.write_float32("float32", self.float32_val)?;
        writer.write_float64("float64", self.float64_val)?;
        writer.write_string("string", self.string_val.as_deref())?;
        writer.write_nullable_int32("nullable_int32", self.nullable_int32)?;
        writer.write_array_of_int32("ints", self.ints.as_deref())?;
        writer.write_array_of_string("names", self.names.as_deref())?;
        Ok(())
    }

    fn read(reader: &mut dyn CompactReader) -> Result<Self> {
        Ok(Self {
            bool_val: reader.read_boolean("bool")?,
            int8_val: reader.read_int8("int8")?,
            int16_val: reader.read_int16("int16")?,
            int32_val: reader.read_int32("int32")?,
            int64_val: reader.read_int64("int64")?,
            float32_val: reader.read_float32("float32")?,
            float64_val: reader.read_float64("float64")?,
            string_val: reader.read_string("string")?,
            nullable_int32: reader.read_nullable_int32("nullable_int32")?,
            ints: reader.read_array_of_int32("ints")?,
            names: reader.read_array_of_string("names")?,
        })
    }
}

fn serializer() -> &'static (CompactStreamSerializer, i64) {
    static SERIALIZER: OnceLock<(CompactStreamSerializer, i64)> = OnceLock::new();
    SERIALIZER.get_or_init(|| {
        let mut writer = SchemaWriter::new(FuzzCompact::type_name());
        FuzzCompact::default().write(&mut writer).unwrap();
        let registry = Arc::new(SchemaRegistry::new());
        let schema = registry.put_local(writer.build()).unwrap();
        let mut serializers = SerializerRegistry::new();
        serializers.register_compact::<FuzzCompact>().unwrap();
        (CompactStreamSerializer::new(registry, serializers), schema.schema_id())
    })
}

fuzz_target!(|data: &[u8]| {
    let (serializer, schema_id) = serializer();

    // Arbitrary bytes, mostly rejected at the schema id.
    let _ = serializer.read::<FuzzCompact>(&mut ObjectDataInput::new(data));

    // A known schema id followed by arbitrary object bytes.
    let mut out = ObjectDataOutput::new();
    out.write_long(*schema_id).unwrap();
    out.write_bytes(data).unwrap();
    let bytes = out.into_bytes();
    let _ = serializer.read::<FuzzCompact>(&mut ObjectDataInput::new(&bytes));
    let _ = serializer.read_generic_record(&mut ObjectDataInput::new(&bytes));
});
