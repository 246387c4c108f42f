//! User serializers, their registry, and the stream serializer that drives encoding and decoding.

use std::any::{self, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

use super::field_operations::field_operations;
use super::reader::DefaultCompactReader;
use super::registry::SchemaRegistry;
use super::schema::Schema;
use super::schema_writer::SchemaWriter;
use super::writer::DefaultCompactWriter;
use super::{Compact, CompactObject, CompactReader, CompactWriter, GenericRecord, COMPACT_TYPE_ID};
use crate::error::{CompactError, Result};
use crate::serialization::{DataInput, DataOutput, Data, ObjectDataInput, ObjectDataOutput};

/// Reads and writes values of `T` in the Compact format.
///
/// `write` must write the same set of field names and kinds for every value;
/// the schema of `T` is derived from one call.
pub trait CompactSerializer<T>: Send + Sync {
    /// Returns the Compact type name written into schemas.
    fn type_name(&self) -> &str;

    /// Writes the fields of `value`.
    fn write(&self, writer: &mut dyn CompactWriter, value: &T) -> Result<()>;

    /// Reads a value from its fields.
    fn read(&self, reader: &mut dyn CompactReader) -> Result<T>;
}

/// Serializer for types implementing [`Compact`].
pub struct DerivedSerializer<T>(PhantomData<fn() -> T>);

impl<T> DerivedSerializer<T> {
    /// Creates the serializer.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for DerivedSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Compact> CompactSerializer<T> for DerivedSerializer<T> {
    fn type_name(&self) -> &str {
        T::type_name()
    }

    fn write(&self, writer: &mut dyn CompactWriter, value: &T) -> Result<()> {
        value.write(writer)
    }

    fn read(&self, reader: &mut dyn CompactReader) -> Result<T> {
        T::read(reader)
    }
}

trait ErasedSerializer: Send + Sync {
    fn type_name(&self) -> &str;
    fn rust_type_name(&self) -> &'static str;
    fn write(&self, writer: &mut dyn CompactWriter, value: &dyn Any) -> Result<()>;
    fn read(&self, reader: &mut dyn CompactReader) -> Result<Box<dyn Any + Send + Sync>>;
}

struct Typed<T, S> {
    serializer: S,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S> ErasedSerializer for Typed<T, S>
where
    T: Any + Send + Sync,
    S: CompactSerializer<T>,
{
    fn type_name(&self) -> &str {
        self.serializer.type_name()
    }

    fn rust_type_name(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn write(&self, writer: &mut dyn CompactWriter, value: &dyn Any) -> Result<()> {
        let value = value.downcast_ref::<T>().ok_or_else(|| {
            CompactError::Serialization(format!(
                "serializer for {} was given a value of another type",
                any::type_name::<T>()
            ))
        })?;
        self.serializer.write(writer, value)
    }

    fn read(&self, reader: &mut dyn CompactReader) -> Result<Box<dyn Any + Send + Sync>> {
        Ok(Box::new(self.serializer.read(reader)?))
    }
}

/// Compact serializers keyed by Rust type and by Compact type name.
#[derive(Clone, Default)]
pub struct SerializerRegistry {
    by_type: HashMap<TypeId, Arc<dyn ErasedSerializer>>,
    by_name: HashMap<String, Arc<dyn ErasedSerializer>>,
}

impl SerializerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a serializer for `T`.
    ///
    /// Fails with a configuration error if `T` or the serializer's type name is
    /// already registered.
    pub fn register<T, S>(&mut self, serializer: S) -> Result<()>
    where
        T: Any + Send + Sync,
        S: CompactSerializer<T> + 'static,
    {
        let type_id = TypeId::of::<T>();
        let type_name = serializer.type_name().to_string();
        if let Some(existing) = self.by_type.get(&type_id) {
            return Err(CompactError::Configuration(format!(
                "a compact serializer for {} is already registered with type name '{}'",
                any::type_name::<T>(),
                existing.type_name()
            )));
        }
        if let Some(existing) = self.by_name.get(&type_name) {
            return Err(CompactError::Configuration(format!(
                "duplicate compact type name '{}': already used by {}, now by {}",
                type_name,
                ErasedSerializer::rust_type_name(existing.as_ref()),
                any::type_name::<T>()
            )));
        }
        let erased: Arc<dyn ErasedSerializer> = Arc::new(Typed {
            serializer,
            _marker: PhantomData::<fn() -> T>,
        });
        self.by_type.insert(type_id, Arc::clone(&erased));
        self.by_name.insert(type_name, erased);
        Ok(())
    }

    /// Registers the derived serializer of a [`Compact`] type.
    pub fn register_compact<T: Compact>(&mut self) -> Result<()> {
        self.register::<T, _>(DerivedSerializer::<T>::new())
    }

    /// Returns true if a serializer for `T` is registered.
    pub fn contains<T: Any>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    /// Returns the Compact type name registered for `T`.
    pub fn type_name_of<T: Any>(&self) -> Option<&str> {
        self.by_type.get(&TypeId::of::<T>()).map(|s| s.type_name())
    }

    /// Returns the number of registered serializers.
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Returns true if no serializer is registered.
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    fn by_type_id(&self, type_id: TypeId) -> Option<&Arc<dyn ErasedSerializer>> {
        self.by_type.get(&type_id)
    }

    fn by_name(&self, type_name: &str) -> Option<&Arc<dyn ErasedSerializer>> {
        self.by_name.get(type_name)
    }
}

impl fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("SerializerRegistry").field("type_names", &names).finish()
    }
}

/// Encodes values and generic records, and decodes them back.
///
/// Encoding fails with [`CompactError::SchemaNotReplicated`] while the
/// schema of the value is not replicated in the cluster; decoding fails with
/// [`CompactError::SchemaNotFound`] when the schema id of the data is unknown.
/// Both are resolved by the caller through the schema service, followed by a
/// retry.
pub struct CompactStreamSerializer {
    schemas: Arc<SchemaRegistry>,
    serializers: SerializerRegistry,
    type_schemas: RwLock<HashMap<TypeId, Arc<Schema>>>,
}

impl CompactStreamSerializer {
    /// Creates a serializer over a shared schema registry.
    pub fn new(schemas: Arc<SchemaRegistry>, serializers: SerializerRegistry) -> Self {
        Self {
            schemas,
            serializers,
            type_schemas: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the schema registry shared with the schema service.
    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    /// Returns the registered user serializers.
    pub fn serializers(&self) -> &SerializerRegistry {
        &self.serializers
    }

    /// Records that `type_id` is encoded with `schema`, once the schema is replicated.
    pub fn register_schema_to_type(&self, type_id: TypeId, schema: Arc<Schema>) {
        tracing::trace!(schema_id = schema.schema_id(), type_name = %schema.type_name(), "schema bound to type");
        self.type_schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(type_id, schema);
    }

    /// Writes `value` as a schema-id-tagged Compact object.
    pub fn write_object<T: Any + Send + Sync>(&self, out: &mut ObjectDataOutput, value: &T) -> Result<()> {
        self.write_dyn(out, value)
    }

    pub(crate) fn write_dyn(&self, out: &mut ObjectDataOutput, value: &dyn CompactObject) -> Result<()> {
        if let Some(record) = value.as_any().downcast_ref::<GenericRecord>() {
            return self.write_generic_record(out, record);
        }
        let type_id = Any::type_id(value.as_any());
        let serializer = self.serializers.by_type_id(type_id).ok_or_else(|| {
            CompactError::Serialization(format!(
                "no compact serializer is registered for {}",
                value.rust_type_name()
            ))
        })?;
        let schema = self.schema_of(type_id, serializer.as_ref(), value.as_any())?;
        out.write_long(schema.schema_id())?;
        let mut writer = DefaultCompactWriter::new(self, out, &schema);
        serializer.write(&mut writer, value.as_any())?;
        writer.end()
    }

    fn schema_of(&self, type_id: TypeId, serializer: &dyn ErasedSerializer, value: &dyn Any) -> Result<Arc<Schema>> {
        if let Some(schema) = self
            .type_schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
        {
            return Ok(Arc::clone(schema));
        }
        let mut schema_writer = SchemaWriter::new(serializer.type_name());
        serializer.write(&mut schema_writer, value)?;
        let schema = self.schemas.define(schema_writer.build())?;
        if self.schemas.is_replicated(schema.schema_id()) {
            self.register_schema_to_type(type_id, Arc::clone(&schema));
            return Ok(schema);
        }
        Err(CompactError::SchemaNotReplicated {
            schema,
            type_id: Some(type_id),
        })
    }

    /// Writes a generic record as a schema-id-tagged Compact object.
    pub fn write_generic_record(&self, out: &mut ObjectDataOutput, record: &GenericRecord) -> Result<()> {
        let schema = self.schemas.define(Arc::clone(record.schema_arc()))?;
        if !self.schemas.is_replicated(schema.schema_id()) {
            return Err(CompactError::SchemaNotReplicated { schema, type_id: None });
        }
        out.write_long(schema.schema_id())?;
        let mut writer = DefaultCompactWriter::new(self, out, &schema);
        for field in schema.fields() {
            let value = record.get(field.name()).ok_or_else(|| {
                CompactError::Serialization(format!("generic record has no value for field {}", field.name()))
            })?;
            (field_operations(field.kind()).write)(&mut writer, field.name(), value)?;
        }
        writer.end()
    }

    fn read_schema(&self, input: &mut ObjectDataInput<'_>) -> Result<Arc<Schema>> {
        let schema_id = input.read_long()?;
        self.schemas
            .get(schema_id)
            .ok_or(CompactError::SchemaNotFound { schema_id })
    }

    /// Reads an object: a value of the registered type for its type name, a
    /// [`GenericRecord`] when no serializer is registered for it.
    pub fn read_any(&self, input: &mut ObjectDataInput<'_>) -> Result<Box<dyn Any + Send + Sync>> {
        let schema = self.read_schema(input)?;
        let serializer = self.serializers.by_name(schema.type_name());
        let mut reader = DefaultCompactReader::new(self, input, schema)?;
        match serializer {
            Some(serializer) => serializer.read(&mut reader),
            None => Ok(Box::new(reader.to_generic_record()?)),
        }
    }

    /// Reads an object as `T`; `T` may be [`GenericRecord`] for any object.
    pub fn read<T: Any>(&self, input: &mut ObjectDataInput<'_>) -> Result<T> {
        let value: Box<dyn Any + Send + Sync> = if TypeId::of::<T>() == TypeId::of::<GenericRecord>() {
            Box::new(self.read_generic_record(input)?)
        } else {
            self.read_any(input)?
        };
        let value = match value.downcast::<T>() {
            Ok(value) => return Ok(*value),
            Err(value) => value,
        };
        match value.downcast_ref::<GenericRecord>() {
            Some(record) => Err(CompactError::Serialization(format!(
                "no compact serializer is registered for type name '{}'; read it as a generic record",
                record.type_name()
            ))),
            None => Err(CompactError::Serialization(format!(
                "data was not encoded from {}",
                any::type_name::<T>()
            ))),
        }
    }

    /// Reads an object as a generic record whether or not its type is registered.
    pub fn read_generic_record(&self, input: &mut ObjectDataInput<'_>) -> Result<GenericRecord> {
        let schema = self.read_schema(input)?;
        DefaultCompactReader::new(self, input, schema)?.to_generic_record()
    }

    /// Encodes `value` into a [`Data`] envelope.
    pub fn to_data<T: Any + Send + Sync>(&self, value: &T) -> Result<Data> {
        let mut out = Data::output(COMPACT_TYPE_ID)?;
        self.write_object(&mut out, value)?;
        Data::from_bytes(out.into_bytes())
    }

    /// Encodes a generic record into a [`Data`] envelope.
    pub fn generic_record_to_data(&self, record: &GenericRecord) -> Result<Data> {
        let mut out = Data::output(COMPACT_TYPE_ID)?;
        self.write_generic_record(&mut out, record)?;
        Data::from_bytes(out.into_bytes())
    }

    /// Decodes a value of `T` from a [`Data`] envelope.
    pub fn from_data<T: Any>(&self, data: &Data) -> Result<T> {
        self.read(&mut compact_payload(data)?)
    }

    /// Decodes the object in a [`Data`] envelope as a generic record.
    pub fn generic_record_from_data(&self, data: &Data) -> Result<GenericRecord> {
        self.read_generic_record(&mut compact_payload(data)?)
    }
}

fn compact_payload(data: &Data) -> Result<ObjectDataInput<'_>> {
    if data.type_id() != COMPACT_TYPE_ID {
        return Err(CompactError::Serialization(format!(
            "data of type id {} is not Compact encoded",
            data.type_id()
        )));
    }
    Ok(ObjectDataInput::new(data.payload()))
}

impl fmt::Debug for CompactStreamSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompactStreamSerializer")
            .field("schemas", &self.schemas.len())
            .field("serializers", &self.serializers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::compact::{FieldKind, GenericRecordBuilder};

    #[derive(Debug, Clone, PartialEq)]
    struct Employee {
        age: i32,
        id: i64,
    }

    impl Compact for Employee {
        fn type_name() -> &'static str {
            "Employee"
        }

        fn write(&self, writer: &mut dyn CompactWriter) -> Result<()> {
            writer.write_int32("age", self.age)?;
            writer.write_int64("id", self.id)
        }

        fn read(reader: &mut dyn CompactReader) -> Result<Self> {
            Ok(Self {
                age: reader.read_int32("age")?,
                id: reader.read_int64("id")?,
            })
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Bits {
        flags: [bool; 8],
        id: i32,
        booleans: Vec<bool>,
    }

    impl Compact for Bits {
        fn type_name() -> &'static str {
            "Bits"
        }

        fn write(&self, writer: &mut dyn CompactWriter) -> Result<()> {
            for (name, flag) in ["a", "b", "c", "d", "e", "f", "g", "h"].iter().zip(self.flags) {
                writer.write_boolean(name, flag)?;
            }
            writer.write_int32("id", self.id)?;
            writer.write_array_of_boolean("booleans", Some(&self.booleans))
        }

        fn read(reader: &mut dyn CompactReader) -> Result<Self> {
            let mut flags = [false; 8];
            for (flag, name) in flags.iter_mut().zip(["a", "b", "c", "d", "e", "f", "g", "h"]) {
                *flag = reader.read_boolean(name)?;
            }
            Ok(Self {
                flags,
                id: reader.read_int32("id")?,
                booleans: reader.read_array_of_boolean("booleans")?.unwrap_or_default(),
            })
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Team {
        lead: Option<Employee>,
        members: Option<Vec<Option<Employee>>>,
    }

    impl Compact for Team {
        fn type_name() -> &'static str {
            "Team"
        }

        fn write(&self, writer: &mut dyn CompactWriter) -> Result<()> {
            writer.write_compact("lead", self.lead.as_ref())?;
            writer.write_array_of_compact("members", self.members.as_deref())
        }

        fn read(reader: &mut dyn CompactReader) -> Result<Self> {
            Ok(Self {
                lead: reader.read_compact("lead")?,
                members: reader.read_array_of_compact("members")?,
            })
        }
    }

    fn stream_serializer(register: impl FnOnce(&mut SerializerRegistry)) -> CompactStreamSerializer {
        let mut serializers = SerializerRegistry::new();
        register(&mut serializers);
        CompactStreamSerializer::new(Arc::new(SchemaRegistry::new()), serializers)
    }

    /// Runs `encode`, replicating every schema it asks for.
    fn encode_replicating<R>(serializer: &CompactStreamSerializer, mut encode: impl FnMut() -> Result<R>) -> R {
        loop {
            match encode() {
                Ok(value) => return value,
                Err(CompactError::SchemaNotReplicated { schema, type_id }) => {
                    serializer.schemas().mark_replicated(&schema).unwrap();
                    if let Some(type_id) = type_id {
                        serializer.register_schema_to_type(type_id, schema);
                    }
                }
                Err(err) => panic!("unexpected error: {}", err),
            }
        }
    }

    #[test]
    fn test_unreplicated_schema_is_reported() {
        let serializer = stream_serializer(|r| r.register_compact::<Employee>().unwrap());
        let employee = Employee { age: 23, id: 456 };
        let err = serializer.to_data(&employee).unwrap_err();
        match err {
            CompactError::SchemaNotReplicated { schema, type_id } => {
                assert_eq!(schema.type_name(), "Employee");
                assert_eq!(type_id, Some(TypeId::of::<Employee>()));
                assert_eq!(schema.field_kind("age"), Some(FieldKind::Int32));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_round_trip_after_replication() {
        let serializer = stream_serializer(|r| r.register_compact::<Employee>().unwrap());
        let employee = Employee { age: 23, id: 456 };
        let data = encode_replicating(&serializer, || serializer.to_data(&employee));
        assert_eq!(data.type_id(), COMPACT_TYPE_ID);
        assert_eq!(serializer.from_data::<Employee>(&data).unwrap(), employee);
    }

    #[test]
    fn test_unknown_schema_id_is_not_found() {
        let writer = stream_serializer(|r| r.register_compact::<Employee>().unwrap());
        let data = encode_replicating(&writer, || writer.to_data(&Employee { age: 1, id: 2 }));
        let reader = stream_serializer(|r| r.register_compact::<Employee>().unwrap());
        let err = reader.from_data::<Employee>(&data).unwrap_err();
        let schema_id = writer.schemas().replicated_schemas()[0].schema_id();
        assert!(matches!(err, CompactError::SchemaNotFound { schema_id: id } if id == schema_id));
    }

    #[test]
    fn test_bits_layout_size() {
        let serializer = stream_serializer(|r| r.register_compact::<Bits>().unwrap());
        let bits = Bits {
            flags: [true, false, true, true, false, false, true, false],
            id: 101,
            booleans: vec![true, false, false, true, true, false, true, false],
        };
        let data = encode_replicating(&serializer, || serializer.to_data(&bits));
        assert_eq!(data.len(), 31);
        assert_eq!(serializer.from_data::<Bits>(&data).unwrap(), bits);
    }

    #[test]
    fn test_nested_objects_and_arrays() {
        let serializer = stream_serializer(|r| {
            r.register_compact::<Employee>().unwrap();
            r.register_compact::<Team>().unwrap();
        });
        let team = Team {
            lead: Some(Employee { age: 40, id: 1 }),
            members: Some(vec![Some(Employee { age: 30, id: 2 }), None]),
        };
        let data = encode_replicating(&serializer, || serializer.to_data(&team));
        assert_eq!(serializer.schemas().replicated_schemas().len(), 2);
        assert_eq!(serializer.from_data::<Team>(&data).unwrap(), team);

        let record = serializer.generic_record_from_data(&data).unwrap();
        let lead = record.get_generic_record("lead").unwrap().unwrap();
        assert_eq!(lead.get_int32("age").unwrap(), 40);
    }

    #[test]
    fn test_unregistered_type_decodes_as_generic_record() {
        let writer = stream_serializer(|r| r.register_compact::<Employee>().unwrap());
        let data = encode_replicating(&writer, || writer.to_data(&Employee { age: 23, id: 456 }));

        let reader = CompactStreamSerializer::new(Arc::clone(writer.schemas()), SerializerRegistry::new());
        let record = reader.from_data::<GenericRecord>(&data).unwrap();
        assert_eq!(record.to_string(), r#"{"Employee":{"age":23,"id":456}}"#);
        assert_eq!(record.clone_with(HashMap::new()).unwrap(), record);

        let err = reader.from_data::<Employee>(&data).unwrap_err();
        assert!(err.to_string().contains("read it as a generic record"));

        let again = encode_replicating(&reader, || reader.generic_record_to_data(&record));
        assert_eq!(again, data);
    }

    #[test]
    fn test_generic_record_needs_replication() {
        let serializer = stream_serializer(|_| {});
        let record = GenericRecordBuilder::compact("Point")
            .set_int32("x", 1)
            .set_int32("y", 2)
            .build()
            .unwrap();
        let err = serializer.generic_record_to_data(&record).unwrap_err();
        assert!(matches!(err, CompactError::SchemaNotReplicated { type_id: None, .. }));
        let data = encode_replicating(&serializer, || serializer.generic_record_to_data(&record));
        assert_eq!(serializer.generic_record_from_data(&data).unwrap(), record);
    }

    #[test]
    fn test_schema_evolution() {
        #[derive(Debug, PartialEq)]
        struct EmployeeV2 {
            age: i32,
            id: i64,
            rank: i32,
        }

        impl Compact for EmployeeV2 {
            fn type_name() -> &'static str {
                "Employee"
            }

            fn write(&self, writer: &mut dyn CompactWriter) -> Result<()> {
                writer.write_int32("age", self.age)?;
                writer.write_int64("id", self.id)?;
                writer.write_int32("rank", self.rank)
            }

            fn read(reader: &mut dyn CompactReader) -> Result<Self> {
                Ok(Self {
                    age: reader.read_int32("age")?,
                    id: reader.read_int64("id")?,
                    rank: reader.read_or_default("rank", -1, |r, name| r.read_int32(name))?,
                })
            }
        }

        let old = stream_serializer(|r| r.register_compact::<Employee>().unwrap());
        let new = CompactStreamSerializer::new(Arc::clone(old.schemas()), {
            let mut serializers = SerializerRegistry::new();
            serializers.register_compact::<EmployeeV2>().unwrap();
            serializers
        });

        let v1 = encode_replicating(&old, || old.to_data(&Employee { age: 1, id: 2 }));
        let read = new.from_data::<EmployeeV2>(&v1).unwrap();
        assert_eq!(read, EmployeeV2 { age: 1, id: 2, rank: -1 });

        let v2 = encode_replicating(&new, || new.to_data(&EmployeeV2 { age: 3, id: 4, rank: 5 }));
        assert_eq!(old.from_data::<Employee>(&v2).unwrap(), Employee { age: 3, id: 4 });
    }

    /// A record holding every supported kind at its lower or upper bound.
    fn every_kind_at_bound(high: bool) -> GenericRecord {
        use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
        use rust_decimal::Decimal;

        macro_rules! pick {
            ($low:expr, $high:expr $(,)?) => {
                if high {
                    $high
                } else {
                    $low
                }
            };
        }
        let time = pick!(
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap(),
        );
        let date = pick!(NaiveDate::MIN, NaiveDate::MAX);
        let timestamp = pick!(NaiveDateTime::MIN, NaiveDateTime::MAX);
        let zoned: DateTime<FixedOffset> = FixedOffset::east_opt(pick!(-18 * 3600, 18 * 3600))
            .unwrap()
            .from_local_datetime(&NaiveDate::from_ymd_opt(pick!(-9999, 9999), 12, 31).unwrap().and_time(time))
            .single()
            .unwrap();
        let decimal = pick!(Decimal::MIN, Decimal::MAX);
        let nested = GenericRecordBuilder::compact("Inner").set_int8("v", pick!(i8::MIN, i8::MAX)).build().unwrap();

        GenericRecordBuilder::compact("Bounds")
            .set_boolean("boolean", high)
            .set_int8("int8", pick!(i8::MIN, i8::MAX))
            .set_int16("int16", pick!(i16::MIN, i16::MAX))
            .set_int32("int32", pick!(i32::MIN, i32::MAX))
            .set_int64("int64", pick!(i64::MIN, i64::MAX))
            .set_float32("float32", pick!(f32::MIN, f32::MAX))
            .set_float64("float64", pick!(f64::MIN, f64::MAX))
            .set_string("string", Some(pick!("", "\u{1F600} ünïcode").to_string()))
            .set_decimal("decimal", Some(decimal))
            .set_time("time", Some(time))
            .set_date("date", Some(date))
            .set_timestamp("timestamp", Some(timestamp))
            .set_timestamp_with_timezone("zoned", Some(zoned))
            .set_generic_record("compact", Some(nested.clone()))
            .set_nullable_boolean("nullable_boolean", Some(high))
            .set_nullable_int8("nullable_int8", Some(pick!(i8::MIN, i8::MAX)))
            .set_nullable_int16("nullable_int16", Some(pick!(i16::MIN, i16::MAX)))
            .set_nullable_int32("nullable_int32", Some(pick!(i32::MIN, i32::MAX)))
            .set_nullable_int64("nullable_int64", Some(pick!(i64::MIN, i64::MAX)))
            .set_nullable_float32("nullable_float32", Some(pick!(f32::MIN_POSITIVE, f32::MAX)))
            .set_nullable_float64("nullable_float64", Some(pick!(f64::MIN_POSITIVE, f64::MAX)))
            .set_array_of_boolean("booleans", Some(vec![high, !high, true, false, true, false, true, false, high]))
            .set_array_of_int8("int8s", Some(vec![i8::MIN, 0, i8::MAX]))
            .set_array_of_int16("int16s", Some(vec![i16::MIN, 0, i16::MAX]))
            .set_array_of_int32("int32s", Some(vec![i32::MIN, 0, i32::MAX]))
            .set_array_of_int64("int64s", Some(vec![i64::MIN, 0, i64::MAX]))
            .set_array_of_float32("float32s", Some(vec![f32::MIN, f32::MAX]))
            .set_array_of_float64("float64s", Some(vec![f64::MIN, f64::MAX]))
            .set_array_of_string("strings", Some(vec![Some(String::new()), None]))
            .set_array_of_decimal("decimals", Some(vec![Some(Decimal::MIN), None, Some(Decimal::new(-1, 28))]))
            .set_array_of_time("times", Some(vec![Some(time), None]))
            .set_array_of_date("dates", Some(vec![Some(date), None]))
            .set_array_of_timestamp("timestamps", Some(vec![Some(timestamp), None]))
            .set_array_of_timestamp_with_timezone("zoneds", Some(vec![Some(zoned), None]))
            .set_array_of_generic_record("compacts", Some(vec![Some(nested), None]))
            .set_array_of_nullable_boolean("nullable_booleans", Some(vec![Some(high), None]))
            .set_array_of_nullable_int8("nullable_int8s", Some(vec![Some(pick!(i8::MIN, i8::MAX)), None]))
            .set_array_of_nullable_int16("nullable_int16s", Some(vec![Some(pick!(i16::MIN, i16::MAX)), None]))
            .set_array_of_nullable_int32("nullable_int32s", Some(vec![Some(pick!(i32::MIN, i32::MAX)), None]))
            .set_array_of_nullable_int64("nullable_int64s", Some(vec![Some(pick!(i64::MIN, i64::MAX)), None]))
            .set_array_of_nullable_float32("nullable_float32s", Some(vec![Some(pick!(f32::MIN, f32::MAX)), None]))
            .set_array_of_nullable_float64("nullable_float64s", Some(vec![Some(pick!(f64::MIN, f64::MAX)), None]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_every_kind_round_trips_at_bounds() {
        for high in [false, true] {
            let record = every_kind_at_bound(high);
            let covered: Vec<FieldKind> = record.schema().fields().iter().map(|f| f.kind()).collect();
            for kind in FieldKind::ALL.into_iter().filter(|k| k.is_supported()) {
                assert!(covered.contains(&kind), "{} is not covered", kind);
            }

            let serializer = stream_serializer(|_| {});
            let data = encode_replicating(&serializer, || serializer.generic_record_to_data(&record));
            assert_eq!(serializer.generic_record_from_data(&data).unwrap(), record);
        }
    }

    #[test]
    fn test_nulls_and_empty_arrays_round_trip() {
        let record = GenericRecordBuilder::compact("Empty")
            .set_string("string", None)
            .set_decimal("decimal", None)
            .set_timestamp_with_timezone("zoned", None)
            .set_generic_record("compact", None)
            .set_nullable_int32("nullable_int32", None)
            .set_nullable_float64("nullable_float64", None)
            .set_array_of_boolean("booleans", Some(Vec::new()))
            .set_array_of_int64("int64s", None)
            .set_array_of_float32("float32s", Some(Vec::new()))
            .set_array_of_string("strings", Some(Vec::new()))
            .set_array_of_date("dates", None)
            .set_array_of_generic_record("compacts", Some(Vec::new()))
            .set_array_of_nullable_int16("nullable_int16s", Some(vec![None, None]))
            .set_array_of_nullable_boolean("nullable_booleans", Some(Vec::new()))
            .build()
            .unwrap();

        let serializer = stream_serializer(|_| {});
        let data = encode_replicating(&serializer, || serializer.generic_record_to_data(&record));
        let decoded = serializer.generic_record_from_data(&data).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.get_string("string").unwrap(), None);
        assert_eq!(decoded.get_array_of_boolean("booleans").unwrap(), Some(Vec::new()));
        assert_eq!(decoded.get_array_of_int64("int64s").unwrap(), None);
    }

    #[test]
    fn test_duplicate_registration() {
        struct Other;
        struct OtherSerializer;

        impl CompactSerializer<Other> for OtherSerializer {
            fn type_name(&self) -> &str {
                "Employee"
            }

            fn write(&self, _writer: &mut dyn CompactWriter, _value: &Other) -> Result<()> {
                Ok(())
            }

            fn read(&self, _reader: &mut dyn CompactReader) -> Result<Other> {
                Ok(Other)
            }
        }

        let mut registry = SerializerRegistry::new();
        registry.register_compact::<Employee>().unwrap();
        let err = registry.register_compact::<Employee>().unwrap_err();
        assert!(matches!(err, CompactError::Configuration(_)));
        let err = registry.register::<Other, _>(OtherSerializer).unwrap_err();
        assert!(err.to_string().contains("duplicate compact type name 'Employee'"));
        assert!(err
            .to_string()
            .contains(&format!("already used by {},", any::type_name::<Employee>())));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.type_name_of::<Employee>(), Some("Employee"));
    }
}
