//! Compact schemas and the layout of their fields.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

use super::field_kind::FieldKind;
use super::fingerprint;
use crate::error::{CompactError, Result};
use crate::serialization::{DataInput, DataOutput};

/// Describes a single field of a schema and where it lives in an encoded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    index: i32,
    offset: i32,
    bit_offset: i8,
}

impl FieldDescriptor {
    /// Creates a descriptor that has not been placed by a schema layout yet.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            index: -1,
            offset: -1,
            bit_offset: -1,
        }
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field kind.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Slot in the offset table for variable-size fields, -1 otherwise.
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Byte offset in the fixed-size block, -1 for variable-size fields.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Bit inside the byte at [`offset`](Self::offset) for booleans, -1 otherwise.
    pub fn bit_offset(&self) -> i8 {
        self.bit_offset
    }
}

/// An immutable, content-addressed description of a Compact type.
///
/// Fields are kept sorted by name, comparing UTF-16 code units. The schema id is the Rabin fingerprint of
/// the type name and the sorted `(name, kind)` pairs, so two schemas with the
/// same type name and field set have the same id whatever order the fields
/// were declared in.
#[derive(Debug, Clone)]
pub struct Schema {
    type_name: String,
    fields: Vec<FieldDescriptor>,
    field_indices: HashMap<String, usize>,
    schema_id: i64,
    number_var_size_fields: usize,
    fixed_size_fields_length: usize,
}

impl Schema {
    /// Creates a schema from field descriptors in any order.
    ///
    /// Fails if two fields share a name or a field uses a kind that Compact
    /// does not support.
    pub fn new(type_name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Result<Self> {
        let type_name = type_name.into();
        let mut by_name = BTreeMap::new();
        for field in fields {
            field.kind.ensure_supported(&field.name)?;
            if by_name.insert(field.name.clone(), field.kind).is_some() {
                return Err(CompactError::Serialization(format!(
                    "Field with the name '{}' already exists in compact schema '{}'",
                    field.name, type_name
                )));
            }
        }
        Ok(Self::from_sorted(type_name, by_name))
    }

    pub(crate) fn from_sorted(type_name: String, fields: BTreeMap<String, FieldKind>) -> Self {
        let mut fields: Vec<FieldDescriptor> = fields
            .into_iter()
            .map(|(name, kind)| FieldDescriptor::new(name, kind))
            .collect();
        // Other clients order names by UTF-16 code unit, which differs from
        // UTF-8 byte order for characters outside the BMP.
        fields.sort_by(|a, b| a.name.encode_utf16().cmp(b.name.encode_utf16()));

        let mut fixed: Vec<usize> = (0..fields.len())
            .filter(|&i| fields[i].kind.is_fixed_size() && fields[i].kind != FieldKind::Boolean)
            .collect();
        fixed.sort_by_key(|&i| Reverse(fields[i].kind.size_in_bytes()));

        let mut offset = 0i32;
        for i in fixed {
            fields[i].offset = offset;
            offset += fields[i].kind.size_in_bytes();
        }

        let mut boolean_count = 0i32;
        for field in fields.iter_mut().filter(|f| f.kind == FieldKind::Boolean) {
            field.offset = offset + boolean_count / 8;
            field.bit_offset = (boolean_count % 8) as i8;
            boolean_count += 1;
        }
        offset += (boolean_count + 7) / 8;

        let mut var_index = 0i32;
        for field in fields.iter_mut().filter(|f| !f.kind.is_fixed_size()) {
            field.index = var_index;
            var_index += 1;
        }

        let schema_id = fingerprint::schema_id(&type_name, &fields);
        let field_indices = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();

        tracing::debug!(
            type_name = %type_name,
            schema_id,
            field_count = fields.len(),
            "derived compact schema"
        );

        Self {
            type_name,
            fields,
            field_indices,
            schema_id,
            number_var_size_fields: var_index as usize,
            fixed_size_fields_length: offset as usize,
        }
    }

    /// Returns the type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the schema id (fingerprint).
    pub fn schema_id(&self) -> i64 {
        self.schema_id
    }

    /// Returns the number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns all fields sorted by name.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Returns the names of all fields in name order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name())
    }

    /// Returns a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_indices.get(name).map(|&i| &self.fields[i])
    }

    /// Returns the kind of a field by name.
    pub fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.field(name).map(FieldDescriptor::kind)
    }

    /// Returns true if the schema has a field with the given name.
    pub fn has_field(&self, name: &str) -> bool {
        self.field_indices.contains_key(name)
    }

    /// Number of entries in the offset table of an encoded object.
    pub fn number_var_size_fields(&self) -> usize {
        self.number_var_size_fields
    }

    /// Length of the fixed-size block, boolean bytes included.
    pub fn fixed_size_fields_length(&self) -> usize {
        self.fixed_size_fields_length
    }

    /// Writes the schema in its cluster transfer form.
    pub fn write_data<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        out.write_string(&self.type_name)?;
        out.write_int(self.fields.len() as i32)?;
        for field in &self.fields {
            out.write_string(&field.name)?;
            out.write_int(field.kind.id())?;
        }
        Ok(())
    }

    /// Reads a schema written by [`write_data`](Self::write_data).
    pub fn read_data<I: DataInput + ?Sized>(input: &mut I) -> Result<Self> {
        let type_name = input.read_string()?;
        let count = input.read_int()?;
        if count < 0 {
            return Err(CompactError::Serialization(format!(
                "invalid field count {} in schema of '{}'",
                count, type_name
            )));
        }
        let mut fields = Vec::with_capacity(count.min(1024) as usize);
        for _ in 0..count {
            let name = input.read_string()?;
            let kind = FieldKind::from_id(input.read_int()?)?;
            fields.push(FieldDescriptor::new(name, kind));
        }
        Self::new(type_name, fields)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.schema_id == other.schema_id
            && self.type_name == other.type_name
            && self.fields == other.fields
    }
}

impl Eq for Schema {}

impl Hash for Schema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema_id.hash(state);
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Schema {{ type_name: {}, schema_id: {}, fields: [",
            self.type_name, self.schema_id
        )?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", field.name, field.kind)?;
        }
        f.write_str("] }")
    }
}
