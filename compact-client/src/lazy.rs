//! Collections of encoded values decoded one element at a time.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use compact_core::{CompactError, CompactStreamSerializer, Data, Result};

/// A read-only list of encoded values, each decoded when it is accessed.
///
/// A failing element does not affect its siblings. An element whose schema is
/// not known locally fails with a serialization error whose source is the
/// [`CompactError::SchemaNotFound`]; fetching the schema and accessing the
/// element again succeeds.
pub struct ReadOnlyLazyList<T> {
    items: Vec<Data>,
    serializer: Arc<CompactStreamSerializer>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> ReadOnlyLazyList<T> {
    /// Creates a list over encoded `items`.
    pub fn new(items: Vec<Data>, serializer: Arc<CompactStreamSerializer>) -> Self {
        Self {
            items,
            serializer,
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the list has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Decodes the element at `index`; `None` if out of bounds.
    pub fn get(&self, index: usize) -> Option<Result<T>> {
        self.items.get(index).map(|data| self.decode(index, data))
    }

    /// Iterates over the decoded elements.
    pub fn iter(&self) -> impl Iterator<Item = Result<T>> + '_ {
        self.items
            .iter()
            .enumerate()
            .map(move |(index, data)| self.decode(index, data))
    }

    /// Decodes every element, failing on the first element that fails.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.iter().collect()
    }

    /// Returns the encoded elements.
    pub fn data(&self) -> &[Data] {
        &self.items
    }

    fn decode(&self, index: usize, data: &Data) -> Result<T> {
        self.serializer.from_data::<T>(data).map_err(|err| match err {
            err @ CompactError::SchemaNotFound { schema_id } => CompactError::caused_by(
                format!(
                    "cannot decode list element {}: schema {} is not known locally",
                    index, schema_id
                ),
                err,
            ),
            other => other,
        })
    }
}

impl<T> fmt::Debug for ReadOnlyLazyList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnlyLazyList")
            .field("len", &self.items.len())
            .finish()
    }
}
