use std::fmt;

use crate::common::{DbError, Result};

use super::FieldType;

/// One entry of a tuple descriptor: a field type and an optional name.
/// Names are informational; they never participate in descriptor equality.
#[derive(Debug, Clone)]
pub struct TdItem {
    pub field_type: FieldType,
    pub name: Option<String>,
}

impl TdItem {
    pub fn new(field_type: FieldType, name: Option<String>) -> Self {
        Self { field_type, name }
    }
}

impl fmt::Display for TdItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({})",
            self.name.as_deref().unwrap_or("null"),
            self.field_type
        )
    }
}

/// The schema of a tuple: an ordered, non-empty sequence of typed,
/// optionally named fields. Tuples described by the same descriptor all
/// serialize to the same number of bytes.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    /// Creates a descriptor from its items.
    ///
    /// # Panics
    /// Panics if `items` is empty.
    pub fn new(items: Vec<TdItem>) -> Self {
        assert!(!items.is_empty(), "a tuple descriptor needs at least one field");
        Self { items }
    }

    /// Creates a descriptor with anonymous fields of the given types.
    pub fn with_types(types: &[FieldType]) -> Self {
        Self::new(types.iter().map(|&t| TdItem::new(t, None)).collect())
    }

    /// Creates a descriptor with named fields.
    ///
    /// # Panics
    /// Panics if `types` and `names` differ in length.
    pub fn with_names(types: &[FieldType], names: &[&str]) -> Self {
        assert_eq!(types.len(), names.len());
        Self::new(
            types
                .iter()
                .zip(names)
                .map(|(&t, &n)| TdItem::new(t, Some(n.to_string())))
                .collect(),
        )
    }

    /// Returns the number of fields.
    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    /// Returns the type of the i-th field.
    pub fn field_type(&self, i: usize) -> Result<FieldType> {
        self.items
            .get(i)
            .map(|item| item.field_type)
            .ok_or_else(|| DbError::NoSuchField(format!("field index {i}")))
    }

    /// Returns the (possibly absent) name of the i-th field.
    pub fn field_name(&self, i: usize) -> Result<Option<&str>> {
        self.items
            .get(i)
            .map(|item| item.name.as_deref())
            .ok_or_else(|| DbError::NoSuchField(format!("field index {i}")))
    }

    /// Finds the index of the first field with the given name.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.name.as_deref() == Some(name))
            .ok_or_else(|| DbError::NoSuchField(name.to_string()))
    }

    /// Returns the serialized size in bytes of a tuple with this descriptor.
    pub fn size(&self) -> usize {
        self.items.iter().map(|item| item.field_type.len()).sum()
    }

    /// Returns an iterator over the descriptor's items.
    pub fn items(&self) -> impl Iterator<Item = &TdItem> {
        self.items.iter()
    }

    /// Concatenates two descriptors, first all of `a`'s fields then all
    /// of `b`'s. Used by the join operator to describe merged tuples.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let mut items = a.items.clone();
        items.extend(b.items.iter().cloned());
        TupleDesc::new(items)
    }

    /// Returns a copy of this descriptor with every field name prefixed
    /// by `alias.`. Unnamed fields get the literal name `null`, matching
    /// what a scan over an anonymous schema reports.
    pub fn prefixed(&self, alias: &str) -> TupleDesc {
        TupleDesc::new(
            self.items
                .iter()
                .map(|item| {
                    let name = item.name.as_deref().unwrap_or("null");
                    TdItem::new(item.field_type, Some(format!("{alias}.{name}")))
                })
                .collect(),
        )
    }
}

impl PartialEq for TupleDesc {
    /// Two descriptors are equal iff they have the same number of fields
    /// and the i-th types match. Field names are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for TupleDesc {}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}
