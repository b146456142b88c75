use std::fmt;

use crate::common::{RecordId, Result};

use super::{Field, TupleDesc};

/// A single row: a descriptor plus one value per described field.
///
/// The record id is absent for tuples built in memory and is stamped by
/// the storage layer when the tuple is materialized from (or inserted
/// into) a heap page.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    desc: TupleDesc,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Creates a new tuple.
    ///
    /// # Panics
    /// Panics if the field count or any field type disagrees with the
    /// descriptor.
    pub fn new(desc: TupleDesc, fields: Vec<Field>) -> Self {
        assert_eq!(
            fields.len(),
            desc.num_fields(),
            "field count must match the descriptor"
        );
        for (i, field) in fields.iter().enumerate() {
            assert_eq!(
                field.field_type(),
                desc.field_type(i).expect("index in range"),
                "field {i} type must match the descriptor"
            );
        }
        Self {
            desc,
            fields,
            record_id: None,
        }
    }

    /// Deserializes a tuple from its fixed-width slot encoding.
    /// `data` must hold at least `desc.size()` bytes.
    pub fn from_bytes(desc: &TupleDesc, data: &[u8]) -> Result<Self> {
        let mut fields = Vec::with_capacity(desc.num_fields());
        let mut offset = 0;
        for item in desc.items() {
            fields.push(Field::read_from(item.field_type, &data[offset..])?);
            offset += item.field_type.len();
        }
        Ok(Self {
            desc: desc.clone(),
            fields,
            record_id: None,
        })
    }

    /// Serializes the tuple as the concatenation of its field encodings
    /// in descriptor order. The result is exactly `desc.size()` bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.desc.size());
        for field in &self.fields {
            field.write_to(&mut buf);
        }
        buf
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    /// Returns the value of the i-th field.
    pub fn field(&self, i: usize) -> Option<&Field> {
        self.fields.get(i)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Overwrites the value of the i-th field.
    ///
    /// # Panics
    /// Panics if the index is out of range or the value's type disagrees
    /// with the descriptor.
    pub fn set_field(&mut self, i: usize, field: Field) {
        assert_eq!(
            field.field_type(),
            self.desc.field_type(i).expect("field index in range"),
            "field type must match the descriptor"
        );
        self.fields[i] = field;
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.record_id = rid;
    }

    /// Concatenates two tuples into one with the merged descriptor.
    /// The result carries no record id.
    pub fn merge(a: &Tuple, b: &Tuple) -> Tuple {
        let desc = TupleDesc::merge(&a.desc, &b.desc);
        let mut fields = a.fields.clone();
        fields.extend(b.fields.iter().cloned());
        Tuple::new(desc, fields)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}
