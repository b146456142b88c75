use std::cmp::Ordering;
use std::fmt;

use crate::common::{DbError, Result, STRING_LEN};

use super::FieldType;

/// A single typed value stored in a tuple.
/// The variant set is closed; comparison and serialization dispatch on
/// the tag instead of open inheritance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl Field {
    /// Returns the type tag of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Int(_) => FieldType::Int,
            Field::Str(_) => FieldType::Str,
        }
    }

    /// Appends this field's fixed-width encoding to `buf`.
    ///
    /// Integers are written big-endian. Strings are written as a 4-byte
    /// big-endian length prefix followed by exactly `STRING_LEN` payload
    /// bytes; payloads longer than `STRING_LEN` are truncated.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Field::Int(v) => buf.extend_from_slice(&v.to_be_bytes()),
            Field::Str(s) => {
                let bytes = s.as_bytes();
                let len = bytes.len().min(STRING_LEN);
                buf.extend_from_slice(&(len as u32).to_be_bytes());
                buf.extend_from_slice(&bytes[..len]);
                buf.extend(std::iter::repeat(0u8).take(STRING_LEN - len));
            }
        }
    }

    /// Decodes one field of the given type from the front of `data`.
    /// `data` must hold at least `field_type.len()` bytes.
    pub fn read_from(field_type: FieldType, data: &[u8]) -> Result<Self> {
        if data.len() < field_type.len() {
            return Err(DbError::Corrupt(format!(
                "field of type {} needs {} bytes, found {}",
                field_type,
                field_type.len(),
                data.len()
            )));
        }

        match field_type {
            FieldType::Int => {
                let bytes: [u8; 4] = data[..4].try_into().expect("length checked above");
                Ok(Field::Int(i32::from_be_bytes(bytes)))
            }
            FieldType::Str => {
                let bytes: [u8; 4] = data[..4].try_into().expect("length checked above");
                let len = u32::from_be_bytes(bytes) as usize;
                if len > STRING_LEN {
                    return Err(DbError::Corrupt(format!(
                        "string length prefix {} exceeds maximum {}",
                        len, STRING_LEN
                    )));
                }
                let s = std::str::from_utf8(&data[4..4 + len])
                    .map_err(|e| DbError::Corrupt(format!("invalid UTF-8 in string field: {e}")))?;
                Ok(Field::Str(s.to_string()))
            }
        }
    }

    /// Compares two fields of the same type.
    /// Returns None for fields of different types, which never compare.
    pub fn compare_to(&self, other: &Field) -> Option<Ordering> {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => Some(a.cmp(b)),
            (Field::Str(a), Field::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Int(v)
    }
}

impl From<&str> for Field {
    fn from(v: &str) -> Self {
        Field::Str(v.to_string())
    }
}

impl From<String> for Field {
    fn from(v: String) -> Self {
        Field::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_roundtrip() {
        let mut buf = Vec::new();
        Field::Int(-7).write_to(&mut buf);
        assert_eq!(buf, (-7i32).to_be_bytes());

        let back = Field::read_from(FieldType::Int, &buf).unwrap();
        assert_eq!(back, Field::Int(-7));
    }

    #[test]
    fn test_str_roundtrip() {
        let mut buf = Vec::new();
        Field::from("hello").write_to(&mut buf);
        assert_eq!(buf.len(), FieldType::Str.len());
        assert_eq!(&buf[..4], &5u32.to_be_bytes());
        assert_eq!(&buf[4..9], b"hello");
        assert!(buf[9..].iter().all(|&b| b == 0));

        let back = Field::read_from(FieldType::Str, &buf).unwrap();
        assert_eq!(back, Field::from("hello"));
    }

    #[test]
    fn test_str_truncated_at_max_len() {
        let long = "x".repeat(STRING_LEN + 50);
        let mut buf = Vec::new();
        Field::from(long).write_to(&mut buf);
        assert_eq!(buf.len(), FieldType::Str.len());

        let back = Field::read_from(FieldType::Str, &buf).unwrap();
        assert_eq!(back, Field::from("x".repeat(STRING_LEN)));
    }

    #[test]
    fn test_bad_length_prefix_is_corrupt() {
        let mut buf = vec![0u8; FieldType::Str.len()];
        buf[..4].copy_from_slice(&(STRING_LEN as u32 + 1).to_be_bytes());
        assert!(matches!(
            Field::read_from(FieldType::Str, &buf),
            Err(DbError::Corrupt(_))
        ));
    }

    #[test]
    fn test_comparison() {
        assert_eq!(
            Field::Int(10).compare_to(&Field::Int(20)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Field::from("abd").compare_to(&Field::from("abc")),
            Some(Ordering::Greater)
        );
        assert_eq!(Field::Int(1).compare_to(&Field::from("1")), None);
    }
}
