//! Record Module
//!
//! Domain records and the schema that describes them.
//!
//! ## Responsibilities
//! - Describe which fields a record has and how wide each one is on disk
//! - Identify the key field used by the hash index
//! - Encode/decode records to the compact variable-length tuple format
//!
//! ## Tuple Format
//! ```text
//! ┌───────────────────────────────┬──────────────────────────────────────┐
//! │ Fixed-width fields            │ Variable-length text fields          │
//! │ little-endian, declared order │ [len: u8][raw bytes], declared order │
//! └───────────────────────────────┴──────────────────────────────────────┘
//! ```

pub mod codec;

use std::fmt;

use crate::error::{KvError, Result};

pub use codec::{decode, decode_key, encode};

/// Widest key the index can hash (bytes)
pub const MAX_KEY_WIDTH: usize = 4;

/// Longest text value a 1-byte length prefix can describe
pub const MAX_TEXT_LEN: usize = u8::MAX as usize;

/// On-disk representation of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned integer stored little-endian in exactly `width` bytes
    UInt { width: usize },

    /// Text stored as a 1-byte length followed by the raw bytes
    Text,
}

/// A named field of a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn uint(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::UInt { width },
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
        }
    }
}

/// Ordered field layout of the records stored in one database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
    key_field: usize,
}

impl Schema {
    /// Create a schema, validating field widths and the key field
    pub fn new(fields: Vec<Field>, key_field: usize) -> Result<Self> {
        if fields.is_empty() {
            return Err(KvError::Config("Schema must have at least one field".to_string()));
        }

        for field in &fields {
            if let FieldKind::UInt { width } = field.kind {
                if width == 0 || width > 8 {
                    return Err(KvError::Config(format!(
                        "Field '{}' has width {}, expected 1..=8 bytes",
                        field.name, width
                    )));
                }
            }
        }

        match fields.get(key_field).map(|f| f.kind) {
            Some(FieldKind::UInt { width }) if width <= MAX_KEY_WIDTH => {}
            Some(_) => {
                return Err(KvError::Config(format!(
                    "Key field must be an unsigned integer of at most {} bytes",
                    MAX_KEY_WIDTH
                )))
            }
            None => {
                return Err(KvError::Config(format!(
                    "Key field index {} out of range ({} fields)",
                    key_field,
                    fields.len()
                )))
            }
        }

        Ok(Self { fields, key_field })
    }

    /// The user table layout: identifier, bounded integers, then contact text.
    ///
    /// Fixed-width columns are declared first so the tuple bytes follow the
    /// declared order exactly.
    pub fn users() -> Self {
        Self {
            fields: vec![
                Field::uint("id", 4),
                Field::uint("street_number", 2),
                Field::uint("zipcode", 4),
                Field::uint("birthdate_ts", 4),
                Field::uint("country_dct", 1),
                Field::text("name"),
                Field::text("email"),
                Field::text("phone"),
                Field::text("company"),
                Field::text("street"),
            ],
            key_field: 0,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn key_field(&self) -> usize {
        self.key_field
    }

    /// Byte offset of the key inside an encoded tuple, and its width
    pub fn key_span(&self) -> (usize, usize) {
        let offset = self
            .fixed_fields()
            .take_while(|(i, _)| *i != self.key_field)
            .map(|(_, w)| w)
            .sum();
        let width = match self.fields[self.key_field].kind {
            FieldKind::UInt { width } => width,
            FieldKind::Text => 0,
        };
        (offset, width)
    }

    /// Fixed-width fields as (position, width), in declared order
    pub(crate) fn fixed_fields(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.fields.iter().enumerate().filter_map(|(i, f)| match f.kind {
            FieldKind::UInt { width } => Some((i, width)),
            FieldKind::Text => None,
        })
    }

    /// Text field positions, in declared order
    pub(crate) fn text_fields(&self) -> impl Iterator<Item = usize> + '_ {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.kind == FieldKind::Text)
            .map(|(i, _)| i)
    }

    /// Stable checksum of the layout, stored in the meta file
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for field in &self.fields {
            hasher.update(field.name.as_bytes());
            match field.kind {
                FieldKind::UInt { width } => hasher.update(&[b'u', width as u8]),
                FieldKind::Text => hasher.update(&[b't']),
            }
        }
        hasher.update(&(self.key_field as u32).to_le_bytes());
        hasher.finalize()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::users()
    }
}

/// A single field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    UInt(u64),
    Text(String),
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::UInt(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One domain record, values in schema order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Extract the index key according to `schema`
    pub fn key(&self, schema: &Schema) -> Result<u32> {
        match self.values.get(schema.key_field()) {
            Some(Value::UInt(v)) => u32::try_from(*v).map_err(|_| {
                KvError::Encoding(format!("Key {} does not fit in {} bytes", v, MAX_KEY_WIDTH))
            }),
            Some(Value::Text(_)) => Err(KvError::Encoding("Key field holds text".to_string())),
            None => Err(KvError::Encoding(format!(
                "Record has {} values, key field is #{}",
                self.values.len(),
                schema.key_field()
            ))),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}
