//! Record codec
//!
//! Encoding and decoding functions for the tuple format.
//!
//! Fixed-width fields come first, each as a little-endian unsigned integer of
//! its declared width. Text fields follow as `[len: u8][bytes]`. The decoder
//! finds every text boundary from the preceding length byte.

use bytes::{Buf, BufMut};

use super::{FieldKind, Record, Schema, Value, MAX_TEXT_LEN};
use crate::error::{KvError, Result};

/// Encode a record to tuple bytes
///
/// Fails with `Encoding` before producing any output if a value does not
/// fit its declared width or has the wrong type.
pub fn encode(schema: &Schema, record: &Record) -> Result<Vec<u8>> {
    let values = record.values();
    if values.len() != schema.fields().len() {
        return Err(KvError::Encoding(format!(
            "Record has {} values, schema declares {} fields",
            values.len(),
            schema.fields().len()
        )));
    }

    let mut buf = Vec::with_capacity(encoded_len_hint(schema, record));

    for (pos, width) in schema.fixed_fields() {
        let name = &schema.fields()[pos].name;
        let v = match &values[pos] {
            Value::UInt(v) => *v,
            Value::Text(_) => {
                return Err(KvError::Encoding(format!("Field '{}' expects an integer", name)))
            }
        };
        if width < 8 && v >> (8 * width) != 0 {
            return Err(KvError::Encoding(format!(
                "Value {} of field '{}' exceeds {} bytes",
                v, name, width
            )));
        }
        buf.put_uint_le(v, width);
    }

    for pos in schema.text_fields() {
        let name = &schema.fields()[pos].name;
        let s = match &values[pos] {
            Value::Text(s) => s,
            Value::UInt(_) => {
                return Err(KvError::Encoding(format!("Field '{}' expects text", name)))
            }
        };
        if s.len() > MAX_TEXT_LEN {
            return Err(KvError::Encoding(format!(
                "Text field '{}' is {} bytes, max {}",
                name,
                s.len(),
                MAX_TEXT_LEN
            )));
        }
        buf.put_u8(s.len() as u8);
        buf.put_slice(s.as_bytes());
    }

    Ok(buf)
}

/// Decode tuple bytes back into a record
pub fn decode(schema: &Schema, bytes: &[u8]) -> Result<Record> {
    let mut buf = bytes;
    let mut values: Vec<Option<Value>> = vec![None; schema.fields().len()];

    for (pos, width) in schema.fixed_fields() {
        ensure_remaining(buf, width, &schema.fields()[pos].name)?;
        values[pos] = Some(Value::UInt(buf.get_uint_le(width)));
    }

    for pos in schema.text_fields() {
        let name = &schema.fields()[pos].name;
        ensure_remaining(buf, 1, name)?;
        let len = buf.get_u8() as usize;
        ensure_remaining(buf, len, name)?;
        let text = String::from_utf8(buf[..len].to_vec())
            .map_err(|e| KvError::Corruption(format!("Field '{}' is not UTF-8: {}", name, e)))?;
        buf.advance(len);
        values[pos] = Some(Value::Text(text));
    }

    if buf.has_remaining() {
        return Err(KvError::Corruption(format!(
            "{} trailing bytes after last field",
            buf.remaining()
        )));
    }

    values
        .into_iter()
        .map(|v| v.ok_or_else(|| KvError::Corruption("Field missing after decode".to_string())))
        .collect::<Result<Vec<_>>>()
        .map(Record::new)
}

/// Read only the key field from tuple bytes
pub fn decode_key(schema: &Schema, bytes: &[u8]) -> Result<u32> {
    let (offset, width) = schema.key_span();
    let mut buf = bytes
        .get(offset..offset + width)
        .ok_or_else(|| KvError::Corruption(format!("Tuple of {} bytes has no key", bytes.len())))?;
    Ok(buf.get_uint_le(width) as u32)
}

fn ensure_remaining(buf: &[u8], needed: usize, field: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(KvError::Corruption(format!(
            "Truncated tuple at field '{}': need {} bytes, {} left",
            field,
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}

fn encoded_len_hint(schema: &Schema, record: &Record) -> usize {
    schema
        .fields()
        .iter()
        .zip(record.values())
        .map(|(field, value)| match (field.kind, value) {
            (FieldKind::UInt { width }, _) => width,
            (FieldKind::Text, Value::Text(s)) => 1 + s.len(),
            (FieldKind::Text, _) => 1,
        })
        .sum()
}
