//! Bucket
//!
//! Fixed-capacity list of (key hash, value) pairs, persisted as a
//! fixed-size record.

use bytes::{Buf, BufMut};

use super::hash::KeyHash;
use super::{KEY_WIDTH, VALUE_WIDTH};
use crate::error::{KvError, Result};

/// LocalDepth (1) + Capacity (1) + Size (1) + BucketId (4)
pub const BUCKET_HEADER_SIZE: usize = 7;

/// KeyHash (4) + Value (16)
pub const ENTRY_SIZE: usize = KEY_WIDTH + VALUE_WIDTH;

/// Serialized size of every bucket with the given capacity
pub fn record_size(capacity: usize) -> usize {
    BUCKET_HEADER_SIZE + capacity * ENTRY_SIZE
}

/// One entry of a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketValue {
    pub key_hash: KeyHash,
    pub value: [u8; VALUE_WIDTH],
}

impl BucketValue {
    pub fn new(key_hash: KeyHash, value: [u8; VALUE_WIDTH]) -> Self {
        Self { key_hash, value }
    }
}

/// A bucket of the extendible hash index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    id: u32,
    local_depth: u8,
    capacity: usize,
    entries: Vec<BucketValue>,
}

impl Bucket {
    pub fn new(id: u32, local_depth: u8, capacity: usize) -> Self {
        Self {
            id,
            local_depth,
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn local_depth(&self) -> u8 {
        self.local_depth
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn entries(&self) -> &[BucketValue] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<BucketValue> {
        self.entries
    }

    /// Insert or overwrite an entry
    ///
    /// Returns false only when the bucket is full and the key is new.
    pub fn insert(&mut self, value: BucketValue) -> bool {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.key_hash == value.key_hash) {
            existing.value = value.value;
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.entries.push(value);
        true
    }

    /// Remove the entry for `key_hash`, returning whether it existed
    pub fn delete(&mut self, key_hash: KeyHash) -> bool {
        match self.entries.iter().position(|e| e.key_hash == key_hash) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn search(&self, key_hash: KeyHash) -> Option<&BucketValue> {
        self.entries.iter().find(|e| e.key_hash == key_hash)
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Header and live entries, without padding
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BUCKET_HEADER_SIZE + self.entries.len() * ENTRY_SIZE);
        buf.put_u8(self.local_depth);
        buf.put_u8(self.capacity as u8);
        buf.put_u8(self.entries.len() as u8);
        buf.put_u32(self.id);
        for entry in &self.entries {
            buf.put_u32(entry.key_hash.to_disk());
            buf.put_slice(&entry.value);
        }
        buf
    }

    /// Serialize and zero-pad to the fixed record size of this capacity
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = self.serialize();
        buf.resize(record_size(self.capacity).max(buf.len()), 0);
        buf
    }

    /// Parse a bucket record, validating it against the configured capacity
    pub fn from_bytes(bytes: &[u8], capacity: usize) -> Result<Self> {
        let mut buf = bytes;
        if buf.remaining() < BUCKET_HEADER_SIZE {
            return Err(KvError::Corruption(format!(
                "Bucket record of {} bytes is shorter than its header",
                bytes.len()
            )));
        }

        let local_depth = buf.get_u8();
        let stored_capacity = buf.get_u8() as usize;
        let size = buf.get_u8() as usize;
        let id = buf.get_u32();

        if stored_capacity != capacity {
            return Err(KvError::Corruption(format!(
                "Bucket {} has capacity {}, expected {}",
                id, stored_capacity, capacity
            )));
        }
        if size > capacity {
            return Err(KvError::Corruption(format!(
                "Bucket {} holds {} entries, capacity {}",
                id, size, capacity
            )));
        }
        if buf.remaining() < size * ENTRY_SIZE {
            return Err(KvError::Corruption(format!(
                "Bucket {} record truncated: {} entries need {} bytes, {} left",
                id,
                size,
                size * ENTRY_SIZE,
                buf.remaining()
            )));
        }

        let mut entries = Vec::with_capacity(capacity);
        for _ in 0..size {
            let key_hash = KeyHash::from_disk(buf.get_u32());
            let mut value = [0u8; VALUE_WIDTH];
            buf.copy_to_slice(&mut value);
            entries.push(BucketValue::new(key_hash, value));
        }

        Ok(Self {
            id,
            local_depth,
            capacity,
            entries,
        })
    }
}
