//! Store metadata
//!
//! Guards the heap and bucket files against being read with a different
//! geometry than the one they were written with. Neither data file carries
//! a header of its own, so the writer's configuration is recorded here on
//! first open and checked on every later open.
//!
//! ## File Format
//! ```text
//! ┌──────────┬──────────┬──────────────────────────┐
//! │ Len (4)  │ CRC (4)  │ bincode payload (Len)    │
//! └──────────┴──────────┴──────────────────────────┘
//! ```
//! The same checked framing is used for the directory snapshot.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::index::{KEY_WIDTH, VALUE_WIDTH};

/// Magic bytes identifying a SlotKV data directory
pub const MAGIC: [u8; 4] = *b"SLKV";

/// Current on-disk format version
pub const FORMAT_VERSION: u16 = 1;

/// Length (4) + CRC (4)
const FRAME_HEADER_SIZE: usize = 8;

/// Layout parameters shared by writer and reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub magic: [u8; 4],
    pub version: u16,
    pub page_size: u32,
    pub header_size: u8,
    pub slot_width: u8,
    pub bucket_capacity: u8,
    pub key_width: u8,
    pub value_width: u8,
    pub schema_fingerprint: u32,
}

impl StoreMeta {
    /// Metadata describing files written with `config`
    pub fn from_config(config: &Config) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            page_size: config.page_size as u32,
            header_size: config.header_size as u8,
            slot_width: config.slot_width as u8,
            bucket_capacity: config.bucket_capacity as u8,
            key_width: KEY_WIDTH as u8,
            value_width: VALUE_WIDTH as u8,
            schema_fingerprint: config.schema.fingerprint(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_checked(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_checked(path, self)
    }

    /// Fail if files described by `self` cannot be read as `expected`
    pub fn check_compatible(&self, expected: &StoreMeta) -> Result<()> {
        if self.magic != MAGIC {
            return Err(KvError::Config(format!(
                "Invalid meta magic: expected SLKV, got {:?}",
                self.magic
            )));
        }
        if self.version != FORMAT_VERSION {
            return Err(KvError::Config(format!(
                "Unsupported format version: {}",
                self.version
            )));
        }

        let mut mismatches = Vec::new();
        let mut compare = |name: &str, stored: u64, wanted: u64| {
            if stored != wanted {
                mismatches.push(format!("{} (stored {}, configured {})", name, stored, wanted));
            }
        };
        compare("page_size", self.page_size as u64, expected.page_size as u64);
        compare("header_size", self.header_size as u64, expected.header_size as u64);
        compare("slot_width", self.slot_width as u64, expected.slot_width as u64);
        compare("bucket_capacity", self.bucket_capacity as u64, expected.bucket_capacity as u64);
        compare("key_width", self.key_width as u64, expected.key_width as u64);
        compare("value_width", self.value_width as u64, expected.value_width as u64);
        compare(
            "schema",
            self.schema_fingerprint as u64,
            expected.schema_fingerprint as u64,
        );

        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(KvError::Config(format!(
                "Data files were written with a different layout: {}",
                mismatches.join(", ")
            )))
        }
    }
}

/// Serialize `value` with bincode and write it with a length + CRC frame
pub(crate) fn write_checked<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let payload = bincode::serialize(value).map_err(|e| KvError::Serialization(e.to_string()))?;
    let crc = crc32fast::hash(&payload);

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&crc.to_le_bytes());
    frame.extend_from_slice(&payload);

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(&frame)?;
    file.sync_all()?;

    Ok(())
}

/// Read a frame written by `write_checked`, verifying length and CRC
pub(crate) fn read_checked<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let frame = fs::read(path)?;
    if frame.len() < FRAME_HEADER_SIZE {
        return Err(KvError::Corruption(format!(
            "{} is {} bytes, shorter than its frame header",
            path.display(),
            frame.len()
        )));
    }

    let mut len = [0u8; 4];
    let mut crc = [0u8; 4];
    len.copy_from_slice(&frame[0..4]);
    crc.copy_from_slice(&frame[4..8]);
    let len = u32::from_le_bytes(len) as usize;
    let crc = u32::from_le_bytes(crc);

    let payload = &frame[FRAME_HEADER_SIZE..];
    if payload.len() != len {
        return Err(KvError::Corruption(format!(
            "{}: payload is {} bytes, header says {}",
            path.display(),
            payload.len(),
            len
        )));
    }
    if crc32fast::hash(payload) != crc {
        return Err(KvError::Corruption(format!("{}: checksum mismatch", path.display())));
    }

    bincode::deserialize(payload).map_err(|e| KvError::Serialization(e.to_string()))
}
