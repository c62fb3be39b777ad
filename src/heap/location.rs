//! Location descriptor
//!
//! Identifies one slot in one page. Stored as the value side of the hash
//! index: `[page_number: u64 LE][slot_address: u64 LE]`.

use std::fmt;

use crate::error::{KvError, Result};
use crate::index::VALUE_WIDTH;

/// (page_number, slot_address) pair addressing one tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub page: u64,
    pub slot: u64,
}

impl Location {
    pub fn new(page: u64, slot: u64) -> Self {
        Self { page, slot }
    }

    pub fn to_bytes(&self) -> [u8; VALUE_WIDTH] {
        let mut bytes = [0u8; VALUE_WIDTH];
        bytes[..8].copy_from_slice(&self.page.to_le_bytes());
        bytes[8..].copy_from_slice(&self.slot.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != VALUE_WIDTH {
            return Err(KvError::Corruption(format!(
                "Location must be {} bytes, got {}",
                VALUE_WIDTH,
                bytes.len()
            )));
        }
        let mut page = [0u8; 8];
        let mut slot = [0u8; 8];
        page.copy_from_slice(&bytes[..8]);
        slot.copy_from_slice(&bytes[8..]);
        Ok(Self {
            page: u64::from_le_bytes(page),
            slot: u64::from_le_bytes(slot),
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} slot {}", self.page, self.slot)
    }
}
