//! Key hashing
//!
//! A key hash is a 32-bit string. Its first character is the key's least
//! significant bit, so the first `d` characters of the string are the low
//! `d` bits of the key and a directory prefix is `hash & (2^d - 1)`.

use std::fmt;

/// Number of bits in a key hash
pub const KEY_BITS: u8 = 32;

/// Fixed-width bit string derived from a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyHash(u32);

impl KeyHash {
    /// Hash a record key
    pub fn of(key: u32) -> Self {
        Self(key)
    }

    /// Bit `i` of the string (0 = first character)
    pub fn bit(&self, i: u8) -> u8 {
        ((self.0 >> i) & 1) as u8
    }

    /// The first `depth` bits, as a directory index
    pub fn prefix(&self, depth: u8) -> usize {
        (self.0 as u64 & prefix_mask(depth)) as usize
    }

    /// Integer whose big-endian binary digits spell the bit string
    pub fn to_disk(&self) -> u32 {
        self.0.reverse_bits()
    }

    pub fn from_disk(raw: u32) -> Self {
        Self(raw.reverse_bits())
    }

    /// The first `depth` characters of the bit string
    pub fn bit_string(&self, depth: u8) -> String {
        (0..depth.min(KEY_BITS))
            .map(|i| if self.bit(i) == 1 { '1' } else { '0' })
            .collect()
    }
}

impl fmt::Display for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bit_string(KEY_BITS))
    }
}

/// Mask selecting the low `depth` bits
pub(crate) fn prefix_mask(depth: u8) -> u64 {
    (1u64 << depth) - 1
}
