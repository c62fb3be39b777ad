//! Slotted page
//!
//! One fixed-size block holding variable-length tuples. The slot array grows
//! forward from the tuple counter; tuple bytes grow backward from the end of
//! the block. Removing a tuple closes the gap immediately, so live tuples are
//! always contiguous in `[tuple_base, page_size)`.

use crate::error::{KvError, Result};

/// Geometry shared by every page of a heap file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    /// Total page size in bytes
    pub page_size: usize,
    /// Width of the little-endian tuple counter
    pub header_size: usize,
    /// Width of one little-endian slot (tuple offset)
    pub slot_width: usize,
}

impl PageLayout {
    pub fn new(page_size: usize, header_size: usize, slot_width: usize) -> Self {
        Self {
            page_size,
            header_size,
            slot_width,
        }
    }

    /// Largest tuple an empty page can hold
    pub fn max_tuple_size(&self) -> usize {
        self.page_size
            .saturating_sub(self.header_size)
            .saturating_sub(self.slot_width)
    }
}

/// Outcome of removing a tuple from a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Size of the removed tuple
    pub freed: usize,
    /// New slot addresses of the tuples whose slot moved back by one
    pub relocated: Vec<usize>,
}

/// An in-memory copy of one page
#[derive(Debug, Clone)]
pub struct Page {
    layout: PageLayout,
    data: Vec<u8>,
    tuple_base: usize,
}

impl Page {
    /// Create an empty, zero-filled page
    pub fn new(layout: PageLayout) -> Self {
        Self {
            layout,
            data: vec![0u8; layout.page_size],
            tuple_base: layout.page_size,
        }
    }

    /// Load a page from raw bytes
    ///
    /// The tuple area boundary is recovered from the last slot.
    pub fn load(layout: PageLayout, raw: Vec<u8>) -> Result<Self> {
        if raw.len() != layout.page_size {
            return Err(KvError::Corruption(format!(
                "Invalid page size: expected {}B, got {}B",
                layout.page_size,
                raw.len()
            )));
        }

        let mut page = Self {
            layout,
            data: raw,
            tuple_base: layout.page_size,
        };

        let count = page.tuple_count();
        if count > 0 {
            let slots_end = layout.header_size + count * layout.slot_width;
            if slots_end > layout.page_size {
                return Err(KvError::Corruption(format!(
                    "Tuple count {} overflows the page",
                    count
                )));
            }

            let base = page.read_slot(count - 1);
            if base < slots_end || base > layout.page_size {
                return Err(KvError::Corruption(format!(
                    "Tuple area starts at {} inside the slot array (ends at {})",
                    base, slots_end
                )));
            }
            page.tuple_base = base;
        }

        Ok(page)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn layout(&self) -> PageLayout {
        self.layout
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Offset of the lowest tuple byte (page_size when empty)
    pub fn tuple_base(&self) -> usize {
        self.tuple_base
    }

    pub fn tuple_count(&self) -> usize {
        read_uint_le(&self.data[..self.layout.header_size])
    }

    /// Bytes between the end of the slot array and the tuple area
    pub fn free_space(&self) -> usize {
        self.tuple_base - self.slots_end()
    }

    /// Whether a tuple of `len` bytes plus its slot fits
    pub fn fits(&self, len: usize) -> bool {
        self.free_space() >= len + self.layout.slot_width
    }

    /// Slot addresses of every live tuple, in slot order
    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.tuple_count()).map(move |i| self.slot_address(i))
    }

    pub fn is_valid_slot_address(&self, slot_address: usize) -> bool {
        let count = self.tuple_count();
        let first = self.layout.header_size;
        count > 0
            && slot_address >= first
            && slot_address <= first + (count - 1) * self.layout.slot_width
            && (slot_address - first) % self.layout.slot_width == 0
    }

    /// Tuple offset stored in the slot at `slot_address`
    pub fn tuple_address_of(&self, slot_address: usize) -> Result<usize> {
        self.check_slot(slot_address)?;
        Ok(self.read_slot(self.slot_index(slot_address)))
    }

    /// (offset, length) of the tuple behind `slot_address`
    ///
    /// Tuples are laid out in reverse append order, so a tuple ends where the
    /// tuple of the previous slot begins.
    pub fn tuple_span(&self, slot_address: usize) -> Result<(usize, usize)> {
        self.check_slot(slot_address)?;
        let index = self.slot_index(slot_address);
        let offset = self.read_slot(index);
        let end = if index == 0 {
            self.layout.page_size
        } else {
            self.read_slot(index - 1)
        };

        if end < offset || end > self.layout.page_size {
            return Err(KvError::Corruption(format!(
                "Slot {} points at {} past its tuple end {}",
                slot_address, offset, end
            )));
        }
        Ok((offset, end - offset))
    }

    /// Tuple bytes behind `slot_address`
    pub fn tuple(&self, slot_address: usize) -> Result<&[u8]> {
        let (offset, len) = self.tuple_span(slot_address)?;
        Ok(&self.data[offset..offset + len])
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Append a tuple and return the address of its new slot
    pub fn append(&mut self, tuple: &[u8]) -> Result<usize> {
        if !self.fits(tuple.len()) {
            return Err(KvError::PageFull {
                needed: tuple.len() + self.layout.slot_width,
                available: self.free_space(),
            });
        }

        let count = self.tuple_count();
        let new_base = self.tuple_base - tuple.len();
        self.data[new_base..self.tuple_base].copy_from_slice(tuple);
        self.tuple_base = new_base;

        self.write_slot(count, new_base);
        self.set_tuple_count(count + 1);

        Ok(self.slot_address(count))
    }

    /// Remove the tuple behind `slot_address`, compacting in place
    ///
    /// Tuples stored below the removed one shift up by its size and their
    /// slots move back by one position with their offsets adjusted.
    pub fn remove(&mut self, slot_address: usize) -> Result<Removal> {
        let (offset, size) = self.tuple_span(slot_address)?;
        let count = self.tuple_count();
        let index = self.slot_index(slot_address);
        let base = self.tuple_base;

        self.data.copy_within(base..offset, base + size);

        for j in index + 1..count {
            let moved = self.read_slot(j) + size;
            self.write_slot(j - 1, moved);
        }

        let last = self.slot_address(count - 1);
        self.data[last..last + self.layout.slot_width].fill(0);
        self.data[base..base + size].fill(0);

        self.tuple_base = base + size;
        self.set_tuple_count(count - 1);

        Ok(Removal {
            freed: size,
            relocated: (index..count - 1).map(|j| self.slot_address(j)).collect(),
        })
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_slot(&self, slot_address: usize) -> Result<()> {
        if !self.is_valid_slot_address(slot_address) {
            return Err(KvError::InvalidSlotAddress {
                slot_address,
                tuple_count: self.tuple_count(),
            });
        }
        Ok(())
    }

    fn slots_end(&self) -> usize {
        self.layout.header_size + self.tuple_count() * self.layout.slot_width
    }

    fn slot_address(&self, index: usize) -> usize {
        self.layout.header_size + index * self.layout.slot_width
    }

    fn slot_index(&self, slot_address: usize) -> usize {
        (slot_address - self.layout.header_size) / self.layout.slot_width
    }

    fn read_slot(&self, index: usize) -> usize {
        let at = self.slot_address(index);
        read_uint_le(&self.data[at..at + self.layout.slot_width])
    }

    fn write_slot(&mut self, index: usize, tuple_offset: usize) {
        let at = self.slot_address(index);
        write_uint_le(&mut self.data[at..at + self.layout.slot_width], tuple_offset);
    }

    fn set_tuple_count(&mut self, count: usize) {
        let width = self.layout.header_size;
        write_uint_le(&mut self.data[..width], count);
    }
}

fn read_uint_le(bytes: &[u8]) -> usize {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(buf) as usize
}

fn write_uint_le(dst: &mut [u8], value: usize) {
    let width = dst.len();
    dst.copy_from_slice(&(value as u64).to_le_bytes()[..width]);
}
