//! Heap file manager
//!
//! Pages of one file, a free-space index, and record operations that keep
//! the hash index pointing at every tuple.
//!
//! ## Responsibilities
//! - Rebuild the free-space index from the file on open
//! - First-fit page choice, appending a zeroed page when nothing fits
//! - Create/read/update/delete records by key, resolving locations through
//!   the index
//! - Re-register every tuple whose slot moves during compaction

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::location::Location;
use super::page::{Page, PageLayout};
use crate::error::{KvError, Result};
use crate::index::ExtendibleHashIndex;
use crate::record::{self, Record, Schema};

/// Manages the heap file
pub struct HeapFile {
    /// Path of the heap file
    path: PathBuf,

    /// Geometry shared by every page
    layout: PageLayout,

    /// Record layout, used to find the key inside moved tuples
    schema: Schema,

    /// page_number → free bytes, in page order for first-fit
    free_space: BTreeMap<u64, usize>,
}

impl HeapFile {
    /// Open or create a heap file
    ///
    /// Every existing page is loaded once to rebuild the free-space index.
    pub fn open(path: &Path, layout: PageLayout, schema: Schema) -> Result<Self> {
        if !path.exists() {
            File::create(path)?;
            info!(path = %path.display(), "Created heap file");
        }

        let mut heap = Self {
            path: path.to_path_buf(),
            layout,
            schema,
            free_space: BTreeMap::new(),
        };

        let len = std::fs::metadata(path)?.len();
        let page_size = layout.page_size as u64;
        if len % page_size != 0 {
            return Err(KvError::Corruption(format!(
                "Heap file is {} bytes, not a multiple of the {}-byte page size",
                len, page_size
            )));
        }

        for page_number in 0..len / page_size {
            let page = heap.read_page(page_number)?;
            heap.free_space.insert(page_number, page.free_space());
        }

        Ok(heap)
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Store a new record and register its location
    pub fn create(&mut self, index: &mut ExtendibleHashIndex, record: &Record) -> Result<Location> {
        let key = record.key(&self.schema)?;
        if index.get(key)?.is_some() {
            return Err(KvError::DuplicateKey(key));
        }

        let bytes = record::encode(&self.schema, record)?;
        self.check_size(bytes.len())?;

        let page_number = self.find_page(bytes.len())?;
        let mut page = self.read_page(page_number)?;
        let slot = page.append(&bytes)?;

        let location = Location::new(page_number, slot as u64);
        index.insert(key, location.to_bytes())?;
        self.write_page(page_number, &page)?;
        self.free_space.insert(page_number, page.free_space());

        Ok(location)
    }

    /// Read the record stored under `key`
    pub fn read(&self, index: &mut ExtendibleHashIndex, key: u32) -> Result<Option<Record>> {
        let location = match Self::locate(index, key)? {
            Some(location) => location,
            None => return Ok(None),
        };

        let page = self.read_page(location.page)?;
        let tuple = page.tuple(location.slot as usize)?;
        record::decode(&self.schema, tuple).map(Some)
    }

    /// Replace the record stored under `key`
    ///
    /// The record stays on its page when the page can absorb the size
    /// change; otherwise it moves to the first page with room. Returns
    /// false if `key` is absent.
    pub fn update(
        &mut self,
        index: &mut ExtendibleHashIndex,
        key: u32,
        record: &Record,
    ) -> Result<bool> {
        let found = record.key(&self.schema)?;
        if found != key {
            return Err(KvError::KeyMismatch { expected: key, found });
        }

        let location = match Self::locate(index, key)? {
            Some(location) => location,
            None => return Ok(false),
        };

        let bytes = record::encode(&self.schema, record)?;
        self.check_size(bytes.len())?;

        let mut page = self.read_page(location.page)?;
        let (_, old_size) = page.tuple_span(location.slot as usize)?;
        let tracked = self.free_space.get(&location.page).copied().unwrap_or(0);
        let relocate = tracked + old_size < bytes.len();

        self.remove_tuple(index, location.page, &mut page, location.slot as usize)?;

        let (target, mut page) = if relocate {
            self.write_page(location.page, &page)?;
            let target = self.find_page(bytes.len())?;
            debug!(key, from = location.page, to = target, "Relocating record");
            (target, self.read_page(target)?)
        } else {
            (location.page, page)
        };

        let slot = page.append(&bytes)?;
        index.insert(key, Location::new(target, slot as u64).to_bytes())?;
        self.write_page(target, &page)?;
        self.free_space.insert(target, page.free_space());

        Ok(true)
    }

    /// Remove the record stored under `key`; absent keys are a no-op
    pub fn delete(&mut self, index: &mut ExtendibleHashIndex, key: u32) -> Result<bool> {
        let location = match Self::locate(index, key)? {
            Some(location) => location,
            None => return Ok(false),
        };

        let mut page = self.read_page(location.page)?;
        self.remove_tuple(index, location.page, &mut page, location.slot as usize)?;
        self.write_page(location.page, &page)?;
        index.delete(key)?;

        Ok(true)
    }

    /// Every live record, in page and slot order
    pub fn scan(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for page_number in 0..self.page_count() {
            let page = self.read_page(page_number)?;
            for slot in page.slots() {
                records.push(record::decode(&self.schema, page.tuple(slot)?)?);
            }
        }
        Ok(records)
    }

    /// Key and location of every live tuple, decoding only the key field
    pub fn entries(&self) -> Result<Vec<(u32, Location)>> {
        let mut entries = Vec::new();
        for page_number in 0..self.page_count() {
            let page = self.read_page(page_number)?;
            for slot in page.slots() {
                let key = record::decode_key(&self.schema, page.tuple(slot)?)?;
                entries.push((key, Location::new(page_number, slot as u64)));
            }
        }
        Ok(entries)
    }

    // =========================================================================
    // Page I/O
    // =========================================================================

    /// Load page `page_number` from the file
    pub fn read_page(&self, page_number: u64) -> Result<Page> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.page_offset(page_number)))?;
        let mut raw = vec![0u8; self.layout.page_size];
        file.read_exact(&mut raw)?;
        Page::load(self.layout, raw)
    }

    /// Write `page` back at `page_number`
    pub fn write_page(&self, page_number: u64, page: &Page) -> Result<()> {
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(self.page_offset(page_number)))?;
        file.write_all(page.as_bytes())?;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> PageLayout {
        self.layout
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn page_count(&self) -> u64 {
        self.free_space.len() as u64
    }

    /// Tracked free bytes of a page
    pub fn free_space(&self, page_number: u64) -> Option<usize> {
        self.free_space.get(&page_number).copied()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn locate(index: &mut ExtendibleHashIndex, key: u32) -> Result<Option<Location>> {
        index
            .get(key)?
            .map(|entry| Location::from_bytes(&entry.value))
            .transpose()
    }

    fn check_size(&self, len: usize) -> Result<()> {
        let max = self.layout.max_tuple_size();
        if len > max {
            return Err(KvError::RecordTooLarge { size: len, max });
        }
        Ok(())
    }

    /// First page with room for `len` bytes plus a slot
    fn find_page(&mut self, len: usize) -> Result<u64> {
        let needed = len + self.layout.slot_width;
        match self.free_space.iter().find(|(_, free)| **free >= needed) {
            Some((&page_number, _)) => Ok(page_number),
            None => self.allocate_page(),
        }
    }

    /// Append a zeroed page to the file
    fn allocate_page(&mut self) -> Result<u64> {
        let page_number = self.page_count();
        let page = Page::new(self.layout);

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(page.as_bytes())?;

        self.free_space.insert(page_number, page.free_space());
        debug!(page = page_number, "Allocated heap page");

        Ok(page_number)
    }

    /// Remove a tuple from an in-memory page and re-register moved tuples
    fn remove_tuple(
        &mut self,
        index: &mut ExtendibleHashIndex,
        page_number: u64,
        page: &mut Page,
        slot: usize,
    ) -> Result<usize> {
        let removal = page.remove(slot)?;
        for &moved in &removal.relocated {
            let key = record::decode_key(&self.schema, page.tuple(moved)?)?;
            index.insert(key, Location::new(page_number, moved as u64).to_bytes())?;
        }
        self.free_space.insert(page_number, page.free_space());
        Ok(removal.freed)
    }

    fn page_offset(&self, page_number: u64) -> u64 {
        page_number * self.layout.page_size as u64
    }
}
