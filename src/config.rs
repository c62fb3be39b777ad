//! Configuration for SlotKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{KvError, Result};
use crate::heap::PageLayout;
use crate::index::{IndexOptions, KEY_BITS};
use crate::record::Schema;

/// Main configuration for a SlotKV database
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── heap.db          (slotted pages)
    ///     ├── buckets.dat      (evicted index buckets)
    ///     ├── slotkv.meta      (layout guard)
    ///     └── directory.snap   (index directory, present while closed)
    pub data_dir: PathBuf,

    /// Layout of the records stored in the heap
    pub schema: Schema,

    // -------------------------------------------------------------------------
    // Page Configuration
    // -------------------------------------------------------------------------
    /// Page size in bytes
    pub page_size: usize,

    /// Width of the tuple counter at the start of each page (bytes)
    pub header_size: usize,

    /// Width of one slot / tuple offset (bytes)
    pub slot_width: usize,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Entries per hash bucket
    pub bucket_capacity: usize,

    /// Buckets kept in memory before the oldest is evicted
    pub max_buckets_in_memory: usize,

    /// Largest global depth the directory may reach
    pub max_global_depth: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./slotkv_data"),
            schema: Schema::users(),
            page_size: 8192,
            header_size: 2,
            slot_width: 2,
            bucket_capacity: 10,
            max_buckets_in_memory: 6,
            max_global_depth: 20,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn page_layout(&self) -> PageLayout {
        PageLayout::new(self.page_size, self.header_size, self.slot_width)
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            bucket_capacity: self.bucket_capacity,
            max_buckets_in_memory: self.max_buckets_in_memory,
            max_global_depth: self.max_global_depth,
        }
    }

    /// Reject geometries the on-disk formats cannot represent
    pub fn validate(&self) -> Result<()> {
        if !(1..=8).contains(&self.header_size) {
            return Err(KvError::Config(format!(
                "header_size must be 1..=8 bytes, got {}",
                self.header_size
            )));
        }
        if !(1..=8).contains(&self.slot_width) {
            return Err(KvError::Config(format!(
                "slot_width must be 1..=8 bytes, got {}",
                self.slot_width
            )));
        }
        if self.page_size <= self.header_size + self.slot_width {
            return Err(KvError::Config(format!(
                "page_size {} leaves no room for a tuple",
                self.page_size
            )));
        }
        if self.slot_width < 8 && self.page_size as u64 >= 1u64 << (8 * self.slot_width) {
            return Err(KvError::Config(format!(
                "page_size {} is not addressable with {}-byte slots",
                self.page_size, self.slot_width
            )));
        }
        let max_tuples = (self.page_size - self.header_size) / self.slot_width;
        if self.header_size < 8 && max_tuples as u64 >= 1u64 << (8 * self.header_size) {
            return Err(KvError::Config(format!(
                "{}-byte tuple counter cannot count {} tuples",
                self.header_size, max_tuples
            )));
        }
        if self.page_size > u32::MAX as usize {
            return Err(KvError::Config(format!("page_size {} too large", self.page_size)));
        }
        if !(1..=u8::MAX as usize).contains(&self.bucket_capacity) {
            return Err(KvError::Config(format!(
                "bucket_capacity must be 1..=255, got {}",
                self.bucket_capacity
            )));
        }
        if self.max_buckets_in_memory == 0 {
            return Err(KvError::Config(
                "max_buckets_in_memory must be at least 1".to_string(),
            ));
        }
        if self.max_global_depth == 0 || self.max_global_depth > KEY_BITS {
            return Err(KvError::Config(format!(
                "max_global_depth must be 1..={}, got {}",
                KEY_BITS, self.max_global_depth
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the record schema
    pub fn schema(mut self, schema: Schema) -> Self {
        self.config.schema = schema;
        self
    }

    /// Set the page size (in bytes)
    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    /// Set the tuple counter width (in bytes)
    pub fn header_size(mut self, size: usize) -> Self {
        self.config.header_size = size;
        self
    }

    /// Set the slot width (in bytes)
    pub fn slot_width(mut self, width: usize) -> Self {
        self.config.slot_width = width;
        self
    }

    /// Set the number of entries per bucket
    pub fn bucket_capacity(mut self, capacity: usize) -> Self {
        self.config.bucket_capacity = capacity;
        self
    }

    /// Set the number of buckets kept in memory
    pub fn max_buckets_in_memory(mut self, count: usize) -> Self {
        self.config.max_buckets_in_memory = count;
        self
    }

    /// Set the largest global depth of the directory
    pub fn max_global_depth(mut self, depth: u8) -> Self {
        self.config.max_global_depth = depth;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
