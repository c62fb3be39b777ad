//! Engine Module
//!
//! The storage engine façade that owns the heap file and the hash index.
//!
//! ## Responsibilities
//! - Open the data directory and guard its on-disk layout
//! - Restore the index from its snapshot, or rebuild it from the heap
//! - Create/read/update/delete records by key
//! - Persist the index directory on close

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::heap::{HeapFile, Location};
use crate::index::{DirectorySnapshot, ExtendibleHashIndex, Violation};
use crate::meta::StoreMeta;
use crate::record::Record;

/// The main storage engine
///
/// Single writer, single process. Every operation opens the file it needs,
/// does its I/O, and closes it again; only the directory and the bucket
/// cache live across calls.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Slotted pages holding the records
    heap: HeapFile,

    /// Key → location index
    index: ExtendibleHashIndex,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const HEAP_FILENAME: &'static str = "heap.db";
    const BUCKET_FILENAME: &'static str = "buckets.dat";
    const META_FILENAME: &'static str = "slotkv.meta";
    const SNAPSHOT_FILENAME: &'static str = "directory.snap";

    /// Open or create a database with the given config
    ///
    /// On startup:
    /// 1. Validate the config and create the data directory
    /// 2. Check the stored layout against the config (or record it)
    /// 3. Open the heap file, rebuilding its free-space index
    /// 4. Restore the index from the directory snapshot, or rebuild it by
    ///    scanning the heap when no snapshot exists
    pub fn open(config: Config) -> Result<Self> {
        // Step 1: Validate and create the data directory
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        // Step 2: Guard the on-disk layout
        let meta_path = config.data_dir.join(Self::META_FILENAME);
        let expected = StoreMeta::from_config(&config);
        if meta_path.exists() {
            StoreMeta::load(&meta_path)?.check_compatible(&expected)?;
        } else {
            expected.save(&meta_path)?;
        }

        // Step 3: Open the heap
        let heap_path = config.data_dir.join(Self::HEAP_FILENAME);
        let heap = HeapFile::open(&heap_path, config.page_layout(), config.schema.clone())?;

        // Step 4: Restore or rebuild the index
        let bucket_path = config.data_dir.join(Self::BUCKET_FILENAME);
        let snapshot_path = config.data_dir.join(Self::SNAPSHOT_FILENAME);
        let index = if snapshot_path.exists() {
            let snapshot = DirectorySnapshot::load(&snapshot_path)?;
            let index = ExtendibleHashIndex::restore(&bucket_path, config.index_options(), snapshot)?;
            // Present only while the database is closed
            fs::remove_file(&snapshot_path)?;
            index
        } else {
            let mut index = ExtendibleHashIndex::create(&bucket_path, config.index_options())?;
            if heap.page_count() > 0 {
                let entries = heap.entries()?;
                warn!(
                    records = entries.len(),
                    pages = heap.page_count(),
                    "No directory snapshot, rebuilding index from heap file"
                );
                for (key, location) in entries {
                    index.insert(key, location.to_bytes())?;
                }
            }
            index
        };

        info!(
            data_dir = %config.data_dir.display(),
            pages = heap.page_count(),
            global_depth = index.global_depth(),
            "Opened database"
        );

        Ok(Self {
            config,
            heap,
            index,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Store a new record; fails with `DuplicateKey` if its key exists
    pub fn create(&mut self, record: &Record) -> Result<Location> {
        self.heap.create(&mut self.index, record)
    }

    /// Read the record stored under `key`
    pub fn read(&mut self, key: u32) -> Result<Option<Record>> {
        self.heap.read(&mut self.index, key)
    }

    /// Replace the record stored under `key`; false if absent
    pub fn update(&mut self, key: u32, record: &Record) -> Result<bool> {
        self.heap.update(&mut self.index, key, record)
    }

    /// Delete the record stored under `key`; false if absent
    pub fn delete(&mut self, key: u32) -> Result<bool> {
        self.heap.delete(&mut self.index, key)
    }

    /// Create every record from `records`, in order
    ///
    /// Stops at the first failure. Returns the number of records created.
    pub fn load<I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut created = 0;
        for record in records {
            self.create(&record)?;
            created += 1;
        }
        Ok(created)
    }

    /// Every live record, in page and slot order
    pub fn scan(&self) -> Result<Vec<Record>> {
        self.heap.scan()
    }

    /// Index invariant violations (empty when the index is consistent)
    pub fn check(&self) -> Result<Vec<Violation>> {
        self.index.violations()
    }

    /// Close the engine gracefully
    ///
    /// Writes every resident bucket and the directory snapshot.
    pub fn close(self) -> Result<()> {
        let snapshot = self.index.snapshot()?;
        snapshot.save(&self.snapshot_path())?;

        info!(
            pages = self.heap.page_count(),
            buckets = snapshot.next_bucket_id,
            "Closed database"
        );
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn heap(&self) -> &HeapFile {
        &self.heap
    }

    pub fn index(&self) -> &ExtendibleHashIndex {
        &self.index
    }

    /// Number of pages in the heap file
    pub fn page_count(&self) -> u64 {
        self.heap.page_count()
    }

    /// Tracked free bytes of a page
    pub fn free_space(&self, page_number: u64) -> Option<usize> {
        self.heap.free_space(page_number)
    }

    pub fn global_depth(&self) -> u8 {
        self.index.global_depth()
    }

    pub fn directory_len(&self) -> usize {
        self.index.directory_len()
    }

    pub fn resident_buckets(&self) -> usize {
        self.index.resident_buckets()
    }

    fn snapshot_path(&self) -> PathBuf {
        self.config.data_dir.join(Self::SNAPSHOT_FILENAME)
    }
}
