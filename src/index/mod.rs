//! Index Module
//!
//! Extendible hash index mapping record keys to heap locations.
//!
//! ## Responsibilities
//! - Bit-prefix directory over buckets, doubled on demand
//! - Split overflowing buckets by the next hash bit
//! - Keep at most `max_buckets_in_memory` buckets resident (FIFO admission)
//! - Evict to / rematerialize from a fixed-record bucket file
//!
//! ## Bucket File Format
//! Bucket `id` lives at byte offset `id * record_size`. All integers are
//! big-endian (the heap file is little-endian; the two formats are
//! independent).
//! ```text
//! ┌──────────────┬──────────────┬──────────┬───────────────┐
//! │ LocalDepth(1)│ Capacity (1) │ Size (1) │ BucketId (4)  │
//! ├──────────────┴──────────────┴──────────┴───────────────┤
//! │ Entry: [KeyHash (4)][Value (16)]  × Size               │
//! ├────────────────────────────────────────────────────────┤
//! │ Zero padding up to 7 + Capacity * 20 bytes             │
//! └────────────────────────────────────────────────────────┘
//! ```

mod bucket;
mod bucket_file;
mod cache;
mod extendible;
mod hash;
mod snapshot;

pub use bucket::{record_size, Bucket, BucketValue, BUCKET_HEADER_SIZE, ENTRY_SIZE};
pub use bucket_file::BucketFile;
pub use cache::BucketCache;
pub use extendible::{ExtendibleHashIndex, Violation};
pub use hash::{KeyHash, KEY_BITS};
pub use snapshot::DirectorySnapshot;

/// Width of a serialized key hash (bytes)
pub const KEY_WIDTH: usize = 4;

/// Width of an index value (bytes); holds one heap `Location`
pub const VALUE_WIDTH: usize = 16;

/// Tuning knobs for the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    /// Entries per bucket
    pub bucket_capacity: usize,

    /// Buckets kept materialized in memory
    pub max_buckets_in_memory: usize,

    /// Global depth beyond which the directory refuses to double
    pub max_global_depth: u8,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            bucket_capacity: 10,
            max_buckets_in_memory: 6,
            max_global_depth: 20,
        }
    }
}
