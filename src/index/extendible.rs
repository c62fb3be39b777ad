//! Extendible hash index
//!
//! The directory is a vector of `2^global_depth` bucket ids indexed by the
//! first `global_depth` bits of a key hash. Doubling appends a copy of the
//! directory to itself: entry `p` becomes prefix `p+"0"` and entry
//! `p + 2^depth` becomes prefix `p+"1"`, both still naming the old bucket.
//!
//! Buckets are resident in a FIFO `BucketCache` or live only in the bucket
//! file. The directory always holds ids, so a bucket leaving the cache needs
//! no directory rewrite.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use super::bucket::{Bucket, BucketValue};
use super::bucket_file::BucketFile;
use super::cache::BucketCache;
use super::hash::{prefix_mask, KeyHash, KEY_BITS};
use super::snapshot::DirectorySnapshot;
use super::{IndexOptions, VALUE_WIDTH};
use crate::error::{KvError, Result};

/// A broken index invariant found by `violations()`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("directory has {found} entries, expected {expected} for global depth {global_depth}")]
    DirectorySize {
        global_depth: u8,
        expected: usize,
        found: usize,
    },

    #[error("bucket {bucket_id} has local depth {local_depth} above global depth {global_depth}")]
    LocalDepth {
        bucket_id: u32,
        local_depth: u8,
        global_depth: u8,
    },

    #[error("entry {key_hash} in bucket {bucket_id} does not start with prefix {prefix}")]
    PrefixMismatch {
        bucket_id: u32,
        prefix: String,
        key_hash: KeyHash,
    },
}

/// Extendible hash index over a bounded bucket cache
pub struct ExtendibleHashIndex {
    directory: Vec<u32>,
    global_depth: u8,
    cache: BucketCache,
    bucket_file: BucketFile,
    next_bucket_id: u32,
    options: IndexOptions,
}

impl ExtendibleHashIndex {
    /// Create an empty index: global depth 1, two buckets at local depth 1
    ///
    /// The bucket file is emptied because bucket ids restart at zero.
    pub fn create(bucket_path: &Path, options: IndexOptions) -> Result<Self> {
        let bucket_file = BucketFile::new(bucket_path, options.bucket_capacity);
        bucket_file.reset()?;

        let mut index = Self {
            directory: vec![0, 1],
            global_depth: 1,
            cache: BucketCache::new(options.max_buckets_in_memory),
            bucket_file,
            next_bucket_id: 2,
            options,
        };
        index.admit(Bucket::new(0, 1, options.bucket_capacity))?;
        index.admit(Bucket::new(1, 1, options.bucket_capacity))?;

        Ok(index)
    }

    /// Reopen an index from a directory snapshot; every bucket starts evicted
    pub fn restore(
        bucket_path: &Path,
        options: IndexOptions,
        snapshot: DirectorySnapshot,
    ) -> Result<Self> {
        if snapshot.global_depth > options.max_global_depth {
            return Err(KvError::Config(format!(
                "Directory snapshot has global depth {}, above max_global_depth {}",
                snapshot.global_depth, options.max_global_depth
            )));
        }
        if snapshot.directory.len() != 1usize << snapshot.global_depth {
            return Err(KvError::Corruption(format!(
                "Directory snapshot has {} entries at global depth {}",
                snapshot.directory.len(),
                snapshot.global_depth
            )));
        }
        if let Some(id) = snapshot.directory.iter().find(|&&id| id >= snapshot.next_bucket_id) {
            return Err(KvError::Corruption(format!(
                "Directory names bucket {} but only {} were allocated",
                id, snapshot.next_bucket_id
            )));
        }

        Ok(Self {
            directory: snapshot.directory,
            global_depth: snapshot.global_depth,
            cache: BucketCache::new(options.max_buckets_in_memory),
            bucket_file: BucketFile::new(bucket_path, options.bucket_capacity),
            next_bucket_id: snapshot.next_bucket_id,
            options,
        })
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Look up the entry for `key`
    pub fn get(&mut self, key: u32) -> Result<Option<BucketValue>> {
        let hash = KeyHash::of(key);
        let id = self.bucket_id_for(hash);
        Ok(self.resolve(id)?.search(hash).copied())
    }

    /// Insert or overwrite the value for `key`, splitting buckets as needed
    ///
    /// Fails with `DirectoryFull` when a split would need the directory to
    /// grow beyond `max_global_depth`.
    pub fn insert(&mut self, key: u32, value: [u8; VALUE_WIDTH]) -> Result<()> {
        let hash = KeyHash::of(key);
        loop {
            let id = self.bucket_id_for(hash);
            if self.resolve(id)?.insert(BucketValue::new(hash, value)) {
                return Ok(());
            }
            self.split(id, hash)?;
        }
    }

    /// Remove the entry for `key`; buckets are never merged
    pub fn delete(&mut self, key: u32) -> Result<bool> {
        let hash = KeyHash::of(key);
        let id = self.bucket_id_for(hash);
        Ok(self.resolve(id)?.delete(hash))
    }

    /// Write every resident bucket to the bucket file, keeping it resident
    pub fn flush(&self) -> Result<()> {
        for id in self.cache.ids() {
            if let Some(bucket) = self.cache.get(id) {
                self.bucket_file.write(bucket)?;
            }
        }
        Ok(())
    }

    /// Flush and describe the directory for persistence
    pub fn snapshot(&self) -> Result<DirectorySnapshot> {
        self.flush()?;
        Ok(DirectorySnapshot {
            global_depth: self.global_depth,
            next_bucket_id: self.next_bucket_id,
            directory: self.directory.clone(),
        })
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Every broken invariant, checking evicted buckets from the bucket file
    pub fn violations(&self) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();

        let expected = 1usize << self.global_depth;
        if self.directory.len() != expected {
            violations.push(Violation::DirectorySize {
                global_depth: self.global_depth,
                expected,
                found: self.directory.len(),
            });
        }

        let mut evicted: HashMap<u32, Bucket> = HashMap::new();
        for (prefix, &id) in self.directory.iter().enumerate() {
            if !self.cache.contains(id) && !evicted.contains_key(&id) {
                evicted.insert(id, self.bucket_file.read(id)?);
            }
            let bucket = match self.cache.get(id).or_else(|| evicted.get(&id)) {
                Some(bucket) => bucket,
                None => continue,
            };

            let local = bucket.local_depth();
            if local > self.global_depth {
                violations.push(Violation::LocalDepth {
                    bucket_id: id,
                    local_depth: local,
                    global_depth: self.global_depth,
                });
                continue;
            }

            let wanted = prefix as u64 & prefix_mask(local);
            for entry in bucket.entries() {
                if entry.key_hash.prefix(local) as u64 != wanted {
                    violations.push(Violation::PrefixMismatch {
                        bucket_id: id,
                        prefix: KeyHash::of(prefix as u32).bit_string(local),
                        key_hash: entry.key_hash,
                    });
                }
            }
        }

        Ok(violations)
    }

    pub fn is_valid(&self) -> Result<bool> {
        Ok(self.violations()?.is_empty())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn global_depth(&self) -> u8 {
        self.global_depth
    }

    pub fn directory(&self) -> &[u32] {
        &self.directory
    }

    pub fn directory_len(&self) -> usize {
        self.directory.len()
    }

    pub fn next_bucket_id(&self) -> u32 {
        self.next_bucket_id
    }

    pub fn resident_buckets(&self) -> usize {
        self.cache.len()
    }

    pub fn is_resident(&self, id: u32) -> bool {
        self.cache.contains(id)
    }

    pub fn resident_bucket(&self, id: u32) -> Option<&Bucket> {
        self.cache.get(id)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn bucket_id_for(&self, hash: KeyHash) -> u32 {
        self.directory[hash.prefix(self.global_depth)]
    }

    /// Materialize bucket `id` if needed and borrow it
    fn resolve(&mut self, id: u32) -> Result<&mut Bucket> {
        if !self.cache.contains(id) {
            let bucket = self.bucket_file.read(id)?;
            debug!(bucket_id = id, "Rematerialized bucket");
            self.admit(bucket)?;
        }
        self.cache
            .get_mut(id)
            .ok_or_else(|| KvError::Corruption(format!("Bucket {} vanished from cache", id)))
    }

    /// Admit into the cache, writing out the evicted bucket
    fn admit(&mut self, bucket: Bucket) -> Result<()> {
        if let Some(victim) = self.cache.admit(bucket) {
            debug!(bucket_id = victim.id(), "Evicted bucket");
            self.bucket_file.write(&victim)?;
        }
        Ok(())
    }

    /// Split bucket `id`, which `hash` overflowed
    fn split(&mut self, id: u32, hash: KeyHash) -> Result<()> {
        let local = self.resolve(id)?.local_depth();

        if local >= KEY_BITS {
            return Err(KvError::DirectoryFull {
                max_depth: self.options.max_global_depth,
            });
        }
        if local == self.global_depth {
            if self.global_depth >= self.options.max_global_depth {
                return Err(KvError::DirectoryFull {
                    max_depth: self.options.max_global_depth,
                });
            }
            self.double_directory();
        }

        let bucket = self
            .cache
            .take(id)
            .ok_or_else(|| KvError::Corruption(format!("Bucket {} vanished from cache", id)))?;

        let capacity = self.options.bucket_capacity;
        let mut low = Bucket::new(id, local + 1, capacity);
        let mut high = Bucket::new(self.next_bucket_id, local + 1, capacity);
        self.next_bucket_id += 1;

        for entry in bucket.into_entries() {
            let target = if entry.key_hash.bit(local) == 0 {
                &mut low
            } else {
                &mut high
            };
            target.insert(entry);
        }

        let low_prefix = hash.prefix(local);
        let high_prefix = low_prefix | (1usize << local);
        let mask = prefix_mask(local + 1) as usize;
        for (prefix, slot) in self.directory.iter_mut().enumerate() {
            if prefix & mask == low_prefix {
                *slot = low.id();
            } else if prefix & mask == high_prefix {
                *slot = high.id();
            }
        }

        debug!(
            bucket_id = id,
            new_bucket_id = high.id(),
            local_depth = local + 1,
            low = low.len(),
            high = high.len(),
            "Split bucket"
        );

        self.admit(low)?;
        self.admit(high)?;

        Ok(())
    }

    fn double_directory(&mut self) {
        self.directory.extend_from_within(..);
        self.global_depth += 1;
        debug!(
            global_depth = self.global_depth,
            entries = self.directory.len(),
            "Doubled directory"
        );
    }
}
