//! Bucket file
//!
//! Direct-access array of fixed-size bucket records addressed by bucket id.
//! Every call opens the file, seeks, and closes it again.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::bucket::{record_size, Bucket};
use crate::error::{KvError, Result};

/// Fixed-record file holding evicted buckets
#[derive(Debug, Clone)]
pub struct BucketFile {
    path: PathBuf,
    capacity: usize,
    record_size: usize,
}

impl BucketFile {
    pub fn new(path: &Path, capacity: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            capacity,
            record_size: record_size(capacity),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create or empty the file
    pub fn reset(&self) -> Result<()> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        info!(path = %self.path.display(), record_size = self.record_size, "Created bucket file");
        Ok(())
    }

    /// Write a bucket at `id * record_size`, zero-padded
    pub fn write(&self, bucket: &Bucket) -> Result<()> {
        let mut bytes = bucket.serialize();
        if bytes.len() > self.record_size {
            return Err(KvError::BucketRecordOverflow {
                size: bytes.len(),
                record_size: self.record_size,
            });
        }
        bytes.resize(self.record_size, 0);

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)?;
        file.seek(SeekFrom::Start(self.offset(bucket.id())))?;
        file.write_all(&bytes)?;

        Ok(())
    }

    /// Read bucket `id` back into memory
    pub fn read(&self, id: u32) -> Result<Bucket> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KvError::BucketFileMissing(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        file.seek(SeekFrom::Start(self.offset(id)))?;
        let mut bytes = vec![0u8; self.record_size];
        file.read_exact(&mut bytes)?;

        let bucket = Bucket::from_bytes(&bytes, self.capacity)?;
        if bucket.id() != id {
            return Err(KvError::Corruption(format!(
                "Bucket record at slot {} carries id {}",
                id,
                bucket.id()
            )));
        }
        Ok(bucket)
    }

    fn offset(&self, id: u32) -> u64 {
        id as u64 * self.record_size as u64
    }
}
