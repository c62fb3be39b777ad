//! Directory snapshot
//!
//! The directory and bucket id counter, saved on close so the index can be
//! reopened with every bucket still in the bucket file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::meta::{read_checked, write_checked};

/// Persisted directory state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    pub global_depth: u8,
    pub next_bucket_id: u32,
    /// Bucket id per directory prefix, indexed by prefix value
    pub directory: Vec<u32>,
}

impl DirectorySnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        read_checked(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_checked(path, self)
    }
}
