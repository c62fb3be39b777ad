//! Error types for SlotKV
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for SlotKV operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Corrupted data: {0}")]
    Corruption(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(u32),

    #[error("Key mismatch: record carries key {found}, expected {expected}")]
    KeyMismatch { expected: u32, found: u32 },

    // -------------------------------------------------------------------------
    // Page Errors
    // -------------------------------------------------------------------------
    #[error("Invalid slot address {slot_address} (page holds {tuple_count} tuples)")]
    InvalidSlotAddress {
        slot_address: usize,
        tuple_count: usize,
    },

    #[error("Page full: need {needed} bytes, {available} available")]
    PageFull { needed: usize, available: usize },

    #[error("Record of {size} bytes can never fit a page (max {max})")]
    RecordTooLarge { size: usize, max: usize },

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error(
        "Bucket file {0} does not exist: at least one bucket must be written before any bucket is read"
    )]
    BucketFileMissing(PathBuf),

    #[error("Bucket serializes to {size} bytes, exceeding the fixed record size of {record_size}")]
    BucketRecordOverflow { size: usize, record_size: usize },

    #[error("Directory cannot grow beyond global depth {max_depth}")]
    DirectoryFull { max_depth: u8 },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
