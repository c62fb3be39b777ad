//! # SlotKV
//!
//! A single-file key-value storage engine with:
//! - Fixed-size slotted pages holding variable-length records
//! - In-place compaction on delete and first-fit page allocation
//! - An extendible hash index locating every record by key
//! - A bounded in-memory bucket cache backed by a fixed-record bucket file
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Engine (façade)                          │
//! │              create / read / update / delete                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐  locations  ┌──────────────────┐
//!   │  HeapFile   │────────────▶│ ExtendibleHash   │
//!   │ (heap.db)   │             │ Index            │
//!   └──────┬──────┘             └────────┬─────────┘
//!          │                             │
//!          ▼                             ▼
//!   ┌─────────────┐             ┌──────────────────┐
//!   │ Slotted     │             │ BucketCache ⇄    │
//!   │ Pages       │             │ buckets.dat      │
//!   └─────────────┘             └──────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod meta;

pub mod record;
pub mod heap;
pub mod index;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::Config;
pub use engine::Engine;
pub use heap::Location;
pub use record::{Field, FieldKind, Record, Schema, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of SlotKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
