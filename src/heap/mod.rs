//! Heap Module
//!
//! Variable-length records stored in fixed-size slotted pages, all pages
//! in one file.
//!
//! ## Responsibilities
//! - Byte-exact page layout: tuple counter, slot array, tuple area
//! - In-place compaction when a tuple is removed
//! - Free-space tracking per page and first-fit page allocation
//! - Keep the hash index pointing at every tuple that moves
//!
//! ## Page Format
//! ```text
//! ┌───────────┬─────────────────────────┬──────────────┬──────────────────────┐
//! │ Count (H) │ Slot 0 │ Slot 1 │ ...    │  free space  │ ... │ T1 │ T0       │
//! │ LE        │ LE tuple offsets (W)    │              │ tuples, newest first │
//! └───────────┴─────────────────────────┴──────────────┴──────────────────────┘
//!  0          H                          H + n*W        tuple_base   page_size
//! ```
//!
//! Tuple `i` spans `[offset_i, offset_{i-1})`, with `offset_{-1} = page_size`.
//!
//! ## File Format
//! ```text
//! ┌────────┬────────┬─────┬──────────┐
//! │ Page 0 │ Page 1 │ ... │ Page N-1 │   page N starts at N * page_size
//! └────────┴────────┴─────┴──────────┘
//! ```

mod file;
mod location;
mod page;

pub use file::HeapFile;
pub use location::Location;
pub use page::{Page, PageLayout, Removal};
