//! Tests for slotted pages
//!
//! These tests verify:
//! - Slot and tuple placement on append
//! - In-place compaction on remove
//! - Free-space accounting
//! - Slot address validation
//! - Reloading a page from its raw bytes

use slotkv::error::KvError;
use slotkv::heap::{Page, PageLayout};

// =============================================================================
// Helper Functions
// =============================================================================

const H: usize = 2;
const W: usize = 2;

fn small_layout() -> PageLayout {
    PageLayout::new(256, H, W)
}

fn tuple(len: usize, fill: u8) -> Vec<u8> {
    vec![fill; len]
}

/// Bytes in use must equal tuple bytes plus one slot per tuple
fn assert_accounting(page: &Page, sizes: &[usize]) {
    let layout = page.layout();
    let used = layout.page_size - H - page.free_space();
    assert_eq!(used, sizes.iter().sum::<usize>() + sizes.len() * W);
    assert_eq!(page.tuple_count(), sizes.len());
}

// =============================================================================
// Append Tests
// =============================================================================

#[test]
fn test_new_page_is_empty() {
    let page = Page::new(small_layout());

    assert_eq!(page.tuple_count(), 0);
    assert_eq!(page.free_space(), 256 - H);
    assert_eq!(page.tuple_base(), 256);
    assert!(page.as_bytes().iter().all(|&b| b == 0));
}

#[test]
fn test_append_places_tuples_from_the_end() {
    let mut page = Page::new(small_layout());

    let first = page.append(&tuple(10, 0xAA)).unwrap();
    let second = page.append(&tuple(20, 0xBB)).unwrap();

    assert_eq!(first, H);
    assert_eq!(second, H + W);
    assert_eq!(page.tuple_address_of(first).unwrap(), 246);
    assert_eq!(page.tuple_address_of(second).unwrap(), 226);
    assert_eq!(page.tuple(first).unwrap(), &tuple(10, 0xAA)[..]);
    assert_eq!(page.tuple(second).unwrap(), &tuple(20, 0xBB)[..]);
    assert_eq!(&page.as_bytes()[..H], &[2, 0]);
}

#[test]
fn test_append_updates_free_space() {
    let mut page = Page::new(small_layout());

    page.append(&tuple(10, 1)).unwrap();
    assert_eq!(page.free_space(), 256 - H - 10 - W);

    page.append(&tuple(30, 2)).unwrap();
    assert_accounting(&page, &[10, 30]);
}

#[test]
fn test_append_rejects_tuple_that_does_not_fit() {
    let mut page = Page::new(small_layout());
    page.append(&tuple(200, 1)).unwrap();

    let free = page.free_space();
    let result = page.append(&tuple(free, 2));

    assert!(matches!(result, Err(KvError::PageFull { .. })));
    assert_eq!(page.tuple_count(), 1);
}

#[test]
fn test_append_exactly_fills_page() {
    let mut page = Page::new(small_layout());
    let max = small_layout().max_tuple_size();

    page.append(&tuple(max, 7)).unwrap();

    assert_eq!(page.free_space(), 0);
    assert!(!page.fits(0));
}

// =============================================================================
// Remove Tests
// =============================================================================

#[test]
fn test_remove_compacts_tuples_and_slots() {
    let mut page = Page::new(small_layout());
    let a = page.append(&tuple(10, 0xA)).unwrap();
    let b = page.append(&tuple(20, 0xB)).unwrap();
    let c = page.append(&tuple(30, 0xC)).unwrap();
    let c_offset = page.tuple_address_of(c).unwrap();
    let free_before = page.free_space();

    let removal = page.remove(b).unwrap();

    assert_eq!(removal.freed, 20);
    assert_eq!(removal.relocated, vec![b]);

    // The third tuple now lives in the second slot, shifted up by 20
    assert_eq!(page.tuple_count(), 2);
    assert_eq!(page.tuple_address_of(b).unwrap(), c_offset + 20);
    assert_eq!(page.tuple(b).unwrap(), &tuple(30, 0xC)[..]);
    assert_eq!(page.tuple(a).unwrap(), &tuple(10, 0xA)[..]);

    assert_eq!(page.free_space(), free_before + 20 + W);
    assert!(!page.is_valid_slot_address(c));
    assert_accounting(&page, &[10, 30]);
}

#[test]
fn test_remove_zeroes_vacated_bytes() {
    let mut page = Page::new(small_layout());
    page.append(&tuple(10, 0xFF)).unwrap();
    let b = page.append(&tuple(20, 0xFF)).unwrap();
    let c = page.append(&tuple(30, 0xFF)).unwrap();

    page.remove(b).unwrap();

    let base = page.tuple_base();
    assert!(page.as_bytes()[H + 2 * W..base].iter().all(|&x| x == 0));
    assert!(page.as_bytes()[c..c + W].iter().all(|&x| x == 0));
}

#[test]
fn test_remove_last_tuple_relocates_nothing() {
    let mut page = Page::new(small_layout());
    page.append(&tuple(10, 1)).unwrap();
    let last = page.append(&tuple(20, 2)).unwrap();

    let removal = page.remove(last).unwrap();

    assert!(removal.relocated.is_empty());
    assert_accounting(&page, &[10]);
}

#[test]
fn test_remove_only_tuple_restores_empty_page() {
    let mut page = Page::new(small_layout());
    let slot = page.append(&tuple(40, 9)).unwrap();

    page.remove(slot).unwrap();

    assert_eq!(page.tuple_count(), 0);
    assert_eq!(page.free_space(), 256 - H);
    assert!(page.as_bytes().iter().all(|&b| b == 0));
}

#[test]
fn test_append_after_remove_reuses_space() {
    let mut page = Page::new(small_layout());
    let a = page.append(&tuple(100, 1)).unwrap();
    page.append(&tuple(100, 2)).unwrap();

    page.remove(a).unwrap();
    page.append(&tuple(100, 3)).unwrap();

    assert_accounting(&page, &[100, 100]);
    let contents: Vec<u8> = page.slots().map(|s| page.tuple(s).unwrap()[0]).collect();
    assert_eq!(contents, vec![2, 3]);
}

#[test]
fn test_accounting_holds_over_mixed_operations() {
    let mut page = Page::new(PageLayout::new(1024, H, W));
    let mut sizes: Vec<usize> = Vec::new();

    for len in [13usize, 57, 8, 91, 22, 40] {
        page.append(&tuple(len, len as u8)).unwrap();
        sizes.push(len);
        assert_accounting(&page, &sizes);
    }

    for index in [4usize, 0, 2] {
        let slot = page.slots().nth(index).unwrap();
        page.remove(slot).unwrap();
        sizes.remove(index);
        assert_accounting(&page, &sizes);
    }

    for (slot, len) in page.slots().zip(&sizes) {
        assert_eq!(page.tuple(slot).unwrap(), &tuple(*len, *len as u8)[..]);
    }
}

// =============================================================================
// Slot Address Validation Tests
// =============================================================================

#[test]
fn test_slot_address_validation() {
    let mut page = Page::new(small_layout());
    page.append(&tuple(10, 1)).unwrap();
    page.append(&tuple(10, 2)).unwrap();

    assert!(page.is_valid_slot_address(H));
    assert!(page.is_valid_slot_address(H + W));
    assert!(!page.is_valid_slot_address(H + 1));
    assert!(!page.is_valid_slot_address(H + 2 * W));
    assert!(!page.is_valid_slot_address(0));
}

#[test]
fn test_invalid_slot_address_errors() {
    let mut page = Page::new(small_layout());
    page.append(&tuple(10, 1)).unwrap();

    assert!(matches!(
        page.tuple(H + 1),
        Err(KvError::InvalidSlotAddress { .. })
    ));
    assert!(matches!(
        page.remove(H + W),
        Err(KvError::InvalidSlotAddress { .. })
    ));
}

#[test]
fn test_empty_page_has_no_valid_slots() {
    let page = Page::new(small_layout());

    assert!(!page.is_valid_slot_address(H));
    assert_eq!(page.slots().count(), 0);
}

// =============================================================================
// Load Tests
// =============================================================================

#[test]
fn test_load_recovers_tuple_area() {
    let mut page = Page::new(small_layout());
    page.append(&tuple(10, 1)).unwrap();
    page.append(&tuple(25, 2)).unwrap();

    let loaded = Page::load(small_layout(), page.as_bytes().to_vec()).unwrap();

    assert_eq!(loaded.tuple_count(), 2);
    assert_eq!(loaded.tuple_base(), page.tuple_base());
    assert_eq!(loaded.free_space(), page.free_space());
    assert_eq!(loaded.tuple(H + W).unwrap(), &tuple(25, 2)[..]);
}

#[test]
fn test_load_rejects_wrong_size() {
    let result = Page::load(small_layout(), vec![0u8; 100]);
    assert!(matches!(result, Err(KvError::Corruption(_))));
}

#[test]
fn test_load_rejects_offset_inside_slot_array() {
    let mut raw = vec![0u8; 256];
    raw[0] = 1; // one tuple
    raw[2] = 1; // starting at offset 1

    let result = Page::load(small_layout(), raw);
    assert!(matches!(result, Err(KvError::Corruption(_))));
}

#[test]
fn test_wider_header_and_slots() {
    let layout = PageLayout::new(70000, 4, 4);
    let mut page = Page::new(layout);

    let slot = page.append(&tuple(300, 3)).unwrap();

    assert_eq!(slot, 4);
    assert_eq!(page.tuple_address_of(slot).unwrap(), 70000 - 300);
    assert_eq!(page.free_space(), 70000 - 4 - 4 - 300);
}
