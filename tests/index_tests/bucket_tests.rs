//! Tests for buckets, the bucket file and the bucket cache
//!
//! These tests verify:
//! - Bucket insert/overwrite/delete/search semantics
//! - Fixed-size big-endian bucket records
//! - Bucket file addressing by id
//! - FIFO admission and eviction in the cache

use slotkv::error::KvError;
use slotkv::index::{
    record_size, Bucket, BucketCache, BucketFile, BucketValue, KeyHash, BUCKET_HEADER_SIZE,
    ENTRY_SIZE,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn value(tag: u8) -> [u8; 16] {
    [tag; 16]
}

fn entry(key: u32, tag: u8) -> BucketValue {
    BucketValue::new(KeyHash::of(key), value(tag))
}

fn filled_bucket(id: u32, capacity: usize, keys: &[u32]) -> Bucket {
    let mut bucket = Bucket::new(id, 2, capacity);
    for &key in keys {
        assert!(bucket.insert(entry(key, key as u8)));
    }
    bucket
}

// =============================================================================
// Bucket Tests
// =============================================================================

#[test]
fn test_insert_until_full() {
    let mut bucket = Bucket::new(0, 1, 3);

    assert!(bucket.insert(entry(1, 1)));
    assert!(bucket.insert(entry(2, 2)));
    assert!(bucket.insert(entry(3, 3)));
    assert!(bucket.is_full());
    assert!(!bucket.insert(entry(4, 4)));
    assert_eq!(bucket.len(), 3);
}

#[test]
fn test_insert_overwrites_existing_key_even_when_full() {
    let mut bucket = filled_bucket(0, 2, &[1, 2]);

    assert!(bucket.insert(entry(2, 99)));

    assert_eq!(bucket.len(), 2);
    assert_eq!(bucket.search(KeyHash::of(2)).unwrap().value, value(99));
}

#[test]
fn test_delete_and_search() {
    let mut bucket = filled_bucket(0, 4, &[5, 6, 7]);

    assert!(bucket.delete(KeyHash::of(6)));
    assert!(!bucket.delete(KeyHash::of(6)));

    assert!(bucket.search(KeyHash::of(6)).is_none());
    assert_eq!(bucket.search(KeyHash::of(7)).unwrap().value, value(7));
    assert_eq!(bucket.len(), 2);
}

// =============================================================================
// Serialization Tests
// =============================================================================

#[test]
fn test_record_size() {
    assert_eq!(BUCKET_HEADER_SIZE, 7);
    assert_eq!(ENTRY_SIZE, 20);
    assert_eq!(record_size(10), 207);
}

#[test]
fn test_serialize_layout() {
    let mut bucket = Bucket::new(0x0A0B0C0D, 3, 4);
    bucket.insert(BucketValue::new(KeyHash::of(1), value(0xEE)));

    let bytes = bucket.serialize();

    assert_eq!(bytes.len(), BUCKET_HEADER_SIZE + ENTRY_SIZE);
    assert_eq!(&bytes[..7], &[3, 4, 1, 0x0A, 0x0B, 0x0C, 0x0D]);
    // Key 1 is the bit string "1000...0", stored as a big-endian integer
    assert_eq!(&bytes[7..11], &[0x80, 0x00, 0x00, 0x00]);
    assert_eq!(&bytes[11..], &value(0xEE)[..]);
}

#[test]
fn test_to_bytes_pads_to_record_size() {
    let bucket = filled_bucket(1, 5, &[1, 2]);

    let bytes = bucket.to_bytes();

    assert_eq!(bytes.len(), record_size(5));
    assert!(bytes[BUCKET_HEADER_SIZE + 2 * ENTRY_SIZE..].iter().all(|&b| b == 0));
}

#[test]
fn test_from_bytes_restores_bucket() {
    let bucket = filled_bucket(9, 4, &[3, 11, 19]);

    let restored = Bucket::from_bytes(&bucket.to_bytes(), 4).unwrap();

    assert_eq!(restored, bucket);
}

#[test]
fn test_from_bytes_rejects_capacity_mismatch() {
    let bucket = filled_bucket(0, 4, &[1]);

    let result = Bucket::from_bytes(&bucket.to_bytes(), 5);

    assert!(matches!(result, Err(KvError::Corruption(_))));
}

#[test]
fn test_from_bytes_rejects_truncated_record() {
    let bucket = filled_bucket(0, 4, &[1, 2, 3]);
    let bytes = bucket.serialize();

    let result = Bucket::from_bytes(&bytes[..bytes.len() - 1], 4);

    assert!(matches!(result, Err(KvError::Corruption(_))));
}

// =============================================================================
// Bucket File Tests
// =============================================================================

#[test]
fn test_bucket_file_write_then_read() {
    let temp = TempDir::new().unwrap();
    let file = BucketFile::new(&temp.path().join("buckets.dat"), 4);
    file.reset().unwrap();

    let a = filled_bucket(0, 4, &[1, 2]);
    let b = filled_bucket(3, 4, &[7]);
    file.write(&a).unwrap();
    file.write(&b).unwrap();

    assert_eq!(file.read(0).unwrap(), a);
    assert_eq!(file.read(3).unwrap(), b);

    let len = std::fs::metadata(file.path()).unwrap().len();
    assert_eq!(len, 4 * record_size(4) as u64);
}

#[test]
fn test_bucket_file_overwrites_record_in_place() {
    let temp = TempDir::new().unwrap();
    let file = BucketFile::new(&temp.path().join("buckets.dat"), 4);
    file.reset().unwrap();

    file.write(&filled_bucket(1, 4, &[1, 2, 3])).unwrap();
    let shrunk = filled_bucket(1, 4, &[2]);
    file.write(&shrunk).unwrap();

    assert_eq!(file.read(1).unwrap(), shrunk);
}

#[test]
fn test_bucket_file_missing() {
    let temp = TempDir::new().unwrap();
    let file = BucketFile::new(&temp.path().join("absent.dat"), 4);

    assert!(matches!(file.read(0), Err(KvError::BucketFileMissing(_))));
}

#[test]
fn test_bucket_file_rejects_oversized_bucket() {
    let temp = TempDir::new().unwrap();
    let file = BucketFile::new(&temp.path().join("buckets.dat"), 2);
    file.reset().unwrap();

    let bucket = filled_bucket(0, 3, &[1, 2, 3]);

    assert!(matches!(
        file.write(&bucket),
        Err(KvError::BucketRecordOverflow { .. })
    ));
}

// =============================================================================
// Cache Tests
// =============================================================================

#[test]
fn test_cache_admits_up_to_limit() {
    let mut cache = BucketCache::new(2);

    assert!(cache.admit(Bucket::new(0, 1, 2)).is_none());
    assert!(cache.admit(Bucket::new(1, 1, 2)).is_none());

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.ids().collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn test_cache_evicts_oldest_admission() {
    let mut cache = BucketCache::new(2);
    cache.admit(Bucket::new(0, 1, 2));
    cache.admit(Bucket::new(1, 1, 2));

    let victim = cache.admit(Bucket::new(2, 1, 2)).unwrap();

    assert_eq!(victim.id(), 0);
    assert!(!cache.contains(0));
    assert!(cache.contains(2));
    assert_eq!(cache.ids().collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn test_cache_never_evicts_bucket_just_admitted() {
    let mut cache = BucketCache::new(1);
    cache.admit(Bucket::new(0, 1, 2));

    let victim = cache.admit(Bucket::new(1, 1, 2)).unwrap();

    assert_eq!(victim.id(), 0);
    assert!(cache.contains(1));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_cache_take_keeps_admission_order() {
    let mut cache = BucketCache::new(3);
    cache.admit(Bucket::new(4, 1, 2));
    cache.admit(Bucket::new(5, 1, 2));
    cache.admit(Bucket::new(6, 1, 2));

    assert_eq!(cache.take(5).unwrap().id(), 5);
    assert!(cache.take(5).is_none());

    assert_eq!(cache.ids().collect::<Vec<_>>(), vec![4, 6]);
    assert!(!cache.is_empty());
}
