//! Bucket cache
//!
//! Bounded set of materialized buckets with FIFO admission order. Admitting
//! a bucket into a full cache evicts the oldest admitted one, never the
//! bucket just admitted.

use std::collections::{HashMap, VecDeque};

use super::bucket::Bucket;

/// In-memory working set of buckets
#[derive(Debug)]
pub struct BucketCache {
    buckets: HashMap<u32, Bucket>,
    /// Bucket ids, oldest admission first
    admitted: VecDeque<u32>,
    limit: usize,
}

impl BucketCache {
    pub fn new(limit: usize) -> Self {
        Self {
            buckets: HashMap::with_capacity(limit + 1),
            admitted: VecDeque::with_capacity(limit + 1),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.buckets.contains_key(&id)
    }

    pub fn get(&self, id: u32) -> Option<&Bucket> {
        self.buckets.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Bucket> {
        self.buckets.get_mut(&id)
    }

    /// Resident bucket ids in admission order
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.admitted.iter().copied()
    }

    /// Remove a bucket without writing it anywhere
    pub fn take(&mut self, id: u32) -> Option<Bucket> {
        let bucket = self.buckets.remove(&id)?;
        self.admitted.retain(|&queued| queued != id);
        Some(bucket)
    }

    /// Admit a bucket, returning the evicted bucket if the cache overflowed
    ///
    /// The caller owns the victim and must persist it.
    pub fn admit(&mut self, bucket: Bucket) -> Option<Bucket> {
        let id = bucket.id();
        if self.buckets.insert(id, bucket).is_some() {
            self.admitted.retain(|&queued| queued != id);
        }
        self.admitted.push_back(id);

        if self.buckets.len() <= self.limit {
            return None;
        }

        let victim = self.admitted.iter().position(|&queued| queued != id)?;
        let victim_id = self.admitted.remove(victim)?;
        self.buckets.remove(&victim_id)
    }
}
