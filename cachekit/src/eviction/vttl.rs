//  Copyright 2024 Cachekit Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! Per-entry TTL eviction: a min-heap keyed by absolute expiry, with
//! entries that carry no expiry sorting last (they are only evicted by
//! capacity pressure, never by `expire()`).
//!
//! `std::collections::BinaryHeap` has no decrease-key, so a value
//! replacement that changes an entry's TTL is implemented by pushing a new
//! heap entry tagged with a bumped version number and leaving the old one
//! behind as a tombstone; `pop`/`peek` skip tombstones lazily by checking
//! the version against the map of live entries.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Instant;

use ahash::AHashMap;

use super::Eviction;

/// Expiry sorts ascending (sooner first); `None` (no expiry) sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExpiryKey(Option<Instant>);

impl PartialOrd for ExpiryKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ExpiryKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct HeapEntry {
    key: ExpiryKey,
    seq: u64,
    idx: usize,
    version: u64,
}

/// VTTL side index.
#[derive(Default)]
pub struct Vttl {
    heap: BinaryHeap<Reverse<HeapEntry>>,
    live: AHashMap<usize, (ExpiryKey, u64, u64)>,
    next_version: u64,
}

impl Vttl {
    fn push_versioned(&mut self, idx: usize, seq: u64, expires_at: Option<Instant>) {
        let key = ExpiryKey(expires_at);
        let version = self.next_version;
        self.next_version += 1;
        self.live.insert(idx, (key, seq, version));
        self.heap.push(Reverse(HeapEntry {
            key,
            seq,
            idx,
            version,
        }));
    }

    fn prune_stale(&mut self) {
        while let Some(Reverse(top)) = self.heap.peek() {
            match self.live.get(&top.idx) {
                Some(&(key, seq, version))
                    if key == top.key && seq == top.seq && version == top.version =>
                {
                    break;
                }
                _ => {
                    self.heap.pop();
                }
            }
        }
    }
}

impl Eviction for Vttl {
    type Config = ();

    fn new(_config: Self::Config) -> Self {
        Self::default()
    }

    fn push(&mut self, idx: usize, seq: u64, expires_at: Option<Instant>) {
        self.push_versioned(idx, seq, expires_at);
    }

    fn access(&mut self, _idx: usize) {}

    fn remove(&mut self, idx: usize) {
        self.live.remove(&idx);
        self.prune_stale();
    }

    fn reschedule(&mut self, idx: usize, seq: u64, expires_at: Option<Instant>) {
        self.push_versioned(idx, seq, expires_at);
    }

    fn pop(&mut self) -> Option<usize> {
        self.prune_stale();
        let Reverse(top) = self.heap.pop()?;
        self.live.remove(&top.idx);
        self.prune_stale();
        Some(top.idx)
    }

    fn peek(&mut self) -> Option<usize> {
        self.prune_stale();
        self.heap.peek().map(|Reverse(top)| top.idx)
    }

    fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }

    fn len(&self) -> usize {
        self.live.len()
    }

    fn order(&self) -> Vec<usize> {
        let mut entries: Vec<_> = self
            .live
            .iter()
            .map(|(&idx, &(key, seq, _))| (key, seq, idx))
            .collect();
        entries.sort();
        entries.into_iter().map(|(_, _, idx)| idx).collect()
    }
}
