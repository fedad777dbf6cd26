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

//! Least-frequently-used eviction, ordered by `(frequency, insertion_seq)`
//! so ties break in favor of the earlier insertion.
//!
//! A `BTreeSet` keyed by that pair gives O(log n) access/insert/remove and
//! an O(log n) minimum; arbitrary-rank queries (`least_frequently_used(n)`)
//! walk the set and are the one place this policy is allowed to cost
//! O(n log n).

use std::collections::BTreeMap;
use std::time::Instant;

use ahash::AHashMap;

use super::Eviction;

type Rank = (u64, u64, usize);

/// LFU side index.
#[derive(Default)]
pub struct Lfu {
    ranked: BTreeMap<Rank, ()>,
    by_idx: AHashMap<usize, Rank>,
}

impl Lfu {
    /// The current hit frequency recorded for `idx`, or `0` if untracked.
    pub fn frequency(&self, idx: usize) -> u64 {
        self.by_idx.get(&idx).map(|(f, _, _)| *f).unwrap_or(0)
    }

    /// Returns the slab index with the `n`th-smallest `(frequency, seq)`
    /// rank, `0` being the eviction victim.
    pub fn nth_least_frequent(&self, n: usize) -> Option<usize> {
        self.ranked.keys().nth(n).map(|&(_, _, idx)| idx)
    }

    fn reinsert(&mut self, idx: usize, rank: Rank) {
        self.ranked.insert(rank, ());
        self.by_idx.insert(idx, rank);
    }
}

impl Eviction for Lfu {
    type Config = ();

    fn new(_config: Self::Config) -> Self {
        Self::default()
    }

    fn push(&mut self, idx: usize, seq: u64, _expires_at: Option<Instant>) {
        self.reinsert(idx, (0, seq, idx));
    }

    fn access(&mut self, idx: usize) {
        if let Some((freq, seq, _)) = self.by_idx.get(&idx).copied() {
            self.ranked.remove(&(freq, seq, idx));
            self.reinsert(idx, (freq + 1, seq, idx));
        }
    }

    fn remove(&mut self, idx: usize) {
        if let Some(rank) = self.by_idx.remove(&idx) {
            self.ranked.remove(&rank);
        }
    }

    fn pop(&mut self) -> Option<usize> {
        let rank = *self.ranked.keys().next()?;
        self.ranked.remove(&rank);
        self.by_idx.remove(&rank.2);
        Some(rank.2)
    }

    fn peek(&mut self) -> Option<usize> {
        self.ranked.keys().next().map(|&(_, _, idx)| idx)
    }

    fn clear(&mut self) {
        self.ranked.clear();
        self.by_idx.clear();
    }

    fn len(&self) -> usize {
        self.by_idx.len()
    }

    fn order(&self) -> Vec<usize> {
        self.ranked.keys().map(|&(_, _, idx)| idx).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_frequency_with_insertion_order_tiebreak() {
        let mut lfu = Lfu::new(());
        for (idx, seq) in [(0u64, 0u64), (1, 1), (2, 2), (3, 3), (4, 4)] {
            lfu.push(idx as usize, seq, None);
        }
        let hits = [(0usize, 10), (1, 7), (2, 3), (3, 4), (4, 6)];
        for (idx, n) in hits {
            for _ in 0..n {
                lfu.access(idx);
            }
        }
        assert_eq!(lfu.pop(), Some(2));
        assert_eq!(lfu.pop(), Some(3));
    }

    #[test]
    fn ties_break_by_earlier_insertion() {
        let mut lfu = Lfu::new(());
        lfu.push(10, 5, None);
        lfu.push(11, 6, None);
        // Both stay at frequency 0; the earlier `seq` must evict first.
        assert_eq!(lfu.peek(), Some(10));
    }

    #[test]
    fn nth_rank_query() {
        let mut lfu = Lfu::new(());
        lfu.push(0, 0, None);
        lfu.push(1, 1, None);
        lfu.push(2, 2, None);
        lfu.access(2);
        lfu.access(2);
        assert_eq!(lfu.nth_least_frequent(0), Some(0));
        assert_eq!(lfu.nth_least_frequent(2), Some(2));
    }
}
