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

//! Random replacement eviction: every live entry is equally likely to be
//! chosen as the victim. `access` is a no-op.
//!
//! The PRNG is seeded once, at construction, and never reseeded
//! (per-spec); it is not meant to be cryptographically unbiased, only
//! unbiased enough to spread evictions uniformly across live entries.

use std::time::Instant;

use ahash::AHashMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::Eviction;

/// RR side index: a swap-remove vector of live slab indices plus a PRNG.
pub struct Rr {
    items: Vec<usize>,
    positions: AHashMap<usize, usize>,
    rng: SmallRng,
}

impl Default for Rr {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            positions: AHashMap::new(),
            rng: SmallRng::from_entropy(),
        }
    }
}

impl Rr {
    fn swap_remove_at(&mut self, pos: usize) -> usize {
        let idx = self.items.swap_remove(pos);
        self.positions.remove(&idx);
        if pos < self.items.len() {
            let moved = self.items[pos];
            self.positions.insert(moved, pos);
        }
        idx
    }

    /// Returns a uniformly random live key's slab index without removing
    /// it.
    pub fn random_key(&mut self) -> Option<usize> {
        self.peek()
    }
}

impl Eviction for Rr {
    type Config = ();

    fn new(_config: Self::Config) -> Self {
        Self::default()
    }

    fn push(&mut self, idx: usize, _seq: u64, _expires_at: Option<Instant>) {
        self.positions.insert(idx, self.items.len());
        self.items.push(idx);
    }

    fn access(&mut self, _idx: usize) {}

    fn remove(&mut self, idx: usize) {
        if let Some(pos) = self.positions.get(&idx).copied() {
            self.swap_remove_at(pos);
        }
    }

    fn pop(&mut self) -> Option<usize> {
        if self.items.is_empty() {
            return None;
        }
        let pos = self.rng.gen_range(0..self.items.len());
        Some(self.swap_remove_at(pos))
    }

    fn peek(&mut self) -> Option<usize> {
        if self.items.is_empty() {
            return None;
        }
        let pos = self.rng.gen_range(0..self.items.len());
        Some(self.items[pos])
    }

    fn clear(&mut self) {
        self.items.clear();
        self.positions.clear();
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn order(&self) -> Vec<usize> {
        self.items.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_drains_every_entry_exactly_once() {
        let mut rr = Rr::new(());
        for idx in 0..50 {
            rr.push(idx, idx as u64, None);
        }
        let mut seen = Vec::new();
        while let Some(idx) = rr.pop() {
            seen.push(idx);
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn remove_keeps_remaining_items_intact() {
        let mut rr = Rr::new(());
        rr.push(1, 0, None);
        rr.push(2, 1, None);
        rr.push(3, 2, None);
        rr.remove(2);
        let mut rest = rr.order();
        rest.sort_unstable();
        assert_eq!(rest, vec![1, 3]);
    }
}
