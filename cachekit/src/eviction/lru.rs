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

//! Least-recently-used eviction: a recency list whose tail is always the
//! next victim. Every `access` splices the entry to the head (the MRU
//! end); eviction removes from the tail.

use std::time::Instant;

use ahash::AHashMap;
use cachekit_common::{LinkedSlab, Token};

use super::Eviction;

/// LRU side index: a recency list, head = LRU victim, tail = MRU.
///
/// Note the list's own "back" is the MRU end (the direction `access`
/// splices towards); `pop`/`peek` read from the front, the LRU end.
#[derive(Default)]
pub struct Lru {
    list: LinkedSlab<usize>,
    tokens: AHashMap<usize, Token>,
}

impl Lru {
    /// Returns the most-recently-used slab index, if any.
    pub fn most_recently_used(&self) -> Option<usize> {
        self.list.iter_back_to_front().next().copied()
    }

    /// Returns the least-recently-used slab index, if any.
    pub fn least_recently_used(&self) -> Option<usize> {
        self.list.peek_front().map(|(_, idx)| *idx)
    }

    /// Iterates most-recently-used first, as [`IteratorView`](crate::iter::IteratorView)
    /// requires for this policy.
    pub fn order_mru_first(&self) -> Vec<usize> {
        self.list.iter_back_to_front().copied().collect()
    }
}

impl Eviction for Lru {
    type Config = ();

    fn new(_config: Self::Config) -> Self {
        Self::default()
    }

    fn push(&mut self, idx: usize, _seq: u64, _expires_at: Option<Instant>) {
        let token = self.list.push_back(idx);
        self.tokens.insert(idx, token);
    }

    fn access(&mut self, idx: usize) {
        if let Some(token) = self.tokens.get(&idx).copied() {
            self.list.move_to_back(token);
        }
    }

    fn remove(&mut self, idx: usize) {
        if let Some(token) = self.tokens.remove(&idx) {
            self.list.remove(token);
        }
    }

    fn pop(&mut self) -> Option<usize> {
        let (_token, idx) = self.list.pop_front()?;
        self.tokens.remove(&idx);
        Some(idx)
    }

    fn peek(&mut self) -> Option<usize> {
        self.list.peek_front().map(|(_, idx)| *idx)
    }

    fn clear(&mut self) {
        self.list.clear();
        self.tokens.clear();
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn order(&self) -> Vec<usize> {
        self.order_mru_first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_refreshes_recency() {
        let mut lru = Lru::new(());
        lru.push(1, 0, None);
        lru.push(2, 1, None);
        lru.push(3, 2, None);
        lru.access(1);
        // 2 is now the least-recently-used.
        assert_eq!(lru.least_recently_used(), Some(2));
        assert_eq!(lru.most_recently_used(), Some(1));
    }

    #[test]
    fn eviction_picks_lru_tail() {
        let mut lru = Lru::new(());
        lru.push(1, 0, None);
        lru.push(2, 1, None);
        lru.push(3, 2, None);
        lru.access(1);
        assert_eq!(lru.pop(), Some(2));
        assert_eq!(lru.pop(), Some(3));
        assert_eq!(lru.pop(), Some(1));
    }
}
