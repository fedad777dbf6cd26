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

//! A lock-free iterator over a consistent snapshot of a cache's entries.
//!
//! `IteratorView` takes the cache's lock exactly once, at construction, to
//! copy out entries and the cache's generation counter; it then never
//! locks again except to cheaply re-read that counter on every `next()`.
//! If any mutating operation has run on the cache since, the counter
//! mismatches and the iterator yields one [`CacheError::ConcurrentModification`]
//! and ends, rather than silently continuing over data that no longer
//! reflects a real state the cache was ever in.

use std::vec::IntoIter;

use cachekit_common::{CacheError, Result};

/// Snapshot iterator returned by every facade's `iter()`.
///
/// Iteration order matches the owning policy: insertion order for FIFO and
/// uniform TTL, most-recently-used-first for LRU, and an unspecified but
/// stable-for-the-snapshot order for LFU, RR, VTTL and the policy-less
/// `Cache`.
pub struct IteratorView<K, V> {
    items: IntoIter<(K, V)>,
    generation: u64,
    current_generation: Box<dyn Fn() -> u64 + Send + Sync>,
    poisoned: bool,
}

impl<K, V> IteratorView<K, V> {
    pub(crate) fn new(
        items: Vec<(K, V)>,
        generation: u64,
        current_generation: Box<dyn Fn() -> u64 + Send + Sync>,
    ) -> Self {
        Self {
            items: items.into_iter(),
            generation,
            current_generation,
            poisoned: false,
        }
    }
}

impl<K, V> Iterator for IteratorView<K, V> {
    type Item = Result<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }
        if (self.current_generation)() != self.generation {
            self.poisoned = true;
            return Some(Err(CacheError::ConcurrentModification));
        }
        self.items.next().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[test]
    fn yields_every_item_when_untouched() {
        let gen = Arc::new(AtomicU64::new(1));
        let gen_read = gen.clone();
        let view = IteratorView::new(
            vec![("a", 1), ("b", 2)],
            1,
            Box::new(move || gen_read.load(Ordering::SeqCst)),
        );
        let out: Vec<_> = view.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(out, vec![("a", 1), ("b", 2)]);
    }

    #[test]
    fn fails_fast_on_generation_change() {
        let gen = Arc::new(AtomicU64::new(1));
        let gen_read = gen.clone();
        let mut view = IteratorView::new(
            vec![("a", 1), ("b", 2)],
            1,
            Box::new(move || gen_read.load(Ordering::SeqCst)),
        );
        gen.store(2, Ordering::SeqCst);
        assert_eq!(view.next(), Some(Err(CacheError::ConcurrentModification)));
        assert_eq!(view.next(), None);
    }
}
