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

//! Single-flight memoization on top of any cachekit cache.
//!
//! [`Memoizer::call`] coalesces concurrent callers computing the same key
//! onto one execution of the wrapped closure: the first caller to miss
//! runs it and populates the cache; every other concurrent caller for
//! that key blocks on a per-key lock and then either observes the now-hit
//! cache entry or, if the computation failed, the cached error. Callers
//! for *different* keys never block each other.
//!
//! There is no `copy_level` knob here the way the source this was
//! distilled from has one: that parameter distinguished shallow vs. deep
//! copies of Python containers, a distinction Rust's ownership model
//! doesn't have. `V::clone()` already says exactly what "return a copy of
//! the cached value" means for a given `V`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering::Relaxed};
use std::sync::Arc;

use ahash::RandomState;
use parking_lot::Mutex;

use cachekit_common::Key;

use crate::cache::{Cache, FifoCache, LfuCache, LruCache, RrCache, TtlCache, VttlCache};
use crate::metrics::Stats;

/// What a cache needs to offer to back a [`Memoizer`].
///
/// Implemented for every cache facade in [`crate::cache`], so a memoizer
/// can be built over whichever eviction policy fits the workload.
pub trait MemoCache<K, V>: Clone + Send + Sync {
    fn cache_get(&self, key: &K) -> Option<V>;
    fn cache_insert(&self, key: K, value: V);
    fn cache_clear(&self, reuse: bool);
    fn cache_len(&self) -> usize;
    fn cache_maxsize(&self) -> usize;
    fn cache_capacity(&self) -> usize;
}

macro_rules! impl_memo_cache {
    ($ty:ident) => {
        impl<K: Key, V: cachekit_common::Value> MemoCache<K, V> for $ty<K, V> {
            fn cache_get(&self, key: &K) -> Option<V> {
                self.get(key)
            }
            fn cache_insert(&self, key: K, value: V) {
                let _ = self.insert(key, value);
            }
            fn cache_clear(&self, reuse: bool) {
                self.clear(reuse)
            }
            fn cache_len(&self) -> usize {
                self.len()
            }
            fn cache_maxsize(&self) -> usize {
                self.maxsize()
            }
            fn cache_capacity(&self) -> usize {
                self.capacity()
            }
        }
    };
}

impl_memo_cache!(Cache);
impl_memo_cache!(FifoCache);
impl_memo_cache!(RrCache);
impl_memo_cache!(LruCache);
impl_memo_cache!(LfuCache);

impl<K: Key, V: cachekit_common::Value> MemoCache<K, V> for TtlCache<K, V> {
    fn cache_get(&self, key: &K) -> Option<V> {
        self.get(key)
    }
    fn cache_insert(&self, key: K, value: V) {
        let _ = self.insert(key, value);
    }
    fn cache_clear(&self, reuse: bool) {
        self.clear(reuse)
    }
    fn cache_len(&self) -> usize {
        self.len()
    }
    fn cache_maxsize(&self) -> usize {
        self.maxsize()
    }
    fn cache_capacity(&self) -> usize {
        self.capacity()
    }
}

impl<K: Key, V: cachekit_common::Value> MemoCache<K, V> for VttlCache<K, V> {
    fn cache_get(&self, key: &K) -> Option<V> {
        self.get(key)
    }
    fn cache_insert(&self, key: K, value: V) {
        let _ = self.insert(key, value, None);
    }
    fn cache_clear(&self, reuse: bool) {
        self.clear(reuse)
    }
    fn cache_len(&self) -> usize {
        self.len()
    }
    fn cache_maxsize(&self) -> usize {
        self.maxsize()
    }
    fn cache_capacity(&self) -> usize {
        self.capacity()
    }
}

/// A snapshot of a memoizer's hit/miss counters alongside its backing
/// cache's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheInfo {
    pub hits: u64,
    pub misses: u64,
    pub maxsize: usize,
    pub length: usize,
    pub capacity: usize,
}

struct KeyLock<Err> {
    mutex: Mutex<()>,
    waiters: AtomicUsize,
    error: Mutex<Option<Err>>,
}

impl<Err> KeyLock<Err> {
    fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            waiters: AtomicUsize::new(0),
            error: Mutex::new(None),
        }
    }
}

/// Single-flight memoizer over `F: Fn(&K) -> Result<V, Err>`.
///
/// A computation that errors is not cached in `C`; instead the error is
/// held just long enough to replay it to any other caller that was
/// already coalesced on the same key, mirroring the exception-caching
/// behavior of the function this was adapted from.
pub struct Memoizer<K, V, Err, C, F> {
    cache: C,
    func: F,
    key_locks: Mutex<HashMap<K, Arc<KeyLock<Err>>, RandomState>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V, Err, C, F> Memoizer<K, V, Err, C, F>
where
    K: Key,
    V: cachekit_common::Value,
    Err: Clone + Send + Sync + 'static,
    C: MemoCache<K, V>,
    F: Fn(&K) -> std::result::Result<V, Err>,
{
    pub fn new(cache: C, func: F) -> Self {
        Self {
            cache,
            func,
            key_locks: Mutex::new(HashMap::with_hasher(RandomState::default())),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock_for(&self, key: &K) -> Arc<KeyLock<Err>> {
        self.key_locks
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(KeyLock::new()))
            .clone()
    }

    /// Drops the per-key lock entry once nobody else is waiting on it.
    /// `lock` plus the map's own entry account for two references when
    /// no other caller holds a clone, so anything beyond that means a
    /// concurrent waiter is still coalesced on this key.
    fn forget_if_unused(&self, key: &K, lock: &Arc<KeyLock<Err>>) {
        if Arc::strong_count(lock) <= 2 {
            self.key_locks.lock().remove(key);
        }
    }

    /// Returns the cached result for `key`, computing and caching it via
    /// `func` on a miss. Concurrent callers for the same key coalesce
    /// onto a single execution.
    pub fn call(&self, key: K) -> std::result::Result<V, Err> {
        if let Some(value) = self.cache.cache_get(&key) {
            self.hits.fetch_add(1, Relaxed);
            return Ok(value);
        }

        let lock = self.lock_for(&key);
        lock.waiters.fetch_add(1, Relaxed);
        let guard = lock.mutex.lock();

        let mut cached_error = lock.error.lock();
        if let Some(err) = cached_error.clone() {
            // Only the last coalesced waiter clears the cached error;
            // everyone else still queued on `guard` needs to see it too.
            if lock.waiters.load(Relaxed) <= 1 {
                *cached_error = None;
            }
            drop(cached_error);
            drop(guard);
            lock.waiters.fetch_sub(1, Relaxed);
            self.forget_if_unused(&key, &lock);
            return Err(err);
        }
        drop(cached_error);

        if let Some(value) = self.cache.cache_get(&key) {
            self.hits.fetch_add(1, Relaxed);
            drop(guard);
            lock.waiters.fetch_sub(1, Relaxed);
            self.forget_if_unused(&key, &lock);
            return Ok(value);
        }

        let outcome = (self.func)(&key);
        match &outcome {
            Ok(value) => {
                self.cache.cache_insert(key.clone(), value.clone());
                self.misses.fetch_add(1, Relaxed);
            }
            Err(err) => {
                *lock.error.lock() = Some(err.clone());
            }
        }
        drop(guard);
        lock.waiters.fetch_sub(1, Relaxed);
        self.forget_if_unused(&key, &lock);
        outcome
    }

    /// Clears the backing cache and resets hit/miss counters and any
    /// in-flight per-key locks.
    pub fn cache_clear(&self, reuse: bool) {
        self.cache.cache_clear(reuse);
        self.hits.store(0, Relaxed);
        self.misses.store(0, Relaxed);
        self.key_locks.lock().clear();
    }

    pub fn cache_info(&self) -> CacheInfo {
        CacheInfo {
            hits: self.hits.load(Relaxed),
            misses: self.misses.load(Relaxed),
            maxsize: self.cache.cache_maxsize(),
            length: self.cache.cache_len(),
            capacity: self.cache.cache_capacity(),
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

/// Reduces [`CacheInfo`] to the shape of [`crate::metrics::Stats`] for
/// callers that only care about hits/misses, e.g. logging alongside a
/// cache's own `stats()`.
impl From<CacheInfo> for Stats {
    fn from(info: CacheInfo) -> Self {
        Stats {
            hits: info.hits,
            misses: info.misses,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FifoCache;
    use std::sync::atomic::AtomicU32;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn computes_once_per_key() {
        let calls = AtomicU32::new(0);
        let memo: Memoizer<i32, i32, String, _, _> = Memoizer::new(FifoCache::new(0), |k: &i32| {
            calls.fetch_add(1, Relaxed);
            Ok(k * 2)
        });
        assert_eq!(memo.call(3), Ok(6));
        assert_eq!(memo.call(3), Ok(6));
        assert_eq!(calls.load(Relaxed), 1);
        assert_eq!(memo.cache_info().hits, 1);
        assert_eq!(memo.cache_info().misses, 1);
    }

    #[test]
    fn concurrent_callers_coalesce_onto_one_execution() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_inner = calls.clone();
        let barrier = Arc::new(Barrier::new(8));
        let memo = Arc::new(Memoizer::new(FifoCache::new(0), move |k: &i32| {
            calls_inner.fetch_add(1, Relaxed);
            thread::sleep(std::time::Duration::from_millis(20));
            Ok::<i32, String>(k * 10)
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let memo = memo.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    memo.call(7)
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), Ok(70));
        }
        assert_eq!(calls.load(Relaxed), 1);
    }

    #[test]
    fn errors_are_not_cached_in_the_backing_cache() {
        let memo: Memoizer<i32, i32, String, _, _> = Memoizer::new(FifoCache::new(0), |_: &i32| {
            Err::<i32, String>("boom".to_string())
        });
        assert_eq!(memo.call(1), Err("boom".to_string()));
        assert_eq!(memo.cache().get(&1), None);
    }

    #[test]
    fn cache_clear_resets_counters() {
        let memo: Memoizer<i32, i32, String, _, _> =
            Memoizer::new(FifoCache::new(0), |k: &i32| Ok(*k));
        memo.call(1).unwrap();
        memo.cache_clear(false);
        let info = memo.cache_info();
        assert_eq!(info.hits, 0);
        assert_eq!(info.misses, 0);
        assert_eq!(info.length, 0);
    }
}
