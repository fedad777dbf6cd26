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

//! The `async` counterpart to [`crate::memoize::Memoizer`]: single-flight
//! coalescing for `async fn`-shaped computations, built on
//! [`tokio::sync::Mutex`] instead of `parking_lot` so the per-key critical
//! section can hold the lock across an `.await`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering::Relaxed};
use std::sync::Arc;

use ahash::RandomState;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;

use cachekit_common::Key;

use crate::memoize::{CacheInfo, MemoCache};

struct KeyLock<Err> {
    mutex: AsyncMutex<()>,
    waiters: AtomicUsize,
    error: SyncMutex<Option<Err>>,
}

impl<Err> KeyLock<Err> {
    fn new() -> Self {
        Self {
            mutex: AsyncMutex::new(()),
            waiters: AtomicUsize::new(0),
            error: SyncMutex::new(None),
        }
    }
}

/// Single-flight memoizer over `F: Fn(&K) -> Fut`, `Fut: Future<Output =
/// Result<V, Err>>`.
///
/// Semantics mirror [`crate::memoize::Memoizer`] exactly; the only
/// difference is that the per-key lock is an async mutex, so a coalesced
/// waiter yields to the runtime instead of blocking a thread while the
/// first caller's future runs.
pub struct AsyncMemoizer<K, V, Err, C, F> {
    cache: C,
    func: F,
    key_locks: SyncMutex<HashMap<K, Arc<KeyLock<Err>>, RandomState>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V, Err, C, F, Fut> AsyncMemoizer<K, V, Err, C, F>
where
    K: Key,
    V: cachekit_common::Value,
    Err: Clone + Send + Sync + 'static,
    C: MemoCache<K, V>,
    F: Fn(&K) -> Fut,
    Fut: Future<Output = std::result::Result<V, Err>>,
{
    pub fn new(cache: C, func: F) -> Self {
        Self {
            cache,
            func,
            key_locks: SyncMutex::new(HashMap::with_hasher(RandomState::default())),
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

    fn forget_if_unused(&self, key: &K, lock: &Arc<KeyLock<Err>>) {
        if Arc::strong_count(lock) <= 2 {
            self.key_locks.lock().remove(key);
        }
    }

    /// Returns the cached result for `key`, awaiting `func` to compute
    /// and cache it on a miss. Concurrent callers for the same key
    /// coalesce onto a single in-flight future.
    pub async fn call(&self, key: K) -> std::result::Result<V, Err> {
        if let Some(value) = self.cache.cache_get(&key) {
            self.hits.fetch_add(1, Relaxed);
            return Ok(value);
        }

        let lock = self.lock_for(&key);
        lock.waiters.fetch_add(1, Relaxed);
        let guard = lock.mutex.lock().await;

        let mut cached_error = lock.error.lock();
        if let Some(err) = cached_error.clone() {
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

        let outcome = (self.func)(&key).await;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FifoCache;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn computes_once_per_key() {
        let calls = AtomicU32::new(0);
        let memo: AsyncMemoizer<i32, i32, String, _, _> =
            AsyncMemoizer::new(FifoCache::new(0), |k: &i32| {
                calls.fetch_add(1, Relaxed);
                let v = *k * 2;
                async move { Ok(v) }
            });
        assert_eq!(memo.call(3).await, Ok(6));
        assert_eq!(memo.call(3).await, Ok(6));
        assert_eq!(calls.load(Relaxed), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_coalesce_onto_one_execution() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_inner = calls.clone();
        let memo = Arc::new(AsyncMemoizer::new(FifoCache::new(0), move |k: &i32| {
            calls_inner.fetch_add(1, Relaxed);
            let v = *k * 10;
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok::<i32, String>(v)
            }
        }));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let memo = memo.clone();
            handles.push(tokio::spawn(async move { memo.call(7).await }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), Ok(70));
        }
        assert_eq!(calls.load(Relaxed), 1);
    }
}
