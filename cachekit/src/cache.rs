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

//! Public cache facades. Each type here is a thin, cheaply-`Clone`able
//! handle around a [`PolicyCache`], which in turn is a single
//! [`parking_lot::Mutex`] guarding a [`RawCore`] parameterized by the
//! policy's [`Eviction`] implementation.
//!
//! Cloning a facade clones the `Arc` handle, not the cache: every clone
//! sees the same entries, the same lock, the same generation counter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use serde::{Deserialize, Serialize};

use cachekit_common::{CacheError, Clock, Key, Result, Value};

use crate::codec::{export_to_records, records_to_import, CacheSnapshot, EntryRecord, PolicyTag};
use crate::core::RawCore;
use crate::eviction::fifo::Fifo;
use crate::eviction::lfu::Lfu;
use crate::eviction::lru::Lru;
use crate::eviction::plain::Plain;
use crate::eviction::rr::Rr;
use crate::eviction::vttl::Vttl;
use crate::eviction::Eviction;
use crate::iter::IteratorView;
use crate::metrics::Stats;

/// Resolves an ordinal index against a sequence of length `len`, Python-list
/// style: non-negative indices count from the front, negative indices count
/// from the back (`-1` is the last element). Returns `None` if `index` falls
/// outside `[-len, len)`.
fn resolve_ordinal(len: usize, index: i64) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { len + index } else { index };
    (resolved >= 0 && resolved < len).then_some(resolved as usize)
}

/// The shared guts behind every public cache facade: an `Arc<Mutex<RawCore>>`
/// plus the common operation set every policy offers identically.
pub(crate) struct PolicyCache<K, V, E: Eviction> {
    inner: Arc<Mutex<RawCore<K, V, E>>>,
}

impl<K, V, E> Clone for PolicyCache<K, V, E>
where
    E: Eviction,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V, E> PolicyCache<K, V, E>
where
    K: Key,
    V: Value,
    E: Eviction,
{
    fn new(maxsize: usize, capacity: usize, config: E::Config) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RawCore::new(maxsize, capacity, config))),
        }
    }

    #[cfg(test)]
    fn with_clock(maxsize: usize, config: E::Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RawCore::with_clock(maxsize, 0, config, clock))),
        }
    }

    fn insert(&self, key: K, value: V) -> Result<Option<V>> {
        self.inner.lock().insert(key, value, None)
    }

    fn insert_with_expiry(&self, key: K, value: V, expires_at: Option<Instant>) -> Result<Option<V>> {
        self.inner.lock().insert(key, value, expires_at)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key)
    }

    fn peek(&self, key: &K) -> Option<V> {
        self.inner.lock().peek(key)
    }

    fn peek_with_expiry(&self, key: &K) -> Option<(V, Option<Instant>)> {
        self.inner.lock().peek_with_expiry(key)
    }

    fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key)
    }

    fn popitem(&self) -> Result<(K, V)> {
        self.inner.lock().popitem()
    }

    fn peekitem_with_expiry(&self) -> Result<(K, V, Option<Instant>)> {
        self.inner.lock().peekitem_with_expiry()
    }

    fn drain(&self, n: usize) -> Vec<(K, V)> {
        self.inner.lock().drain(n)
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }

    fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    fn is_full(&self) -> bool {
        self.inner.lock().is_full()
    }

    fn maxsize(&self) -> usize {
        self.inner.lock().maxsize()
    }

    fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    fn clear(&self, reuse: bool) {
        self.inner.lock().clear(reuse)
    }

    fn shrink_to_fit(&self) {
        self.inner.lock().shrink_to_fit()
    }

    fn stats(&self) -> Stats {
        self.inner.lock().stats()
    }

    /// Gets `key`'s value, inserting `make_default()` first if it was
    /// absent. `make_default` only runs on a miss.
    fn setdefault(&self, key: K, make_default: impl FnOnce() -> V) -> Result<V> {
        let mut core = self.inner.lock();
        if let Some(value) = core.get(&key) {
            return Ok(value);
        }
        let value = make_default();
        core.insert(key, value.clone(), None)?;
        Ok(value)
    }

    fn iter(&self) -> IteratorView<K, V> {
        let mut core = self.inner.lock();
        let items = core.snapshot();
        let generation = core.generation();
        drop(core);
        let inner = self.inner.clone();
        IteratorView::new(items, generation, Box::new(move || inner.lock().generation()))
    }

    fn export_records(&self) -> (usize, usize, Vec<EntryRecord<K, V>>)
    where
        K: Serialize,
        V: Serialize,
    {
        let core = self.inner.lock();
        let now = core.clock().now();
        let records = export_to_records(core.export(), now);
        (core.maxsize(), core.capacity(), records)
    }

    fn restore_records(maxsize: usize, capacity: usize, config: E::Config, records: Vec<EntryRecord<K, V>>) -> Self
    where
        K: for<'de> Deserialize<'de>,
        V: for<'de> Deserialize<'de>,
    {
        let cache = Self::new(maxsize, capacity, config);
        let mut core = cache.inner.lock();
        let now = core.clock().now();
        core.import(records_to_import(records, now), now);
        drop(core);
        cache
    }
}

/// A bare key-value cache with no eviction policy at all: a full,
/// bounded instance rejects inserts with `CapacityExceeded` instead of
/// making room.
#[derive(Clone)]
pub struct Cache<K, V> {
    inner: PolicyCache<K, V, Plain>,
}

impl<K: Key, V: Value> Cache<K, V> {
    /// Takes a serde-serializable snapshot of every live entry.
    pub fn to_snapshot(&self) -> CacheSnapshot<K, V>
    where
        K: Serialize,
        V: Serialize,
    {
        let (maxsize, capacity, entries) = self.inner.export_records();
        CacheSnapshot {
            policy: PolicyTag::Plain,
            maxsize,
            capacity,
            ttl_millis: None,
            entries,
        }
    }

    /// Rebuilds a cache from a snapshot taken by [`Cache::to_snapshot`].
    /// Entries whose TTL had already elapsed are dropped.
    pub fn from_snapshot(snapshot: CacheSnapshot<K, V>) -> Self
    where
        K: for<'de> Deserialize<'de>,
        V: for<'de> Deserialize<'de>,
    {
        Self {
            inner: PolicyCache::restore_records(snapshot.maxsize, snapshot.capacity, (), snapshot.entries),
        }
    }

    /// Creates a cache holding at most `maxsize` entries. `maxsize == 0`
    /// means unbounded.
    pub fn new(maxsize: usize) -> Self {
        Self {
            inner: PolicyCache::new(maxsize, maxsize, ()),
        }
    }

    pub fn with_capacity(maxsize: usize, capacity: usize) -> Self {
        Self {
            inner: PolicyCache::new(maxsize, capacity, ()),
        }
    }

    pub fn insert(&self, key: K, value: V) -> Result<Option<V>> {
        self.inner.insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    /// Looks `key` up, failing `KeyNotFound` instead of returning `None`.
    pub fn get_or_err(&self, key: &K) -> Result<V> {
        self.get(key).ok_or(CacheError::KeyNotFound)
    }

    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.peek(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    pub fn setdefault(&self, key: K, make_default: impl FnOnce() -> V) -> Result<V> {
        self.inner.setdefault(key, make_default)
    }

    /// Removes and returns an arbitrary live entry — `Plain` tracks no
    /// eviction order, so there is no "oldest"/"least-used" victim to
    /// prefer.
    pub fn popitem(&self) -> Result<(K, V)> {
        self.inner.popitem()
    }

    pub fn drain(&self, n: usize) -> Vec<(K, V)> {
        self.inner.drain(n)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn maxsize(&self) -> usize {
        self.inner.maxsize()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn clear(&self, reuse: bool) {
        self.inner.clear(reuse)
    }

    pub fn shrink_to_fit(&self) {
        self.inner.shrink_to_fit()
    }

    pub fn stats(&self) -> Stats {
        self.inner.stats()
    }

    pub fn iter(&self) -> IteratorView<K, V> {
        self.inner.iter()
    }

    pub fn update(&self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()> {
        for (k, v) in entries {
            self.insert(k, v)?;
        }
        Ok(())
    }
}

/// A FIFO cache: the oldest live insertion is always the next eviction
/// victim, regardless of how often a key is read.
#[derive(Clone)]
pub struct FifoCache<K, V> {
    inner: PolicyCache<K, V, Fifo>,
}

impl<K: Key, V: Value> FifoCache<K, V> {
    /// Takes a serde-serializable snapshot of every live entry, oldest first.
    pub fn to_snapshot(&self) -> CacheSnapshot<K, V>
    where
        K: Serialize,
        V: Serialize,
    {
        let (maxsize, capacity, entries) = self.inner.export_records();
        CacheSnapshot {
            policy: PolicyTag::Fifo,
            maxsize,
            capacity,
            ttl_millis: None,
            entries,
        }
    }

    /// Rebuilds a cache from a snapshot taken by [`FifoCache::to_snapshot`].
    pub fn from_snapshot(snapshot: CacheSnapshot<K, V>) -> Self
    where
        K: for<'de> Deserialize<'de>,
        V: for<'de> Deserialize<'de>,
    {
        Self {
            inner: PolicyCache::restore_records(snapshot.maxsize, snapshot.capacity, (), snapshot.entries),
        }
    }

    pub fn new(maxsize: usize) -> Self {
        Self {
            inner: PolicyCache::new(maxsize, maxsize, ()),
        }
    }

    pub fn with_capacity(maxsize: usize, capacity: usize) -> Self {
        Self {
            inner: PolicyCache::new(maxsize, capacity, ()),
        }
    }

    pub fn insert(&self, key: K, value: V) -> Result<Option<V>> {
        self.inner.insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    /// Looks `key` up, failing `KeyNotFound` instead of returning `None`.
    pub fn get_or_err(&self, key: &K) -> Result<V> {
        self.get(key).ok_or(CacheError::KeyNotFound)
    }

    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.peek(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    pub fn setdefault(&self, key: K, make_default: impl FnOnce() -> V) -> Result<V> {
        self.inner.setdefault(key, make_default)
    }

    /// Removes and returns the oldest live entry.
    pub fn popitem(&self) -> Result<(K, V)> {
        self.inner.popitem()
    }

    pub fn drain(&self, n: usize) -> Vec<(K, V)> {
        self.inner.drain(n)
    }

    /// The live key at ordinal `index` counting from the oldest entry
    /// (`0` is the oldest); negative indices count from the newest end
    /// (`-1` is the newest).
    pub fn first(&self, index: i64) -> Option<K> {
        let core = self.inner.inner.lock();
        let order = core.eviction().order();
        let pos = resolve_ordinal(order.len(), index)?;
        core.entry_at(order[pos]).map(|(k, _)| k.clone())
    }

    /// The live key at ordinal `index` counting from the newest entry
    /// (`0` is the newest); negative indices count from the oldest end
    /// (`-1` is the oldest).
    pub fn last(&self, index: i64) -> Option<K> {
        let core = self.inner.inner.lock();
        let order = core.eviction().order();
        let pos = resolve_ordinal(order.len(), index)?;
        core.entry_at(order[order.len() - 1 - pos]).map(|(k, _)| k.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn maxsize(&self) -> usize {
        self.inner.maxsize()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn clear(&self, reuse: bool) {
        self.inner.clear(reuse)
    }

    pub fn shrink_to_fit(&self) {
        self.inner.shrink_to_fit()
    }

    pub fn stats(&self) -> Stats {
        self.inner.stats()
    }

    pub fn iter(&self) -> IteratorView<K, V> {
        self.inner.iter()
    }

    pub fn update(&self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()> {
        for (k, v) in entries {
            self.insert(k, v)?;
        }
        Ok(())
    }
}

/// A random-replacement cache: the eviction victim is drawn uniformly
/// from the live set.
#[derive(Clone)]
pub struct RrCache<K, V> {
    inner: PolicyCache<K, V, Rr>,
}

impl<K: Key, V: Value> RrCache<K, V> {
    /// Takes a serde-serializable snapshot of every live entry.
    pub fn to_snapshot(&self) -> CacheSnapshot<K, V>
    where
        K: Serialize,
        V: Serialize,
    {
        let (maxsize, capacity, entries) = self.inner.export_records();
        CacheSnapshot {
            policy: PolicyTag::Rr,
            maxsize,
            capacity,
            ttl_millis: None,
            entries,
        }
    }

    /// Rebuilds a cache from a snapshot taken by [`RrCache::to_snapshot`].
    pub fn from_snapshot(snapshot: CacheSnapshot<K, V>) -> Self
    where
        K: for<'de> Deserialize<'de>,
        V: for<'de> Deserialize<'de>,
    {
        Self {
            inner: PolicyCache::restore_records(snapshot.maxsize, snapshot.capacity, (), snapshot.entries),
        }
    }

    pub fn new(maxsize: usize) -> Self {
        Self {
            inner: PolicyCache::new(maxsize, maxsize, ()),
        }
    }

    pub fn with_capacity(maxsize: usize, capacity: usize) -> Self {
        Self {
            inner: PolicyCache::new(maxsize, capacity, ()),
        }
    }

    pub fn insert(&self, key: K, value: V) -> Result<Option<V>> {
        self.inner.insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    /// Looks `key` up, failing `KeyNotFound` instead of returning `None`.
    pub fn get_or_err(&self, key: &K) -> Result<V> {
        self.get(key).ok_or(CacheError::KeyNotFound)
    }

    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.peek(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    pub fn setdefault(&self, key: K, make_default: impl FnOnce() -> V) -> Result<V> {
        self.inner.setdefault(key, make_default)
    }

    pub fn popitem(&self) -> Result<(K, V)> {
        self.inner.popitem()
    }

    pub fn drain(&self, n: usize) -> Vec<(K, V)> {
        self.inner.drain(n)
    }

    /// A uniformly random live key, without removing it.
    pub fn random_key(&self) -> Option<K> {
        let mut core = self.inner.inner.lock();
        let idx = core.eviction_mut().peek()?;
        core.entry_at(idx).map(|(k, _)| k.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn maxsize(&self) -> usize {
        self.inner.maxsize()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn clear(&self, reuse: bool) {
        self.inner.clear(reuse)
    }

    pub fn shrink_to_fit(&self) {
        self.inner.shrink_to_fit()
    }

    pub fn stats(&self) -> Stats {
        self.inner.stats()
    }

    pub fn iter(&self) -> IteratorView<K, V> {
        self.inner.iter()
    }

    pub fn update(&self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()> {
        for (k, v) in entries {
            self.insert(k, v)?;
        }
        Ok(())
    }
}

/// A least-recently-used cache: every read moves its key to the
/// most-recently-used end; eviction always takes the opposite end.
#[derive(Clone)]
pub struct LruCache<K, V> {
    inner: PolicyCache<K, V, Lru>,
}

impl<K: Key, V: Value> LruCache<K, V> {
    /// Takes a serde-serializable snapshot of every live entry, in
    /// least-recently-used to most-recently-used order.
    pub fn to_snapshot(&self) -> CacheSnapshot<K, V>
    where
        K: Serialize,
        V: Serialize,
    {
        let (maxsize, capacity, entries) = self.inner.export_records();
        CacheSnapshot {
            policy: PolicyTag::Lru,
            maxsize,
            capacity,
            ttl_millis: None,
            entries,
        }
    }

    /// Rebuilds a cache from a snapshot taken by [`LruCache::to_snapshot`].
    pub fn from_snapshot(snapshot: CacheSnapshot<K, V>) -> Self
    where
        K: for<'de> Deserialize<'de>,
        V: for<'de> Deserialize<'de>,
    {
        Self {
            inner: PolicyCache::restore_records(snapshot.maxsize, snapshot.capacity, (), snapshot.entries),
        }
    }

    pub fn new(maxsize: usize) -> Self {
        Self {
            inner: PolicyCache::new(maxsize, maxsize, ()),
        }
    }

    pub fn with_capacity(maxsize: usize, capacity: usize) -> Self {
        Self {
            inner: PolicyCache::new(maxsize, capacity, ()),
        }
    }

    pub fn insert(&self, key: K, value: V) -> Result<Option<V>> {
        self.inner.insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    /// Looks `key` up, failing `KeyNotFound` instead of returning `None`.
    pub fn get_or_err(&self, key: &K) -> Result<V> {
        self.get(key).ok_or(CacheError::KeyNotFound)
    }

    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.peek(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    pub fn setdefault(&self, key: K, make_default: impl FnOnce() -> V) -> Result<V> {
        self.inner.setdefault(key, make_default)
    }

    /// Removes and returns the least-recently-used entry.
    pub fn popitem(&self) -> Result<(K, V)> {
        self.inner.popitem()
    }

    pub fn drain(&self, n: usize) -> Vec<(K, V)> {
        self.inner.drain(n)
    }

    /// The most-recently-used live key.
    pub fn most_recently_used(&self) -> Option<K> {
        let core = self.inner.inner.lock();
        let idx = core.eviction().most_recently_used()?;
        core.entry_at(idx).map(|(k, _)| k.clone())
    }

    /// The least-recently-used live key.
    pub fn least_recently_used(&self) -> Option<K> {
        let core = self.inner.inner.lock();
        let idx = core.eviction().least_recently_used()?;
        core.entry_at(idx).map(|(k, _)| k.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn maxsize(&self) -> usize {
        self.inner.maxsize()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn clear(&self, reuse: bool) {
        self.inner.clear(reuse)
    }

    pub fn shrink_to_fit(&self) {
        self.inner.shrink_to_fit()
    }

    pub fn stats(&self) -> Stats {
        self.inner.stats()
    }

    pub fn iter(&self) -> IteratorView<K, V> {
        self.inner.iter()
    }

    pub fn update(&self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()> {
        for (k, v) in entries {
            self.insert(k, v)?;
        }
        Ok(())
    }
}

/// A least-frequently-used cache. Ties between equally infrequent entries
/// break in favor of whichever was inserted earlier.
#[derive(Clone)]
pub struct LfuCache<K, V> {
    inner: PolicyCache<K, V, Lfu>,
}

impl<K: Key, V: Value> LfuCache<K, V> {
    /// Takes a serde-serializable snapshot of every live entry. Recorded
    /// access frequencies are not part of the snapshot; a restored cache
    /// starts every entry back at frequency zero.
    pub fn to_snapshot(&self) -> CacheSnapshot<K, V>
    where
        K: Serialize,
        V: Serialize,
    {
        let (maxsize, capacity, entries) = self.inner.export_records();
        CacheSnapshot {
            policy: PolicyTag::Lfu,
            maxsize,
            capacity,
            ttl_millis: None,
            entries,
        }
    }

    /// Rebuilds a cache from a snapshot taken by [`LfuCache::to_snapshot`].
    pub fn from_snapshot(snapshot: CacheSnapshot<K, V>) -> Self
    where
        K: for<'de> Deserialize<'de>,
        V: for<'de> Deserialize<'de>,
    {
        Self {
            inner: PolicyCache::restore_records(snapshot.maxsize, snapshot.capacity, (), snapshot.entries),
        }
    }

    pub fn new(maxsize: usize) -> Self {
        Self {
            inner: PolicyCache::new(maxsize, maxsize, ()),
        }
    }

    pub fn with_capacity(maxsize: usize, capacity: usize) -> Self {
        Self {
            inner: PolicyCache::new(maxsize, capacity, ()),
        }
    }

    pub fn insert(&self, key: K, value: V) -> Result<Option<V>> {
        self.inner.insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    /// Looks `key` up, failing `KeyNotFound` instead of returning `None`.
    pub fn get_or_err(&self, key: &K) -> Result<V> {
        self.get(key).ok_or(CacheError::KeyNotFound)
    }

    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.peek(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    pub fn setdefault(&self, key: K, make_default: impl FnOnce() -> V) -> Result<V> {
        self.inner.setdefault(key, make_default)
    }

    /// Removes and returns the least-frequently-used entry.
    pub fn popitem(&self) -> Result<(K, V)> {
        self.inner.popitem()
    }

    pub fn drain(&self, n: usize) -> Vec<(K, V)> {
        self.inner.drain(n)
    }

    /// The number of recorded hits against `key`, or `0` if absent.
    pub fn frequency(&self, key: &K) -> u64 {
        let core = self.inner.inner.lock();
        core.index_of(key)
            .map(|idx| core.eviction().frequency(idx))
            .unwrap_or(0)
    }

    /// The key with the `n`th-lowest frequency, `0` being the next
    /// eviction victim.
    pub fn least_frequently_used(&self, n: usize) -> Option<K> {
        let core = self.inner.inner.lock();
        let idx = core.eviction().nth_least_frequent(n)?;
        core.entry_at(idx).map(|(k, _)| k.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn maxsize(&self) -> usize {
        self.inner.maxsize()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn clear(&self, reuse: bool) {
        self.inner.clear(reuse)
    }

    pub fn shrink_to_fit(&self) {
        self.inner.shrink_to_fit()
    }

    pub fn stats(&self) -> Stats {
        self.inner.stats()
    }

    pub fn iter(&self) -> IteratorView<K, V> {
        self.inner.iter()
    }

    pub fn update(&self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()> {
        for (k, v) in entries {
            self.insert(k, v)?;
        }
        Ok(())
    }
}

/// A cache where every entry shares one time-to-live, stamped at
/// insertion. Because every entry's TTL is identical, insertion order and
/// expiry order coincide, so this reuses the FIFO side index directly.
#[derive(Clone)]
pub struct TtlCache<K, V> {
    inner: PolicyCache<K, V, Fifo>,
    ttl: Duration,
}

impl<K: Key, V: Value> TtlCache<K, V> {
    /// Takes a serde-serializable snapshot of every live entry alongside
    /// the cache's shared TTL.
    pub fn to_snapshot(&self) -> CacheSnapshot<K, V>
    where
        K: Serialize,
        V: Serialize,
    {
        let (maxsize, capacity, entries) = self.inner.export_records();
        CacheSnapshot {
            policy: PolicyTag::Ttl,
            maxsize,
            capacity,
            ttl_millis: Some(self.ttl.as_millis() as u64),
            entries,
        }
    }

    /// Rebuilds a cache from a snapshot taken by [`TtlCache::to_snapshot`].
    /// Falls back to `fallback_ttl` if the snapshot carries no `ttl_millis`.
    pub fn from_snapshot(snapshot: CacheSnapshot<K, V>, fallback_ttl: Duration) -> Self
    where
        K: for<'de> Deserialize<'de>,
        V: for<'de> Deserialize<'de>,
    {
        let ttl = snapshot
            .ttl_millis
            .map(|ms| Duration::from_millis(ms))
            .unwrap_or(fallback_ttl);
        Self {
            inner: PolicyCache::restore_records(snapshot.maxsize, snapshot.capacity, (), snapshot.entries),
            ttl,
        }
    }

    /// Creates a cache holding at most `maxsize` entries, each expiring
    /// `ttl` after insertion. Fails `InvalidTtl` if `ttl` is zero.
    pub fn new(maxsize: usize, ttl: Duration) -> Result<Self> {
        Self::with_capacity(maxsize, maxsize, ttl)
    }

    pub fn with_capacity(maxsize: usize, capacity: usize, ttl: Duration) -> Result<Self> {
        if ttl.is_zero() {
            return Err(CacheError::InvalidTtl);
        }
        Ok(Self {
            inner: PolicyCache::new(maxsize, capacity, ()),
            ttl,
        })
    }

    fn expires_at(&self) -> Option<Instant> {
        Some(Instant::now() + self.ttl)
    }

    pub fn insert(&self, key: K, value: V) -> Result<Option<V>> {
        self.inner.insert_with_expiry(key, value, self.expires_at())
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    /// Looks `key` up, failing `KeyNotFound` instead of returning `None`.
    /// The idiomatic-Rust stand-in for the source's subscript access: this
    /// crate can't implement `std::ops::Index` here, since every facade
    /// hands values out by clone from behind a mutex guard rather than by
    /// reference.
    pub fn get_or_err(&self, key: &K) -> Result<V> {
        self.get(key).ok_or(CacheError::KeyNotFound)
    }

    /// Looks `key` up alongside its remaining time-to-live, without
    /// recording an access.
    pub fn get_with_expire(&self, key: &K) -> Option<(V, Duration)> {
        let (value, expires_at) = self.inner.peek_with_expiry(key)?;
        let remaining = expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or_default();
        Some((value, remaining))
    }

    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.peek(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    pub fn setdefault(&self, key: K, make_default: impl FnOnce() -> V) -> Result<V> {
        // Route through `insert_with_expiry` for the miss path so the TTL
        // is stamped the same way a plain `insert` would.
        let mut core = self.inner.inner.lock();
        if let Some(value) = core.get(&key) {
            return Ok(value);
        }
        let value = make_default();
        core.insert(key, value.clone(), self.expires_at())?;
        Ok(value)
    }

    /// Removes and returns the oldest (and therefore soonest-to-expire)
    /// live entry.
    pub fn popitem(&self) -> Result<(K, V)> {
        self.inner.popitem()
    }

    /// Removes and returns the oldest live entry alongside its remaining
    /// time-to-live at the moment of removal.
    pub fn popitem_with_expire(&self) -> Result<(K, V, Duration)> {
        let (key, value, expires_at) = self.inner.peekitem_with_expiry()?;
        let remaining = expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or_default();
        self.inner.popitem()?;
        Ok((key, value, remaining))
    }

    pub fn drain(&self, n: usize) -> Vec<(K, V)> {
        self.inner.drain(n)
    }

    /// The live key at ordinal `index` counting from the oldest (and
    /// therefore soonest-to-expire) entry; negative indices count from
    /// the newest end. Mirrors [`FifoCache::first`] since TTL reuses the
    /// FIFO insertion queue.
    pub fn first(&self, index: i64) -> Option<K> {
        let core = self.inner.inner.lock();
        let order = core.eviction().order();
        let pos = resolve_ordinal(order.len(), index)?;
        core.entry_at(order[pos]).map(|(k, _)| k.clone())
    }

    /// The live key at ordinal `index` counting from the newest entry;
    /// negative indices count from the oldest end.
    pub fn last(&self, index: i64) -> Option<K> {
        let core = self.inner.inner.lock();
        let order = core.eviction().order();
        let pos = resolve_ordinal(order.len(), index)?;
        core.entry_at(order[order.len() - 1 - pos]).map(|(k, _)| k.clone())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn maxsize(&self) -> usize {
        self.inner.maxsize()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn clear(&self, reuse: bool) {
        self.inner.clear(reuse)
    }

    pub fn shrink_to_fit(&self) {
        self.inner.shrink_to_fit()
    }

    pub fn stats(&self) -> Stats {
        self.inner.stats()
    }

    pub fn iter(&self) -> IteratorView<K, V> {
        self.inner.iter()
    }

    pub fn update(&self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()> {
        for (k, v) in entries {
            self.insert(k, v)?;
        }
        Ok(())
    }
}

/// How long a [`VttlCache`] entry should live, as supplied to
/// [`VttlCache::insert`]/[`VttlCache::setdefault`]. spec.md requires both
/// a relative and an absolute form.
#[derive(Debug, Clone, Copy)]
pub enum Expiry {
    /// Expires `Duration` after the moment of insertion.
    In(Duration),
    /// Expires at an absolute instant.
    At(Instant),
}

impl From<Duration> for Expiry {
    fn from(d: Duration) -> Self {
        Expiry::In(d)
    }
}

impl From<Instant> for Expiry {
    fn from(at: Instant) -> Self {
        Expiry::At(at)
    }
}

/// A cache where each entry carries its own time-to-live, set (and
/// updatable) per insertion.
#[derive(Clone)]
pub struct VttlCache<K, V> {
    inner: PolicyCache<K, V, Vttl>,
}

impl<K: Key, V: Value> VttlCache<K, V> {
    /// Takes a serde-serializable snapshot of every live entry alongside
    /// each entry's own remaining TTL.
    pub fn to_snapshot(&self) -> CacheSnapshot<K, V>
    where
        K: Serialize,
        V: Serialize,
    {
        let (maxsize, capacity, entries) = self.inner.export_records();
        CacheSnapshot {
            policy: PolicyTag::Vttl,
            maxsize,
            capacity,
            ttl_millis: None,
            entries,
        }
    }

    /// Rebuilds a cache from a snapshot taken by [`VttlCache::to_snapshot`].
    /// Entries whose remaining TTL had already reached zero at snapshot
    /// time are dropped rather than restored expired.
    pub fn from_snapshot(snapshot: CacheSnapshot<K, V>) -> Self
    where
        K: for<'de> Deserialize<'de>,
        V: for<'de> Deserialize<'de>,
    {
        Self {
            inner: PolicyCache::restore_records(snapshot.maxsize, snapshot.capacity, (), snapshot.entries),
        }
    }

    pub fn new(maxsize: usize) -> Self {
        Self {
            inner: PolicyCache::new(maxsize, maxsize, ()),
        }
    }

    pub fn with_capacity(maxsize: usize, capacity: usize) -> Self {
        Self {
            inner: PolicyCache::new(maxsize, capacity, ()),
        }
    }

    /// Inserts `key`, expiring per `ttl` — either a duration from now
    /// ([`Expiry::In`]) or an absolute instant ([`Expiry::At`]). `ttl ==
    /// None` means the entry never expires on its own (only capacity
    /// pressure can evict it). Fails `InvalidTtl` if `ttl` names a
    /// non-positive duration or an instant that has already passed.
    pub fn insert(&self, key: K, value: V, ttl: Option<Expiry>) -> Result<Option<V>> {
        let expires_at = Self::validate_expiry(ttl)?;
        self.inner.insert_with_expiry(key, value, expires_at)
    }

    fn validate_expiry(ttl: Option<Expiry>) -> Result<Option<Instant>> {
        match ttl {
            Some(Expiry::In(d)) if d.is_zero() => Err(CacheError::InvalidTtl),
            Some(Expiry::In(d)) => Ok(Some(Instant::now() + d)),
            Some(Expiry::At(at)) if at <= Instant::now() => Err(CacheError::InvalidTtl),
            Some(Expiry::At(at)) => Ok(Some(at)),
            None => Ok(None),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    /// Looks `key` up, failing `KeyNotFound` instead of returning `None`.
    pub fn get_or_err(&self, key: &K) -> Result<V> {
        self.get(key).ok_or(CacheError::KeyNotFound)
    }

    pub fn get_with_expire(&self, key: &K) -> Option<(V, Option<Duration>)> {
        let (value, expires_at) = self.inner.peek_with_expiry(key)?;
        let remaining = expires_at.map(|at| at.saturating_duration_since(Instant::now()));
        Some((value, remaining))
    }

    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.peek(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    pub fn setdefault(&self, key: K, ttl: Option<Expiry>, make_default: impl FnOnce() -> V) -> Result<V> {
        let expires_at = Self::validate_expiry(ttl)?;
        let mut core = self.inner.inner.lock();
        if let Some(value) = core.get(&key) {
            return Ok(value);
        }
        let value = make_default();
        core.insert(key, value.clone(), expires_at)?;
        Ok(value)
    }

    pub fn popitem(&self) -> Result<(K, V)> {
        self.inner.popitem()
    }

    pub fn drain(&self, n: usize) -> Vec<(K, V)> {
        self.inner.drain(n)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn maxsize(&self) -> usize {
        self.inner.maxsize()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn clear(&self, reuse: bool) {
        self.inner.clear(reuse)
    }

    pub fn shrink_to_fit(&self) {
        self.inner.shrink_to_fit()
    }

    pub fn stats(&self) -> Stats {
        self.inner.stats()
    }

    pub fn iter(&self) -> IteratorView<K, V> {
        self.inner.iter()
    }
}
