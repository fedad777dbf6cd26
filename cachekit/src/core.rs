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

//! `RawCore` is the single-mutex-guarded heart shared by every cache
//! facade in [`crate::cache`]: a slab of entries, a hash index from key to
//! slab index, and a policy-specific [`Eviction`] side index, advanced
//! together under one lock.
//!
//! Every public facade wraps a `Mutex<RawCore<K, V, E>>` and never exposes
//! `RawCore` itself; this module has no lock of its own; it is the thing
//! the lock protects.

use std::hash::BuildHasher;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;
use std::time::Instant;

use ahash::RandomState;
use hashbrown::HashMap;

use cachekit_common::{CacheError, Clock, Key, Result, SystemClock, Value};

use crate::entry::Slot;
use crate::eviction::Eviction;
use crate::metrics::{Metrics, Stats};

/// The policy-agnostic cache core: slab + free list + hash index + a
/// policy's [`Eviction`] side index, all advanced under whatever lock the
/// owning facade holds.
pub(crate) struct RawCore<K, V, E> {
    slab: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    index: HashMap<K, usize, RandomState>,
    eviction: E,
    hash_builder: RandomState,
    maxsize: usize,
    len: usize,
    next_seq: u64,
    generation: u64,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl<K, V, E> RawCore<K, V, E>
where
    K: Key,
    V: Value,
    E: Eviction,
{
    /// Builds an empty core backed by the real monotonic clock.
    pub(crate) fn new(maxsize: usize, capacity: usize, config: E::Config) -> Self {
        Self::with_clock(maxsize, capacity, config, Arc::new(SystemClock))
    }

    /// Builds an empty core backed by an injected clock, for deterministic
    /// TTL/VTTL tests.
    pub(crate) fn with_clock(
        maxsize: usize,
        capacity: usize,
        config: E::Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            slab: Vec::with_capacity(capacity),
            free: Vec::new(),
            index: HashMap::with_capacity_and_hasher(capacity, RandomState::default()),
            eviction: E::new(config),
            hash_builder: RandomState::default(),
            maxsize,
            len: 0,
            next_seq: 0,
            generation: 0,
            clock,
            metrics: Metrics::default(),
        }
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn stats(&self) -> Stats {
        self.metrics.snapshot()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn maxsize(&self) -> usize {
        self.maxsize
    }

    pub(crate) fn is_full(&self) -> bool {
        self.maxsize > 0 && self.len >= self.maxsize
    }

    pub(crate) fn capacity(&self) -> usize {
        self.index.capacity()
    }

    /// Reserves index capacity ahead of a bulk load.
    pub(crate) fn reserve(&mut self, additional: usize) {
        self.index.reserve(additional);
        self.slab.reserve(additional);
    }

    /// Releases excess capacity held by the hash index. The slab and its
    /// free list are left alone: they are reused on the next insert
    /// regardless, and compacting them would require renumbering every
    /// live slab index that policies and the index hold onto.
    pub(crate) fn shrink_to_fit(&mut self) {
        self.index.shrink_to_fit();
    }

    fn hash_of(&self, key: &K) -> u64 {
        self.hash_builder.hash_one(key)
    }

    /// Sweeps entries off the front of the policy's expiry order while
    /// they are due. Correct for every policy uniformly: non-expiring
    /// entries carry `expires_at = None` and the loop breaks on the first
    /// peek. Uniform TTL reuses FIFO order, where insertion order and
    /// expiry order coincide, so the queue head is always next-to-expire;
    /// VTTL's heap already orders by absolute expiry directly.
    pub(crate) fn expire(&mut self, now: Instant) -> usize {
        let mut swept = 0;
        loop {
            let Some(idx) = self.eviction.peek() else {
                break;
            };
            let due = match &self.slab[idx] {
                Some(slot) => slot.expires_at.is_some_and(|at| at <= now),
                None => false,
            };
            if !due {
                break;
            }
            let victim = self.eviction.pop().expect("peek promised a victim");
            debug_assert_eq!(victim, idx);
            self.detach_slot(idx);
            self.generation = self.generation.wrapping_add(1);
            self.metrics.expirations.fetch_add(1, Relaxed);
            swept += 1;
        }
        swept
    }

    /// Removes a slab entry that the policy has already unlinked (e.g. via
    /// `eviction.pop()`), or is about to be unlinked by the caller.
    fn detach_slot(&mut self, idx: usize) -> Slot<K, V> {
        let slot = self.slab[idx].take().expect("slab slot already vacated");
        self.index.remove(&slot.key);
        self.free.push(idx);
        self.len -= 1;
        slot
    }

    /// Fully removes `idx`: unlinks it from the policy, then the slab and
    /// index.
    fn remove_idx(&mut self, idx: usize) -> Slot<K, V> {
        self.eviction.remove(idx);
        self.detach_slot(idx)
    }

    fn alloc_slot(&mut self, slot: Slot<K, V>) -> usize {
        if let Some(idx) = self.free.pop() {
            self.slab[idx] = Some(slot);
            idx
        } else {
            self.slab.push(Some(slot));
            self.slab.len() - 1
        }
    }

    /// Inserts or replaces `key`, returning the previous value if the key
    /// was already present.
    ///
    /// A value replacement never touches the policy's order: it only
    /// swaps the stored value (and, if `expires_at` is involved, restamps
    /// the expiry through [`Eviction::reschedule`]). A brand new key
    /// evicts to make room when the cache is at capacity and the policy
    /// supports eviction, or fails with [`CacheError::CapacityExceeded`]
    /// when it doesn't (the policy-less `Cache`).
    pub(crate) fn insert(
        &mut self,
        key: K,
        value: V,
        expires_at: Option<Instant>,
    ) -> Result<Option<V>> {
        let now = self.clock.now();
        self.expire(now);

        if let Some(&idx) = self.index.get(&key) {
            let slot = self.slab[idx].as_mut().expect("indexed slot must exist");
            let old = std::mem::replace(&mut slot.value, value);
            if expires_at.is_some() || slot.expires_at.is_some() {
                slot.expires_at = expires_at;
                let seq = slot.insertion_seq;
                self.eviction.reschedule(idx, seq, expires_at);
            }
            self.metrics.replaces.fetch_add(1, Relaxed);
            tracing::trace!(generation = self.generation, "replaced existing key");
            return Ok(Some(old));
        }

        if self.is_full() {
            if E::EVICTS {
                let victim = self
                    .eviction
                    .pop()
                    .expect("policy with EVICTS must offer a victim at capacity");
                self.detach_slot(victim);
                self.metrics.evictions.fetch_add(1, Relaxed);
                tracing::debug!(generation = self.generation, "evicted for capacity");
            } else {
                return Err(CacheError::CapacityExceeded);
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let hash = self.hash_of(&key);
        let idx = self.alloc_slot(Slot::new(key.clone(), value, hash, seq, expires_at));
        self.index.insert(key, idx);
        self.eviction.push(idx, seq, expires_at);
        self.len += 1;
        self.generation = self.generation.wrapping_add(1);
        self.metrics.inserts.fetch_add(1, Relaxed);
        Ok(None)
    }

    /// Looks a key up without recording an access. Expired entries are
    /// evicted lazily and reported absent, even if `expire()` hasn't swept
    /// them off the front of the policy's order yet.
    pub(crate) fn peek(&mut self, key: &K) -> Option<V> {
        let now = self.clock.now();
        self.expire(now);
        let idx = *self.index.get(key)?;
        if self.slot_expired(idx, now) {
            self.remove_idx(idx);
            self.metrics.misses.fetch_add(1, Relaxed);
            return None;
        }
        self.metrics.hits.fetch_add(1, Relaxed);
        self.slab[idx].as_ref().map(|slot| slot.value.clone())
    }

    /// Looks a key up and records an access against the policy (LRU
    /// recency bump, LFU frequency increment; a no-op for order-insensitive
    /// policies).
    pub(crate) fn get(&mut self, key: &K) -> Option<V> {
        let now = self.clock.now();
        self.expire(now);
        let idx = *self.index.get(key)?;
        if self.slot_expired(idx, now) {
            self.remove_idx(idx);
            self.metrics.misses.fetch_add(1, Relaxed);
            return None;
        }
        self.eviction.access(idx);
        self.metrics.hits.fetch_add(1, Relaxed);
        self.slab[idx].as_ref().map(|slot| slot.value.clone())
    }

    /// Returns the remaining time-to-live for `key`, alongside its value,
    /// without recording an access. Only meaningful for TTL/VTTL facades;
    /// other policies always see `None` here.
    pub(crate) fn peek_with_expiry(&mut self, key: &K) -> Option<(V, Option<Instant>)> {
        let now = self.clock.now();
        self.expire(now);
        let idx = *self.index.get(key)?;
        if self.slot_expired(idx, now) {
            self.remove_idx(idx);
            return None;
        }
        let slot = self.slab[idx].as_ref().expect("indexed slot must exist");
        Some((slot.value.clone(), slot.expires_at))
    }

    fn slot_expired(&self, idx: usize, now: Instant) -> bool {
        match &self.slab[idx] {
            Some(slot) => slot.expires_at.is_some_and(|at| at <= now),
            None => false,
        }
    }

    /// Reports whether `key` is live, dropping it lazily if it has expired.
    pub(crate) fn contains(&mut self, key: &K) -> bool {
        let now = self.clock.now();
        self.expire(now);
        let Some(&idx) = self.index.get(key) else {
            return false;
        };
        if self.slot_expired(idx, now) {
            self.remove_idx(idx);
            return false;
        }
        true
    }

    /// Removes `key` unconditionally, returning its value unless it was
    /// already absent or expired.
    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        let now = self.clock.now();
        self.expire(now);
        let idx = *self.index.get(key)?;
        let expired = self.slot_expired(idx, now);
        let slot = self.remove_idx(idx);
        self.generation = self.generation.wrapping_add(1);
        self.metrics.removes.fetch_add(1, Relaxed);
        if expired {
            None
        } else {
            Some(slot.value)
        }
    }

    /// Removes and returns the policy's next eviction victim.
    pub(crate) fn popitem(&mut self) -> Result<(K, V)> {
        let now = self.clock.now();
        self.expire(now);
        let idx = self.eviction.pop().ok_or(CacheError::Empty)?;
        let slot = self.detach_slot(idx);
        self.generation = self.generation.wrapping_add(1);
        self.metrics.removes.fetch_add(1, Relaxed);
        Ok((slot.key, slot.value))
    }

    /// Returns the policy's next eviction victim and its remaining TTL
    /// without removing it.
    pub(crate) fn peekitem_with_expiry(&mut self) -> Result<(K, V, Option<Instant>)> {
        let now = self.clock.now();
        self.expire(now);
        let idx = self.eviction.peek().ok_or(CacheError::Empty)?;
        let slot = self.slab[idx].as_ref().expect("indexed slot must exist");
        Ok((slot.key.clone(), slot.value.clone(), slot.expires_at))
    }

    /// Pops up to `n` entries, stopping early once the cache is empty.
    /// Returns the entries actually removed.
    pub(crate) fn drain(&mut self, n: usize) -> Vec<(K, V)> {
        let mut out = Vec::with_capacity(n.min(self.len));
        for _ in 0..n {
            match self.popitem() {
                Ok(kv) => out.push(kv),
                Err(_) => break,
            }
        }
        out
    }

    /// Drops every entry. When `reuse` is `false`, the slab, free list and
    /// index release their backing allocations instead of only clearing
    /// their contents.
    pub(crate) fn clear(&mut self, reuse: bool) {
        self.eviction.clear();
        if reuse {
            self.slab.clear();
            self.free.clear();
            self.index.clear();
        } else {
            self.slab = Vec::new();
            self.free = Vec::new();
            self.index = HashMap::with_hasher(RandomState::default());
        }
        self.len = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Resolves a slab index the policy handed back (e.g. from
    /// `most_recently_used`/`random_key`-style helpers) to its live entry.
    pub(crate) fn entry_at(&self, idx: usize) -> Option<(&K, &V)> {
        self.slab[idx].as_ref().map(|slot| (&slot.key, &slot.value))
    }

    /// The slab index `key` currently occupies, without recording an
    /// access or evicting anything expired. Used by diagnostic,
    /// non-hot-path lookups (e.g. `LfuCache::frequency`).
    pub(crate) fn index_of(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub(crate) fn eviction(&self) -> &E {
        &self.eviction
    }

    pub(crate) fn eviction_mut(&mut self) -> &mut E {
        &mut self.eviction
    }

    /// A snapshot of `(key, value)` pairs in the policy's natural
    /// iteration order, for [`crate::iter::IteratorView`].
    pub(crate) fn snapshot(&self) -> Vec<(K, V)> {
        self.eviction
            .order()
            .into_iter()
            .filter_map(|idx| {
                self.slab[idx]
                    .as_ref()
                    .map(|slot| (slot.key.clone(), slot.value.clone()))
            })
            .collect()
    }

    /// Every live entry in the policy's natural order, with the metadata
    /// [`crate::codec`] needs to round-trip a cache through serde.
    pub(crate) fn export(&self) -> Vec<ExportedEntry<K, V>> {
        self.eviction
            .order()
            .into_iter()
            .filter_map(|idx| {
                self.slab[idx].as_ref().map(|slot| ExportedEntry {
                    key: slot.key.clone(),
                    value: slot.value.clone(),
                    insertion_seq: slot.insertion_seq,
                    expires_at: slot.expires_at,
                })
            })
            .collect()
    }

    /// Rebuilds entries from a prior [`RawCore::export`], in order, onto
    /// an otherwise-empty core. Entries already expired relative to `now`
    /// are dropped rather than reinserted.
    pub(crate) fn import(&mut self, entries: Vec<ExportedEntry<K, V>>, now: Instant) {
        for entry in entries {
            if entry.expires_at.is_some_and(|at| at <= now) {
                continue;
            }
            let _ = self.insert(entry.key, entry.value, entry.expires_at);
        }
    }
}

/// One live entry as handed to/from [`crate::codec`].
pub(crate) struct ExportedEntry<K, V> {
    pub key: K,
    pub value: V,
    pub insertion_seq: u64,
    pub expires_at: Option<Instant>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::fifo::Fifo;
    use crate::eviction::lru::Lru;
    use cachekit_common::ManualClock;
    use std::time::Duration;

    fn core_with_clock<E: Eviction>(
        maxsize: usize,
        clock: Arc<ManualClock>,
    ) -> RawCore<&'static str, i32, E> {
        RawCore::with_clock(maxsize, 0, E::Config::default(), clock as Arc<dyn Clock>)
    }

    #[test]
    fn insert_then_get_round_trips() {
        let mut core: RawCore<&str, i32, Fifo> = RawCore::new(0, 0, ());
        assert_eq!(core.insert("a", 1, None).unwrap(), None);
        assert_eq!(core.get(&"a"), Some(1));
        assert_eq!(core.len(), 1);
    }

    #[test]
    fn replace_does_not_bump_generation_ordering() {
        let mut core: RawCore<&str, i32, Fifo> = RawCore::new(0, 0, ());
        core.insert("a", 1, None).unwrap();
        core.insert("b", 2, None).unwrap();
        let old = core.insert("a", 10, None).unwrap();
        assert_eq!(old, Some(1));
        assert_eq!(core.snapshot(), vec![("a", 10), ("b", 2)]);
    }

    #[test]
    fn capacity_triggers_eviction_for_fifo() {
        let mut core: RawCore<&str, i32, Fifo> = RawCore::new(2, 0, ());
        core.insert("a", 1, None).unwrap();
        core.insert("b", 2, None).unwrap();
        core.insert("c", 3, None).unwrap();
        assert_eq!(core.len(), 2);
        assert_eq!(core.get(&"a"), None);
        assert_eq!(core.get(&"c"), Some(3));
    }

    #[test]
    fn plain_policy_rejects_inserts_at_capacity() {
        use crate::eviction::plain::Plain;
        let mut core: RawCore<&str, i32, Plain> = RawCore::new(1, 0, ());
        core.insert("a", 1, None).unwrap();
        let err = core.insert("b", 2, None).unwrap_err();
        assert_eq!(err, CacheError::CapacityExceeded);
    }

    #[test]
    fn expired_entry_is_lazily_evicted_on_get() {
        let clock = Arc::new(ManualClock::new());
        let mut core = core_with_clock::<Fifo>(0, clock.clone());
        let now = clock.now();
        core.insert("a", 1, Some(now + Duration::from_secs(1))).unwrap();
        clock.advance(Duration::from_secs(2));
        assert_eq!(core.get(&"a"), None);
        assert_eq!(core.len(), 0);
    }

    #[test]
    fn lru_access_reorders_snapshot() {
        let mut core: RawCore<&str, i32, Lru> = RawCore::new(0, 0, ());
        core.insert("a", 1, None).unwrap();
        core.insert("b", 2, None).unwrap();
        core.get(&"a");
        assert_eq!(core.snapshot(), vec![("a", 1), ("b", 2)]);
    }

    #[test]
    fn popitem_on_empty_core_errors() {
        let mut core: RawCore<&str, i32, Fifo> = RawCore::new(0, 0, ());
        assert_eq!(core.popitem().unwrap_err(), CacheError::Empty);
    }

    #[test]
    fn drain_stops_early_when_exhausted() {
        let mut core: RawCore<&str, i32, Fifo> = RawCore::new(0, 0, ());
        core.insert("a", 1, None).unwrap();
        core.insert("b", 2, None).unwrap();
        let drained = core.drain(5);
        assert_eq!(drained, vec![("a", 1), ("b", 2)]);
        assert!(core.is_empty());
    }

    #[test]
    fn clear_without_reuse_releases_allocations() {
        let mut core: RawCore<&str, i32, Fifo> = RawCore::new(0, 0, ());
        core.insert("a", 1, None).unwrap();
        core.clear(false);
        assert!(core.is_empty());
        assert_eq!(core.capacity(), 0);
    }
}
