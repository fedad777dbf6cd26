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

//! The per-policy side structures that decide *which* entry leaves the
//! cache when capacity is exhausted or time has passed.
//!
//! [`RawCore`](crate::core::RawCore) owns the hash index and drives every
//! policy through the single [`Eviction`] trait below, so the policies
//! themselves stay free of hashing, locking or slot-allocation concerns.

pub mod fifo;
pub mod lfu;
pub mod lru;
pub mod plain;
pub mod rr;
pub mod vttl;

use std::time::Instant;

/// A policy's side index over the cache's slab.
///
/// Every method is keyed by `idx`, the stable slab index `RawCore` assigns
/// an entry at insertion and never changes until the entry is removed.
/// Implementations must not interpret `idx` as anything but an opaque
/// handle.
pub trait Eviction: Send + Sync + 'static {
    /// Construction-time configuration (e.g. high/low watermarks).
    type Config: Clone + Default + Send + Sync + 'static;

    /// Whether this policy ever produces an eviction victim. `false` only
    /// for the policy-less [`Plain`](plain::Plain) cache, which rejects
    /// inserts instead of evicting.
    const EVICTS: bool = true;

    /// Builds an empty side index.
    fn new(config: Self::Config) -> Self;

    /// Links a freshly inserted entry into the policy's order.
    ///
    /// `seq` is the entry's insertion sequence number and `expires_at` its
    /// absolute expiry, if any; both are provided unconditionally so that
    /// order-sensitive policies (FIFO, LFU tie-breaks) and expiry-aware
    /// policies (VTTL) can be expressed through the same trait without
    /// special-casing callers.
    fn push(&mut self, idx: usize, seq: u64, expires_at: Option<Instant>);

    /// Records a cache hit against `idx` (e.g. LRU recency refresh, LFU
    /// frequency increment). A no-op for order-insensitive policies.
    fn access(&mut self, idx: usize);

    /// Unlinks `idx` from the policy's order ahead of an explicit removal.
    fn remove(&mut self, idx: usize);

    /// Removes and returns the next eviction victim, if any.
    fn pop(&mut self) -> Option<usize>;

    /// Returns the next eviction victim without removing it. Policies with
    /// lazily tombstoned structures (VTTL) may use this to prune stale
    /// entries, hence `&mut self`.
    fn peek(&mut self) -> Option<usize>;

    /// Re-links `idx` after its expiry changes (e.g. a value replacement
    /// that supplied a new TTL). The default is a plain remove-then-push,
    /// which moves `idx` to the back of order-based policies;
    /// [`Vttl`](vttl::Vttl) overrides this with a true decrease-key so the
    /// heap needn't be rebuilt from scratch.
    fn reschedule(&mut self, idx: usize, seq: u64, expires_at: Option<Instant>) {
        self.remove(idx);
        self.push(idx, seq, expires_at);
    }

    /// Drops all policy state.
    fn clear(&mut self);

    /// Number of entries currently tracked by the policy.
    fn len(&self) -> usize;

    /// Whether the policy currently tracks no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of live indices in the policy's natural iteration order.
    fn order(&self) -> Vec<usize>;
}
