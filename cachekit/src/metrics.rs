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

//! Lock-free counters a [`RawCore`](crate::core::RawCore) updates as it
//! works, exposed read-only through each facade's `stats()`.

use std::sync::atomic::{AtomicU64, Ordering};

/// A snapshot-friendly set of cache counters.
///
/// Fields are individually atomic so `RawCore` can bump them without
/// widening the critical section any caller already holds; a snapshot
/// taken mid-update can therefore observe counters that are momentarily
/// inconsistent with each other (e.g. `hits` incremented but `inserts`
/// not yet), which is fine for the advisory purpose these serve.
#[derive(Debug, Default)]
pub struct Metrics {
    pub(crate) hits: AtomicU64,
    pub(crate) misses: AtomicU64,
    pub(crate) inserts: AtomicU64,
    pub(crate) replaces: AtomicU64,
    pub(crate) removes: AtomicU64,
    pub(crate) evictions: AtomicU64,
    pub(crate) expirations: AtomicU64,
}

/// A point-in-time copy of a cache's [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub replaces: u64,
    pub removes: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl Metrics {
    pub(crate) fn snapshot(&self) -> Stats {
        Stats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            replaces: self.replaces.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}
