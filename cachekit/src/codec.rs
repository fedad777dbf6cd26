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

//! Serde-backed snapshots of a cache's contents.
//!
//! `cachekit` derives `Serialize`/`Deserialize` for [`CacheSnapshot`] but
//! picks no wire format of its own; pass it to whichever `serde` format
//! your application already depends on (`serde_json`, `bincode`, ...).
//!
//! `std::time::Instant` has no serde impl and wouldn't be meaningful
//! across a process boundary even if it did, so entries carry
//! `expires_in_millis`, the TTL remaining *as of the moment the snapshot
//! was taken*, rather than an absolute instant. Restoring a snapshot
//! re-stamps each entry's expiry as `now + expires_in_millis`; entries
//! whose remaining TTL had already reached zero are dropped instead of
//! being restored as immediately-expired dead weight.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use cachekit_common::{Key, Value};

use crate::core::ExportedEntry;

/// Identifies which eviction policy a [`CacheSnapshot`] was taken from,
/// so a caller can sanity-check it against the cache type they're
/// restoring into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyTag {
    Plain,
    Fifo,
    Rr,
    Lru,
    Lfu,
    Ttl,
    Vttl,
}

/// One exported entry, in the owning policy's natural iteration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord<K, V> {
    pub key: K,
    pub value: V,
    /// Milliseconds remaining before this entry expires on its own, as of
    /// when the snapshot was taken. `None` for entries with no expiry.
    pub expires_in_millis: Option<u64>,
}

/// A complete, serde-serializable snapshot of one cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot<K, V> {
    pub policy: PolicyTag,
    pub maxsize: usize,
    pub capacity: usize,
    /// The shared per-entry TTL, for [`PolicyTag::Ttl`] snapshots only.
    /// Every other policy leaves this `None`.
    pub ttl_millis: Option<u64>,
    pub entries: Vec<EntryRecord<K, V>>,
}

pub(crate) fn export_to_records<K, V>(entries: Vec<ExportedEntry<K, V>>, now: Instant) -> Vec<EntryRecord<K, V>> {
    entries
        .into_iter()
        .map(|e| EntryRecord {
            key: e.key,
            value: e.value,
            expires_in_millis: e
                .expires_at
                .map(|at| at.saturating_duration_since(now).as_millis() as u64),
        })
        .collect()
}

pub(crate) fn records_to_import<K, V>(records: Vec<EntryRecord<K, V>>, now: Instant) -> Vec<ExportedEntry<K, V>>
where
    K: Key,
    V: Value,
{
    records
        .into_iter()
        .enumerate()
        .map(|(seq, r)| ExportedEntry {
            key: r.key,
            value: r.value,
            insertion_seq: seq as u64,
            expires_at: r.expires_in_millis.map(|ms| now + Duration::from_millis(ms)),
        })
        .collect()
}
