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

//! The slot stored per live entry in [`RawCore`](crate::core::RawCore)'s
//! slab.

use std::time::Instant;

/// One live cache entry plus the policy-agnostic metadata every policy
/// needs a slice of.
///
/// Policy-specific bookkeeping (recency links, frequency, heap position)
/// lives in the corresponding [`Eviction`](crate::eviction::Eviction)
/// implementation, keyed by this slot's slab index, not in `Slot` itself.
pub(crate) struct Slot<K, V> {
    pub key: K,
    pub value: V,
    pub hash: u64,
    pub insertion_seq: u64,
    pub expires_at: Option<Instant>,
}

impl<K, V> Slot<K, V> {
    pub fn new(key: K, value: V, hash: u64, insertion_seq: u64, expires_at: Option<Instant>) -> Self {
        Self {
            key,
            value,
            hash,
            insertion_seq,
            expires_at,
        }
    }
}
