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

//! The error taxonomy shared by every cache policy.

use thiserror::Error;

/// Errors surfaced by cachekit's public API.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    /// Subscript-style access to a missing (or expired) key.
    #[error("key not found")]
    KeyNotFound,

    /// `popitem`/`drain` called against a cache with nothing to remove.
    #[error("cache is empty")]
    Empty,

    /// `insert`/`setdefault` on a full, policy-less `Cache` with the key
    /// absent. Policy-bearing caches evict instead of raising this.
    #[error("cache is at capacity")]
    CapacityExceeded,

    /// A TTL/VTTL duration or absolute expiry was non-positive or
    /// non-finite.
    #[error("ttl must be finite and strictly positive")]
    InvalidTtl,

    /// An `IteratorView` observed the cache's generation counter change
    /// since it was created.
    #[error("iterator observed a concurrent modification")]
    ConcurrentModification,
}

/// Convenience alias for cachekit's `Result` type.
pub type Result<T> = std::result::Result<T, CacheError>;
