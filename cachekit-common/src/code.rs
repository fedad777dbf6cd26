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

//! Capability traits describing what a type must provide to be stored in a
//! cache.

use std::hash::Hash;

/// A type usable as a cache key.
///
/// The cache never inspects a key beyond hashing and equality. The hash and
/// equality of a given key must stay stable for as long as the entry it
/// identifies lives in the cache.
pub trait Key: Hash + Eq + Clone + Send + Sync + 'static {}

impl<T> Key for T where T: Hash + Eq + Clone + Send + Sync + 'static {}

/// A type usable as a cache value.
///
/// Values are opaque payloads to the cache. `Clone` is required because a
/// read returns an owned copy to the caller while the stored copy stays
/// behind the cache's lock; this mirrors the bound widely used by other
/// in-process concurrent caches in the Rust ecosystem.
pub trait Value: Clone + Send + Sync + 'static {}

impl<T> Value for T where T: Clone + Send + Sync + 'static {}
