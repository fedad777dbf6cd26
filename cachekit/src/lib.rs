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

//! cachekit: a multi-policy, thread-safe, in-process key-value cache.
//!
//! Every cache type in [`cache`] ([`Cache`](cache::Cache),
//! [`FifoCache`](cache::FifoCache), [`RrCache`](cache::RrCache),
//! [`LruCache`](cache::LruCache), [`LfuCache`](cache::LfuCache),
//! [`TtlCache`](cache::TtlCache), [`VttlCache`](cache::VttlCache)) is a
//! cheaply-`Clone`able handle around one [`parking_lot::Mutex`]-guarded
//! core; cloning a handle shares the underlying cache rather than copying
//! it. Pick the type that matches the eviction behavior you need; all
//! seven share the same insert/get/remove/iterate vocabulary.
//!
//! [`memoize`] builds single-flight memoizing wrappers on top of any of
//! these cache types, coalescing concurrent callers computing the same
//! key onto one execution.

pub mod cache;
pub(crate) mod core;
pub(crate) mod entry;
pub mod eviction;
pub mod iter;
pub mod memoize;
pub(crate) mod metrics;

#[cfg(feature = "async")]
pub mod memoize_async;

pub mod codec;

pub mod prelude;

pub use cachekit_common::{CacheError, Result};
pub use cache::{Cache, Expiry, FifoCache, LfuCache, LruCache, RrCache, TtlCache, VttlCache};
pub use metrics::Stats;
