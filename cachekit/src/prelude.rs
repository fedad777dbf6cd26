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

//! Glob-importable re-export of cachekit's everyday surface.
//!
//! ```
//! use cachekit::prelude::*;
//! ```

pub use crate::cache::{Cache, Expiry, FifoCache, LfuCache, LruCache, RrCache, TtlCache, VttlCache};
pub use crate::codec::{CacheSnapshot, EntryRecord, PolicyTag};
pub use crate::iter::IteratorView;
pub use crate::memoize::{CacheInfo, MemoCache, Memoizer};
pub use crate::metrics::Stats;
pub use cachekit_common::{CacheError, Result};

#[cfg(feature = "async")]
pub use crate::memoize_async::AsyncMemoizer;
