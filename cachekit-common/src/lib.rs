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

//! Components shared by every cachekit crate: the `Key`/`Value` capability
//! traits, the error taxonomy, the monotonic clock seam and the
//! arena-backed doubly linked list used by several eviction policies.

pub mod clock;
pub mod code;
pub mod error;
pub mod linked_slab;

pub use clock::{Clock, ManualClock, SystemClock};
pub use code::{Key, Value};
pub use error::{CacheError, Result};
pub use linked_slab::{LinkedSlab, Token};
