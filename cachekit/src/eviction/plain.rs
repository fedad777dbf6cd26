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

//! The policy-less `Cache`: a bare hash map with no eviction order at
//! all. A full, bounded `Plain` cache rejects inserts with
//! `CapacityExceeded` instead of making room. `pop`/`peek` still need to
//! answer `popitem`/`drain`, so they hand back an arbitrary live entry
//! rather than `None`; with no ordering to maintain, "arbitrary" is
//! whatever `AHashSet` iterates to first.

use std::time::Instant;

use ahash::AHashSet;

use super::Eviction;

/// No side index: just enough bookkeeping to answer `len`/`order`.
#[derive(Default)]
pub struct Plain {
    live: AHashSet<usize>,
}

impl Eviction for Plain {
    type Config = ();
    const EVICTS: bool = false;

    fn new(_config: Self::Config) -> Self {
        Self::default()
    }

    fn push(&mut self, idx: usize, _seq: u64, _expires_at: Option<Instant>) {
        self.live.insert(idx);
    }

    fn access(&mut self, _idx: usize) {}

    fn remove(&mut self, idx: usize) {
        self.live.remove(&idx);
    }

    fn pop(&mut self) -> Option<usize> {
        let idx = self.peek()?;
        self.live.remove(&idx);
        Some(idx)
    }

    fn peek(&mut self) -> Option<usize> {
        self.live.iter().next().copied()
    }

    fn clear(&mut self) {
        self.live.clear();
    }

    fn len(&self) -> usize {
        self.live.len()
    }

    fn order(&self) -> Vec<usize> {
        self.live.iter().copied().collect()
    }
}
