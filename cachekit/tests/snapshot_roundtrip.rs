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

//! `to_snapshot`/`from_snapshot` round-trips through a concrete wire
//! format (`serde_json`, a dev-dependency only), per the serialization
//! contract in `spec.md` §6.

use std::time::Duration;

use cachekit::{FifoCache, LruCache, TtlCache};

#[test]
fn fifo_snapshot_round_trips_through_json_preserving_order() {
    let cache: FifoCache<i32, String> = FifoCache::new(0);
    cache.insert(1, "one".to_string()).unwrap();
    cache.insert(2, "two".to_string()).unwrap();
    cache.insert(3, "three".to_string()).unwrap();

    let snapshot = cache.to_snapshot();
    let json = serde_json::to_string(&snapshot).unwrap();
    let restored_snapshot = serde_json::from_str(&json).unwrap();
    let restored: FifoCache<i32, String> = FifoCache::from_snapshot(restored_snapshot);

    assert_eq!(restored.len(), 3);
    assert_eq!(restored.first(0), Some(1));
    assert_eq!(restored.last(0), Some(3));
    assert_eq!(restored.get(&2), Some("two".to_string()));
}

#[test]
fn lru_snapshot_round_trips_entries() {
    let cache: LruCache<&str, i32> = LruCache::new(0);
    cache.insert("a", 1).unwrap();
    cache.insert("b", 2).unwrap();

    let snapshot = cache.to_snapshot();
    let restored: LruCache<&str, i32> = LruCache::from_snapshot(snapshot);

    assert_eq!(restored.get(&"a"), Some(1));
    assert_eq!(restored.get(&"b"), Some(2));
}

#[test]
fn ttl_snapshot_drops_entries_already_expired_at_restore_time() {
    let cache: TtlCache<&str, i32> = TtlCache::new(0, Duration::from_millis(30)).unwrap();
    cache.insert("soon-to-expire", 1).unwrap();

    std::thread::sleep(Duration::from_millis(80));
    let snapshot = cache.to_snapshot();
    let restored: TtlCache<&str, i32> =
        TtlCache::from_snapshot(snapshot, Duration::from_secs(1));

    // The entry's remaining TTL had already reached zero by snapshot time,
    // so it is dropped instead of being restored as dead weight.
    assert_eq!(restored.get(&"soon-to-expire"), None);
    assert_eq!(restored.len(), 0);
}

#[test]
fn ttl_snapshot_preserves_the_shared_ttl() {
    let cache: TtlCache<&str, i32> = TtlCache::new(0, Duration::from_secs(5)).unwrap();
    cache.insert("a", 1).unwrap();

    let snapshot = cache.to_snapshot();
    let restored: TtlCache<&str, i32> =
        TtlCache::from_snapshot(snapshot, Duration::from_secs(99));

    assert_eq!(restored.ttl(), Duration::from_secs(5));
    assert_eq!(restored.get(&"a"), Some(1));
}
