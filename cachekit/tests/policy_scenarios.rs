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

//! The concrete scenarios table plus a few cross-policy invariants.

use std::time::Duration;

use cachekit::{Cache, Expiry, FifoCache, LfuCache, LruCache, RrCache, TtlCache, VttlCache};
use cachekit_common::CacheError;

#[test]
fn scenario_fifo_evicts_in_insertion_order() {
    let cache: FifoCache<i32, i32> = FifoCache::new(3);
    for (k, v) in [(0, 0), (1, 1), (2, 2), (3, 3)] {
        cache.insert(k, v).unwrap();
    }
    assert_eq!(cache.get(&0), None);
    assert!(cache.contains(&1) && cache.contains(&2) && cache.contains(&3));
    assert_eq!(cache.popitem().unwrap(), (1, 1));
}

#[test]
fn scenario_lru_keeps_recently_read_key() {
    let cache: LruCache<i32, i32> = LruCache::new(3);
    cache.insert(1, 1).unwrap();
    cache.insert(2, 2).unwrap();
    cache.insert(3, 3).unwrap();
    cache.get(&1);
    cache.insert(4, 4).unwrap();
    assert!(cache.contains(&1));
    assert!(cache.contains(&3));
    assert!(cache.contains(&4));
    assert!(!cache.contains(&2));
}

#[test]
fn scenario_lfu_evicts_lowest_frequency_first() {
    let cache: LfuCache<i32, i32> = LfuCache::new(5);
    for (k, v) in [(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)] {
        cache.insert(k, v).unwrap();
    }
    let reads = [(0, 10), (1, 7), (2, 3), (3, 4), (4, 6)];
    for (k, n) in reads {
        for _ in 0..n {
            cache.get(&k);
        }
    }
    assert_eq!(cache.popitem().unwrap(), (2, 2));
    assert_eq!(cache.popitem().unwrap(), (3, 3));
}

#[test]
fn scenario_ttl_expires_after_the_configured_duration() {
    let cache: TtlCache<i32, i32> = TtlCache::new(2, Duration::from_millis(50)).unwrap();
    cache.insert(0, 1).unwrap();
    std::thread::sleep(Duration::from_millis(120));
    assert_eq!(cache.get(&0), None);
    assert_eq!(cache.get_or_err(&0), Err(CacheError::KeyNotFound));
}

#[test]
fn scenario_vttl_evicts_by_nearest_expiry() {
    let cache: VttlCache<&str, i32> = VttlCache::new(2);
    cache.insert("a", 1, Some(Expiry::In(Duration::from_secs(70)))).unwrap();
    cache.insert("b", 2, Some(Expiry::In(Duration::from_secs(60)))).unwrap();
    cache.insert("c", 3, Some(Expiry::In(Duration::from_secs(90)))).unwrap();
    assert_eq!(cache.get(&"b"), None);
    let (key, _) = cache.popitem().unwrap();
    assert_eq!(key, "a");
}

#[test]
fn scenario_vttl_accepts_an_absolute_expiry_instant() {
    let cache: VttlCache<&str, i32> = VttlCache::new(2);
    let at = std::time::Instant::now() + Duration::from_millis(40);
    cache.insert("a", 1, Some(Expiry::At(at))).unwrap();
    assert_eq!(cache.get(&"a"), Some(1));
    std::thread::sleep(Duration::from_millis(90));
    assert_eq!(cache.get(&"a"), None);
}

#[test]
fn scenario_rr_picks_among_live_keys_only() {
    let cache: RrCache<i32, i32> = RrCache::new(0);
    for k in 0..10 {
        cache.insert(k, k).unwrap();
    }
    for _ in 0..20 {
        let key = cache.random_key().unwrap();
        assert!((0..10).contains(&key));
    }
}

#[test]
fn scenario_plain_cache_rejects_insert_at_capacity() {
    let cache: Cache<i32, i32> = Cache::new(2);
    cache.insert(0, 0).unwrap();
    cache.insert(1, 1).unwrap();
    assert_eq!(cache.insert(2, 2), Err(CacheError::CapacityExceeded));
    assert_eq!(cache.setdefault(2, || 2), Err(CacheError::CapacityExceeded));
}

#[test]
fn update_inserts_every_pair_and_may_trigger_eviction() {
    let cache: FifoCache<i32, i32> = FifoCache::new(2);
    cache.update([(1, 1), (2, 2), (3, 3)]).unwrap();
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&1), None);
    assert_eq!(cache.get(&3), Some(3));
}

#[test]
fn drain_against_a_partially_full_cache_stops_early() {
    let cache: LruCache<i32, i32> = LruCache::new(10);
    cache.insert(1, 1).unwrap();
    cache.insert(2, 2).unwrap();
    let drained = cache.drain(5);
    assert_eq!(drained.len(), 2);
    assert!(cache.is_empty());
}

#[test]
fn ttl_rejects_non_positive_duration() {
    assert_eq!(
        TtlCache::<i32, i32>::new(1, Duration::ZERO).unwrap_err(),
        CacheError::InvalidTtl
    );
}

#[test]
fn vttl_rejects_non_positive_duration() {
    let cache: VttlCache<i32, i32> = VttlCache::new(1);
    assert_eq!(
        cache.insert(1, 1, Some(Expiry::In(Duration::ZERO))),
        Err(CacheError::InvalidTtl)
    );
}

#[test]
fn vttl_rejects_an_absolute_instant_already_in_the_past() {
    let cache: VttlCache<i32, i32> = VttlCache::new(1);
    let already_past = std::time::Instant::now() - Duration::from_secs(1);
    assert_eq!(
        cache.insert(1, 1, Some(Expiry::At(already_past))),
        Err(CacheError::InvalidTtl)
    );
}

#[test]
fn fifo_first_and_last_take_an_ordinal_with_negative_wraparound() {
    let cache: FifoCache<i32, i32> = FifoCache::new(5);
    for (k, v) in [(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)] {
        cache.insert(k, v).unwrap();
    }
    let by_first: Vec<i32> = (0..5).map(|i| cache.first(i).unwrap()).collect();
    assert_eq!(by_first, vec![0, 1, 2, 3, 4]);
    assert_eq!(cache.first(-1), Some(4));
    assert_eq!(cache.first(5), None);

    let by_last: Vec<i32> = (0..5).map(|i| cache.last(i).unwrap()).collect();
    assert_eq!(by_last, vec![4, 3, 2, 1, 0]);
    assert_eq!(cache.last(-1), Some(0));
    assert_eq!(cache.last(5), None);
}

#[test]
fn ttl_first_and_last_mirror_fifos_ordinal_access() {
    let cache: TtlCache<i32, i32> = TtlCache::new(3, Duration::from_secs(60)).unwrap();
    cache.insert(0, 0).unwrap();
    cache.insert(1, 1).unwrap();
    cache.insert(2, 2).unwrap();
    assert_eq!(cache.first(0), Some(0));
    assert_eq!(cache.first(-1), Some(2));
    assert_eq!(cache.last(0), Some(2));
    assert_eq!(cache.last(-1), Some(0));
}

#[test]
fn plain_popitem_and_drain_work_against_a_non_empty_cache() {
    let cache: Cache<i32, i32> = Cache::new(3);
    cache.insert(0, 0).unwrap();
    cache.insert(1, 1).unwrap();
    cache.insert(2, 2).unwrap();

    let (key, value) = cache.popitem().unwrap();
    assert_eq!(value, key);
    assert_eq!(cache.len(), 2);

    let drained = cache.drain(10);
    assert_eq!(drained.len(), 2);
    assert!(cache.is_empty());
}

#[test]
fn plain_popitem_against_an_empty_cache_fails_empty() {
    let cache: Cache<i32, i32> = Cache::new(3);
    assert_eq!(cache.popitem(), Err(CacheError::Empty));
}
