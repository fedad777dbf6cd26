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

//! Single-flight coalescing under real thread concurrency, grounded in
//! the concrete scenario table's memoizer row and
//! `original_source/tests/test_cached.py`'s intent (one execution per
//! key regardless of how many callers race for it).

use std::sync::atomic::{AtomicU32, Ordering::Relaxed};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use cachekit::cache::LruCache;
use cachekit::memoize::Memoizer;

#[test]
fn ten_concurrent_callers_share_one_execution() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_inner = calls.clone();
    let barrier = Arc::new(Barrier::new(10));
    let memo = Arc::new(Memoizer::new(LruCache::new(0), move |_: &&str| {
        calls_inner.fetch_add(1, Relaxed);
        thread::sleep(Duration::from_millis(200));
        Ok::<&'static str, String>("Hello")
    }));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let memo = memo.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                memo.call("greeting")
            })
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap(), Ok("Hello"));
    }
    assert_eq!(calls.load(Relaxed), 1);
}

#[test]
fn a_raising_cohort_does_not_permanently_poison_the_key() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_inner = calls.clone();
    let memo = Arc::new(Memoizer::new(LruCache::new(0), move |_: &i32| {
        calls_inner.fetch_add(1, Relaxed);
        Err::<i32, String>("boom".to_string())
    }));

    let barrier = Arc::new(Barrier::new(5));
    let handles: Vec<_> = (0..5)
        .map(|_| {
            let memo = memo.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                memo.call(1)
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), Err("boom".to_string()));
    }
    assert_eq!(calls.load(Relaxed), 1);

    // A later, independent cohort re-attempts rather than replaying a
    // permanently cached exception.
    assert_eq!(memo.call(1), Err("boom".to_string()));
    assert_eq!(calls.load(Relaxed), 2);
}
