#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_lease::TtlCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fuzz_target!(|data: &[u8]| {
    let generations = Arc::new(AtomicU64::new(0));
    let generations_clone = generations.clone();
    let cache = TtlCache::new(
        move || generations_clone.fetch_add(1, Ordering::SeqCst),
        Duration::from_secs(3600),
    );

    let mut expected = 0u64;
    let mut cached = false;
    for &byte in data {
        if byte % 3 == 0 {
            cache.invalidate();
            cached = false;
        } else {
            let value = *cache.value();
            if !cached {
                expected = generations.load(Ordering::SeqCst) - 1;
                cached = true;
            }
            assert_eq!(value, expected);
        }
    }
});
