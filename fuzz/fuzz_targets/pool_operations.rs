#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_lease::Pool;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks the capacity, the rest is an operation stream
    let max_items = (data[0] % 8) as usize + 1;
    let pool = Pool::builder(|| 0u64)
        .max_items(max_items)
        .on_release(|n: &mut u64| *n += 1)
        .build();
    let mut leased = Vec::new();

    for &byte in &data[1..] {
        match byte % 5 {
            0 | 1 => {
                if let Ok(item) = pool.try_take() {
                    leased.push(item);
                }
            }
            2 if !leased.is_empty() => {
                let idx = (byte as usize / 5) % leased.len();
                leased.swap_remove(idx).release();
            }
            3 if !leased.is_empty() => {
                let idx = (byte as usize / 5) % leased.len();
                leased.swap_remove(idx).discard();
            }
            4 if byte > 250 => {
                pool.dispose();
                assert!(pool.try_take().is_err());
            }
            _ => {}
        }

        let stats = pool.stats();
        assert!(stats.live <= max_items);
        assert_eq!(stats.live, stats.idle + leased.len());
    }

    drop(leased);
    pool.dispose();
    assert_eq!(pool.count(), 0);
});
