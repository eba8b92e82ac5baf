//! Point-in-time statistics for pools and caches.
//!
//! These are snapshots: they are copied out under the owning structure's lock
//! and do not update afterwards.

/// Snapshot of a [`Pool`](crate::Pool)'s counters.
///
/// # Examples
///
/// ```
/// use ferrous_lease::Pool;
///
/// let pool = Pool::builder(|| 0u32).max_items(4).build();
/// let a = pool.take().unwrap();
/// let _b = pool.take().unwrap();
/// drop(a);
///
/// let stats = pool.stats();
/// assert_eq!(stats.live, 2);
/// assert_eq!(stats.idle, 1);
/// assert_eq!(stats.leased(), 1);
/// assert_eq!(stats.created, 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances currently known to the pool (idle + leased)
    pub live: usize,
    /// Instances sitting idle, ready to be taken
    pub idle: usize,
    /// Upper bound on live instances
    pub max_items: usize,
    /// Instances ever produced by the factory
    pub created: u64,
    /// Instances torn down (disposal, discard, failed release hook)
    pub destroyed: u64,
    /// Takes that gave up because the wait bound elapsed
    pub exhausted: u64,
    /// Teardowns that returned an error or panicked
    pub teardown_failures: u64,
    /// Whether the pool has been disposed
    pub disposed: bool,
}

impl PoolStats {
    /// Instances currently leased out.
    pub fn leased(&self) -> usize {
        self.live.saturating_sub(self.idle)
    }

    /// Fraction of capacity in use, between 0.0 and 1.0.
    pub fn utilization(&self) -> f64 {
        if self.max_items == 0 || self.max_items == usize::MAX {
            0.0
        } else {
            self.leased() as f64 / self.max_items as f64
        }
    }
}

/// Snapshot of a [`TtlCache`](crate::TtlCache)'s counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served from the cached value
    pub hits: u64,
    /// Reads that had to regenerate
    pub misses: u64,
    /// Successful generator runs
    pub generations: u64,
    /// Explicit invalidations
    pub invalidations: u64,
}

impl CacheStats {
    /// Calculate hit ratio
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
