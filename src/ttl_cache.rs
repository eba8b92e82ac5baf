//! Single-value cache that regenerates lazily after a time-to-live.
//!
//! Expiry is checked on read; there is no background timer. Regeneration is
//! not single-flight: the state lock is released while the generator runs, so
//! readers racing past an expiry may each generate. Use
//! [`SingleFlightLazy`](crate::SingleFlightLazy) when duplicate work must be
//! ruled out.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::metrics::CacheStats;

type GenerateFn<T, E> = dyn Fn() -> Result<T, E> + Send + Sync;

struct Entry<T> {
    value: Arc<T>,
    generated_at: Instant,
}

struct CacheState<T> {
    entry: Option<Entry<T>>,
    /// Bumped by `invalidate` so that a generation started before the
    /// invalidation is not stored after it.
    epoch: u64,
    stats: CacheStats,
}

/// Memoized value that expires `ttl` after it was generated.
///
/// # Examples
///
/// ```
/// use ferrous_lease::TtlCache;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let generations = Arc::new(AtomicU32::new(0));
/// let generations_clone = generations.clone();
/// let cache = TtlCache::new(
///     move || generations_clone.fetch_add(1, Ordering::SeqCst),
///     Duration::from_secs(60),
/// );
///
/// assert_eq!(*cache.value(), 0);
/// assert_eq!(*cache.value(), 0);
///
/// cache.invalidate();
/// assert_eq!(*cache.value(), 1);
/// assert_eq!(generations.load(Ordering::SeqCst), 2);
/// ```
pub struct TtlCache<T, E = Infallible> {
    generator: Box<GenerateFn<T, E>>,
    ttl: Duration,
    state: Mutex<CacheState<T>>,
}

impl<T> TtlCache<T>
where
    T: Send + Sync + 'static,
{
    /// Creates a cache over an infallible generator. Nothing is generated
    /// until the first read.
    pub fn new<F>(generator: F, ttl: Duration) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::try_new(move || Ok::<T, Infallible>(generator()), ttl)
    }

    /// Returns the cached value, regenerating it if it is missing or expired.
    pub fn value(&self) -> Arc<T> {
        match self.try_value() {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}

impl<T, E> TtlCache<T, E>
where
    T: Send + Sync + 'static,
{
    /// Creates a cache over a generator that can fail.
    pub fn try_new<F>(generator: F, ttl: Duration) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            generator: Box::new(generator),
            ttl,
            state: Mutex::new(CacheState {
                entry: None,
                epoch: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    /// Returns the cached value, regenerating it if it is missing or expired.
    ///
    /// A failed generation is returned to the caller and leaves the cache as
    /// it was.
    pub fn try_value(&self) -> Result<Arc<T>, E> {
        let epoch = {
            let mut state = self.state.lock();
            if let Some(value) = self.fresh(&state) {
                state.stats.hits += 1;
                return Ok(value);
            }
            state.stats.misses += 1;
            state.epoch
        };

        let value = Arc::new((self.generator)()?);

        let mut state = self.state.lock();
        state.stats.generations += 1;
        if state.epoch == epoch {
            state.entry = Some(Entry {
                value: value.clone(),
                generated_at: Instant::now(),
            });
        }
        Ok(value)
    }

    /// Returns the cached value only if it is still fresh.
    pub fn peek(&self) -> Option<Arc<T>> {
        let state = self.state.lock();
        self.fresh(&state)
    }

    /// Drops the cached value so the next read regenerates.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.entry = None;
        state.epoch += 1;
        state.stats.invalidations += 1;
    }

    /// Whether a read right now would be served from the cache.
    pub fn is_fresh(&self) -> bool {
        self.peek().is_some()
    }

    /// How long a generated value stays fresh.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Snapshot of hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats.clone()
    }

    fn fresh(&self, state: &CacheState<T>) -> Option<Arc<T>> {
        state
            .entry
            .as_ref()
            .filter(|entry| entry.generated_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }
}

impl<T, E> std::fmt::Debug for TtlCache<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("age", &state.entry.as_ref().map(|entry| entry.generated_at.elapsed()))
            .field("stats", &state.stats)
            .finish()
    }
}
