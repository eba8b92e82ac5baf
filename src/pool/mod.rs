//! Bounded resource pool with blocking acquisition.
//!
//! A [`Pool`] hands out [`PoolItem`] leases over instances produced by a
//! factory. Instances are created lazily up to `max_items`; once the cap is
//! reached, takers block until a lease is returned or their wait bound
//! elapses. Returned instances are reused rather than destroyed, and are only
//! torn down when the pool itself is disposed.

mod item;

pub use item::PoolItem;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{BoxError, PoolError, PoolResult};
use crate::internal::{best_effort, panic_message, DestroyFn, Teardown, TeardownBag};
use crate::metrics::PoolStats;
use crate::traits::Dispose;

type FactoryFn<T> = dyn Fn() -> Result<T, BoxError> + Send + Sync;
type ReleaseFn<T> = dyn Fn(&mut T) + Send + Sync;

const DEFAULT_LABEL: &str = "pool";

/// State shared between a pool and its outstanding leases.
pub(crate) struct Shared<T> {
    label: &'static str,
    state: Mutex<State<T>>,
    available: Condvar,
    factory: Box<FactoryFn<T>>,
    on_release: Option<Box<ReleaseFn<T>>>,
    destroy: Box<DestroyFn<T>>,
    max_items: usize,
    default_wait: Option<Duration>,
}

struct State<T> {
    idle: Vec<T>,
    /// Idle + leased + reserved for an in-progress factory call.
    live: usize,
    disposed: bool,
    created: u64,
    destroyed: u64,
    exhausted: u64,
    teardown_failures: u64,
}

impl<T: Send + 'static> Shared<T> {
    pub(crate) fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Return path for a lease.
    pub(crate) fn release(&self, mut item: T) {
        if self.state.lock().disposed {
            self.destroy_one(item);
            return;
        }

        if let Some(hook) = &self.on_release {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook(&mut item))) {
                tracing::warn!(
                    target: "ferrous_lease",
                    pool = self.label,
                    panic = panic_message(payload.as_ref()),
                    "release hook panicked, destroying instance"
                );
                self.destroy_one(item);
                return;
            }
        }

        let mut state = self.state.lock();
        if state.disposed {
            drop(state);
            self.destroy_one(item);
            return;
        }
        state.idle.push(item);
        drop(state);
        self.available.notify_one();
    }

    /// Tears down one instance and frees its slot.
    pub(crate) fn destroy_one(&self, item: T) {
        let outcome = best_effort(self.label, self.destroy.as_ref(), item);
        {
            let mut state = self.state.lock();
            state.live -= 1;
            state.destroyed += 1;
            if outcome == Teardown::Failed {
                state.teardown_failures += 1;
            }
        }
        self.available.notify_one();
    }

    /// Gives back a slot reserved for a factory call that did not produce an
    /// instance.
    fn cancel_reservation(&self) {
        self.state.lock().live -= 1;
        self.available.notify_one();
    }
}

/// Slot reserved under the lock before the factory runs outside it. Dropping
/// it unused (factory error or panic) hands the slot back.
struct Reservation<'a, T: Send + 'static> {
    shared: &'a Shared<T>,
    armed: bool,
}

impl<T: Send + 'static> Drop for Reservation<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.cancel_reservation();
        }
    }
}

/// Bounded pool of reusable instances.
///
/// All mutable state (idle set, live count, disposed flag) sits behind one
/// mutex, so the capacity invariant `live <= max_items` holds under any
/// number of concurrent takers. Waiters are woken one per returned instance
/// with no FIFO guarantee.
///
/// Dropping the pool disposes it.
///
/// # Examples
///
/// ```
/// use ferrous_lease::Pool;
/// use std::sync::Arc;
/// use std::thread;
/// use std::time::Duration;
///
/// let pool = Arc::new(Pool::builder(|| vec![0u8; 1024]).max_items(2).build());
///
/// let a = pool.take().unwrap();
/// let _b = pool.take().unwrap();
///
/// let waiter = {
///     let pool = pool.clone();
///     thread::spawn(move || pool.take_timeout(Duration::from_secs(5)).is_ok())
/// };
///
/// thread::sleep(Duration::from_millis(20));
/// drop(a); // wakes the waiter
/// assert!(waiter.join().unwrap());
/// assert_eq!(pool.count(), 2);
/// ```
pub struct Pool<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Pool<T> {
    /// Creates an unbounded pool over an infallible factory.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::builder(factory).build()
    }

    /// Starts configuring a pool over an infallible factory.
    pub fn builder<F>(factory: F) -> PoolBuilder<T>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        PoolBuilder::from_factory(Box::new(move || Ok::<T, BoxError>(factory())))
    }

    /// Starts configuring a pool over a factory that can fail. Failures
    /// surface from `take` as [`PoolError::Factory`].
    pub fn try_builder<F, E>(factory: F) -> PoolBuilder<T>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        PoolBuilder::from_factory(Box::new(move || factory().map_err(Into::<BoxError>::into)))
    }

    /// Creates an unbounded pool whose instances are torn down through
    /// [`Dispose`].
    pub fn disposing<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Dispose,
    {
        Self::builder(factory).on_destroy(T::dispose).build()
    }

    /// Leases an instance, waiting up to the configured default wait (forever
    /// if none was set).
    pub fn take(&self) -> PoolResult<PoolItem<T>> {
        self.take_within(self.shared.default_wait)
    }

    /// Leases an instance, waiting at most `wait` for one to become free.
    pub fn take_timeout(&self, wait: Duration) -> PoolResult<PoolItem<T>> {
        self.take_within(Some(wait))
    }

    /// Leases an instance only if one is idle or can be created right away.
    pub fn try_take(&self) -> PoolResult<PoolItem<T>> {
        self.take_within(Some(Duration::ZERO))
    }

    fn take_within(&self, wait: Option<Duration>) -> PoolResult<PoolItem<T>> {
        let shared = &self.shared;
        // A bound too large to represent is treated as waiting forever.
        let deadline = wait.and_then(|wait| Instant::now().checked_add(wait));
        let mut state = shared.state.lock();

        loop {
            if state.disposed {
                return Err(PoolError::Disposed);
            }

            if let Some(item) = state.idle.pop() {
                return Ok(PoolItem::new(item, shared.clone()));
            }

            if state.live < shared.max_items {
                state.live += 1;
                drop(state);
                return self.create();
            }

            match deadline {
                None => shared.available.wait(&mut state),
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        state.exhausted += 1;
                        let waited = wait.unwrap_or_default();
                        tracing::debug!(target: "ferrous_lease", pool = shared.label, ?waited, "pool exhausted");
                        return Err(PoolError::Exhausted { waited });
                    }
                    shared.available.wait_until(&mut state, deadline);
                }
            }
        }
    }

    /// Runs the factory for a slot already counted in `live`.
    fn create(&self) -> PoolResult<PoolItem<T>> {
        let shared = &self.shared;
        let mut reservation = Reservation { shared: shared.as_ref(), armed: true };

        let item = (shared.factory)().map_err(|err| {
            tracing::warn!(target: "ferrous_lease", pool = shared.label, error = %err, "pool factory failed");
            PoolError::Factory(err)
        })?;
        reservation.armed = false;

        let mut state = shared.state.lock();
        state.created += 1;
        if state.disposed {
            drop(state);
            shared.destroy_one(item);
            return Err(PoolError::Disposed);
        }
        tracing::debug!(target: "ferrous_lease", pool = shared.label, live = state.live, "created pooled instance");
        drop(state);

        Ok(PoolItem::new(item, shared.clone()))
    }

    /// Disposes the pool: idle instances are destroyed now, leased ones when
    /// their handles are released, and blocked takers fail with
    /// [`PoolError::Disposed`]. Calling it again is a no-op.
    pub fn dispose(&self) {
        let shared = &self.shared;
        let idle = {
            let mut state = shared.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            std::mem::take(&mut state.idle)
        };
        shared.available.notify_all();

        let bag = TeardownBag::new(idle);
        let torn_down = bag.len();
        let failures = bag.run_all_reverse(shared.label, shared.destroy.as_ref());

        let mut state = shared.state.lock();
        state.live -= torn_down;
        state.destroyed += torn_down as u64;
        state.teardown_failures += failures as u64;
        tracing::debug!(
            target: "ferrous_lease",
            pool = shared.label,
            destroyed = torn_down,
            failures,
            still_leased = state.live,
            "pool disposed"
        );
    }

    /// Instances currently known to the pool (idle + leased).
    pub fn count(&self) -> usize {
        self.shared.state.lock().live
    }

    /// Instances sitting idle.
    pub fn idle_count(&self) -> usize {
        self.shared.state.lock().idle.len()
    }

    /// Upper bound on live instances.
    pub fn max_items(&self) -> usize {
        self.shared.max_items
    }

    /// Whether [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    /// Snapshot of the pool's counters.
    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        PoolStats {
            live: state.live,
            idle: state.idle.len(),
            max_items: self.shared.max_items,
            created: state.created,
            destroyed: state.destroyed,
            exhausted: state.exhausted,
            teardown_failures: state.teardown_failures,
            disposed: state.disposed,
        }
    }
}

impl<T: Send + 'static> Drop for Pool<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: Send + 'static> std::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("Pool")
            .field("label", &self.shared.label)
            .field("live", &stats.live)
            .field("idle", &stats.idle)
            .field("max_items", &stats.max_items)
            .field("disposed", &stats.disposed)
            .finish()
    }
}

/// Builder for [`Pool`].
///
/// # Examples
///
/// ```
/// use ferrous_lease::Pool;
/// use std::time::Duration;
///
/// let pool = Pool::builder(Vec::<u8>::new)
///     .name("buffers")
///     .max_items(8)
///     .default_wait(Duration::from_millis(250))
///     .on_release(|buf: &mut Vec<u8>| buf.clear())
///     .build();
///
/// let mut buf = pool.take().unwrap();
/// buf.extend_from_slice(b"payload");
/// drop(buf);
///
/// assert!(pool.take().unwrap().is_empty());
/// ```
pub struct PoolBuilder<T> {
    label: &'static str,
    factory: Box<FactoryFn<T>>,
    on_release: Option<Box<ReleaseFn<T>>>,
    destroy: Box<DestroyFn<T>>,
    max_items: usize,
    default_wait: Option<Duration>,
}

impl<T: Send + 'static> PoolBuilder<T> {
    fn from_factory(factory: Box<FactoryFn<T>>) -> Self {
        Self {
            label: DEFAULT_LABEL,
            factory,
            on_release: None,
            destroy: Box::new(|item: T| {
                drop(item);
                Ok(())
            }),
            max_items: usize::MAX,
            default_wait: None,
        }
    }

    /// Name used in log events.
    pub fn name(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Upper bound on live instances. Defaults to unbounded.
    pub fn max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Wait bound applied by [`Pool::take`]. Defaults to waiting forever.
    pub fn default_wait(mut self, wait: Duration) -> Self {
        self.default_wait = Some(wait);
        self
    }

    /// Hook run on every instance as it comes back, before it is reused.
    /// If the hook panics the instance is destroyed instead.
    pub fn on_release<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// Teardown for destroyed instances. Defaults to dropping them. Errors
    /// and panics are logged and never propagate.
    pub fn on_destroy<F, E>(mut self, destroy: F) -> Self
    where
        F: Fn(T) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.destroy = Box::new(move |item: T| destroy(item).map_err(Into::<BoxError>::into));
        self
    }

    /// Finishes configuration. No instance is created until the first take.
    pub fn build(self) -> Pool<T> {
        Pool {
            shared: Arc::new(Shared {
                label: self.label,
                state: Mutex::new(State {
                    idle: Vec::new(),
                    live: 0,
                    disposed: false,
                    created: 0,
                    destroyed: 0,
                    exhausted: 0,
                    teardown_failures: 0,
                }),
                available: Condvar::new(),
                factory: self.factory,
                on_release: self.on_release,
                destroy: self.destroy,
                max_items: self.max_items,
                default_wait: self.default_wait,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_take_creates_lazily() {
        let created = Arc::new(AtomicU32::new(0));
        let created_clone = created.clone();
        let pool = Pool::builder(move || created_clone.fetch_add(1, Ordering::SeqCst)).max_items(3).build();

        assert_eq!(pool.count(), 0);
        let first = pool.take().unwrap();
        assert_eq!(*first, 0);
        assert_eq!(pool.count(), 1);
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_released_instance_is_reused() {
        let pool = Pool::builder(|| Box::new(0u64)).max_items(2).build();

        let item = pool.take().unwrap();
        let addr = &**item as *const u64;
        drop(item);

        let again = pool.take().unwrap();
        assert_eq!(&**again as *const u64, addr);
        assert_eq!(pool.stats().created, 1);
    }

    #[test]
    fn test_try_take_on_full_pool_is_exhausted() {
        let pool = Pool::builder(|| ()).max_items(1).build();
        let _held = pool.take().unwrap();

        let err = pool.try_take().unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(pool.stats().exhausted, 1);
    }

    #[test]
    fn test_zero_capacity_never_hands_out() {
        let pool = Pool::builder(|| 1u8).max_items(0).build();
        assert!(pool.try_take().unwrap_err().is_exhausted());
        assert_eq!(pool.count(), 0);
    }

    #[test]
    fn test_factory_failure_frees_slot() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let pool = Pool::try_builder(move || {
            if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("connect refused")
            } else {
                Ok(5u8)
            }
        })
        .max_items(1)
        .build();

        let err = pool.take().unwrap_err();
        assert!(matches!(err, PoolError::Factory(_)));
        assert_eq!(err.to_string(), "Pool factory failed: connect refused");
        assert_eq!(pool.count(), 0);

        assert_eq!(*pool.take().unwrap(), 5);
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn test_factory_panic_frees_slot() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let pool = Pool::builder(move || {
            if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("factory panicked");
            }
            9u8
        })
        .max_items(1)
        .build();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| pool.take().map(|_| ())));
        assert!(outcome.is_err());
        assert_eq!(pool.count(), 0);
        assert_eq!(*pool.take().unwrap(), 9);
    }

    #[test]
    fn test_release_hook_panic_destroys_instance() {
        let pool = Pool::builder(|| 1u8)
            .max_items(1)
            .on_release(|_: &mut u8| panic!("cannot reset"))
            .build();

        drop(pool.take().unwrap());

        let stats = pool.stats();
        assert_eq!(stats.live, 0);
        assert_eq!(stats.idle, 0);
        assert_eq!(stats.destroyed, 1);
    }

    #[test]
    fn test_take_after_dispose_fails() {
        let pool = Pool::new(|| 0i32);
        pool.dispose();
        pool.dispose();
        assert!(pool.is_disposed());
        assert!(matches!(pool.take(), Err(PoolError::Disposed)));
    }

    #[test]
    fn test_discard_frees_slot() {
        let pool = Pool::builder(|| 0u16).max_items(1).build();
        let item = pool.take().unwrap();
        assert!(!item.is_orphaned());
        item.discard();

        assert_eq!(pool.count(), 0);
        assert_eq!(pool.stats().destroyed, 1);
        assert!(pool.try_take().is_ok());
    }
}
