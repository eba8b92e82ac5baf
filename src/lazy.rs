//! Single-flight lazy values bound to an owning context.
//!
//! A [`SingleFlightLazy`] pairs a context value with a resolver. The first
//! access runs the resolver; every caller that arrives while that attempt is
//! in flight waits for it and shares its outcome. Once an attempt succeeds the
//! value is cached for the life of the instance.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::{BoxError, LazyError, LazyResult};
use crate::traits::SyncResolveFn;
#[cfg(feature = "async")]
use crate::traits::AsyncResolver;

enum Resolver<C, R> {
    Sync(Box<SyncResolveFn<C, R>>),
    #[cfg(feature = "async")]
    Async(Box<dyn AsyncResolver<C, R>>),
}

/// Mutable state, guarded by a single mutex per instance.
struct Slot<R> {
    value: Option<Arc<R>>,
    in_flight: bool,
    /// Bumped every time an attempt finishes.
    epoch: u64,
    /// Failure of the most recently finished attempt.
    last_failure: Option<LazyError>,
    attempts: u64,
}

enum Step<R> {
    Ready(Arc<R>),
    Failed(LazyError),
    Wait(u64),
    Run(u64),
}

impl<R> Slot<R> {
    fn new() -> Self {
        Self {
            value: None,
            in_flight: false,
            epoch: 0,
            last_failure: None,
            attempts: 0,
        }
    }

    /// Decides what the caller does next. `waited_on` is the epoch of the
    /// attempt the caller was blocked on, if any.
    fn step(&mut self, waited_on: Option<u64>) -> Step<R> {
        if let Some(value) = &self.value {
            return Step::Ready(value.clone());
        }

        // The attempt this caller waited on has finished without a value. A
        // later attempt may also have failed before the caller woke up; it
        // still gets a failure instead of starting another attempt.
        if let (Some(epoch), Some(err)) = (waited_on, &self.last_failure) {
            if self.epoch > epoch {
                return Step::Failed(err.clone());
            }
        }

        if self.in_flight {
            return Step::Wait(self.epoch);
        }

        self.in_flight = true;
        self.attempts += 1;
        Step::Run(self.epoch)
    }
}

/// Thread-safe lazy value whose resolver runs at most once at a time and
/// never again after it succeeds.
///
/// The resolver receives a reference to the context supplied at construction.
/// It may be synchronous ([`new`](Self::new)) or asynchronous
/// ([`new_async`](Self::new_async)); both kinds go through the same
/// resolve-once state machine, and both can be read with either
/// [`value`](Self::value) (blocking) or [`value_async`](Self::value_async).
///
/// # Failure semantics
///
/// If the resolver fails, the attempting caller and every caller waiting on
/// that attempt receive the same [`LazyError::Resolution`]. The instance stays
/// unresolved, so the next access starts a fresh attempt.
///
/// # Examples
///
/// ```
/// use ferrous_lease::SingleFlightLazy;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::thread;
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let calls_clone = calls.clone();
///
/// let lazy = Arc::new(SingleFlightLazy::new(21u64, move |n: &u64| {
///     calls_clone.fetch_add(1, Ordering::SeqCst);
///     Ok::<_, String>(n * 2)
/// }));
///
/// let handles: Vec<_> = (0..8)
///     .map(|_| {
///         let lazy = lazy.clone();
///         thread::spawn(move || *lazy.value().unwrap())
///     })
///     .collect();
///
/// for handle in handles {
///     assert_eq!(handle.join().unwrap(), 42);
/// }
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
pub struct SingleFlightLazy<C, R> {
    context: C,
    resolver: Resolver<C, R>,
    slot: Mutex<Slot<R>>,
    finished: Condvar,
    #[cfg(feature = "async")]
    finished_async: tokio::sync::Notify,
}

impl<C, R> std::fmt::Debug for SingleFlightLazy<C, R>
where
    C: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("SingleFlightLazy")
            .field("context", &self.context)
            .field("is_resolved", &slot.value.is_some())
            .field("in_flight", &slot.in_flight)
            .field("attempts", &slot.attempts)
            .finish()
    }
}

impl<C, R> SingleFlightLazy<C, R>
where
    C: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    /// Creates a lazy value with a synchronous resolver.
    ///
    /// The resolver is not invoked until the first access.
    pub fn new<F, E>(context: C, resolver: F) -> Self
    where
        F: Fn(&C) -> Result<R, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let resolver: Box<SyncResolveFn<C, R>> =
            Box::new(move |context: &C| resolver(context).map_err(Into::<BoxError>::into));
        Self::with_resolver(context, Resolver::Sync(resolver))
    }

    /// Creates a lazy value with an asynchronous resolver.
    ///
    /// Prefer [`value_async`](Self::value_async) for these. [`value`](Self::value)
    /// also works, driving the future on the calling thread, but only for
    /// futures that do not need a runtime reactor (timers, sockets).
    #[cfg(feature = "async")]
    pub fn new_async(context: C, resolver: impl AsyncResolver<C, R> + 'static) -> Self {
        Self::with_resolver(context, Resolver::Async(Box::new(resolver)))
    }

    fn with_resolver(context: C, resolver: Resolver<C, R>) -> Self {
        Self {
            context,
            resolver,
            slot: Mutex::new(Slot::new()),
            finished: Condvar::new(),
            #[cfg(feature = "async")]
            finished_async: tokio::sync::Notify::new(),
        }
    }

    /// The context this value is resolved from.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Returns true once an attempt has succeeded.
    pub fn is_resolved(&self) -> bool {
        self.slot.lock().value.is_some()
    }

    /// Returns the cached value without triggering resolution.
    pub fn try_value(&self) -> Option<Arc<R>> {
        self.slot.lock().value.clone()
    }

    /// Number of resolver invocations started so far.
    pub fn attempts(&self) -> u64 {
        self.slot.lock().attempts
    }

    /// Returns the resolved value, resolving it on first access.
    ///
    /// Blocks the calling thread while another caller's attempt is in flight.
    pub fn value(&self) -> LazyResult<Arc<R>> {
        let mut slot = self.slot.lock();
        let mut waited_on = None;
        loop {
            match slot.step(waited_on) {
                Step::Ready(value) => return Ok(value),
                Step::Failed(err) => return Err(err),
                Step::Wait(epoch) => {
                    waited_on = Some(epoch);
                    self.finished.wait(&mut slot);
                }
                Step::Run(epoch) => {
                    drop(slot);
                    let attempt = Attempt::new(self, epoch);
                    let result = self.resolve_blocking();
                    return attempt.complete(result);
                }
            }
        }
    }

    /// Returns the resolved value, resolving it on first access.
    ///
    /// Waits asynchronously while another caller's attempt is in flight. If
    /// this future is dropped while it owns the attempt, waiters observe
    /// [`LazyError::Abandoned`] and the next access retries.
    #[cfg(feature = "async")]
    pub async fn value_async(&self) -> LazyResult<Arc<R>> {
        enum Next<'a> {
            Wait(tokio::sync::futures::Notified<'a>),
            Run(u64),
        }

        let mut waited_on = None;
        loop {
            let next = {
                let mut slot = self.slot.lock();
                match slot.step(waited_on) {
                    Step::Ready(value) => return Ok(value),
                    Step::Failed(err) => return Err(err),
                    Step::Wait(epoch) => {
                        waited_on = Some(epoch);
                        // Registered before the lock is released, so a finish
                        // that happens in between still wakes us.
                        Next::Wait(self.finished_async.notified())
                    }
                    Step::Run(epoch) => Next::Run(epoch),
                }
            };

            match next {
                Next::Wait(notified) => notified.await,
                Next::Run(epoch) => {
                    let attempt = Attempt::new(self, epoch);
                    let result = match &self.resolver {
                        Resolver::Sync(resolve) => resolve(&self.context),
                        Resolver::Async(resolve) => resolve.resolve(&self.context).await,
                    };
                    return attempt.complete(result.map_err(LazyError::resolution));
                }
            }
        }
    }

    fn resolve_blocking(&self) -> LazyResult<R> {
        let result = match &self.resolver {
            Resolver::Sync(resolve) => resolve(&self.context),
            #[cfg(feature = "async")]
            Resolver::Async(resolve) => futures_lite::future::block_on(resolve.resolve(&self.context)),
        };
        result.map_err(LazyError::resolution)
    }

    /// Publishes the outcome of attempt `epoch` and wakes every waiter.
    fn finish(&self, epoch: u64, result: LazyResult<R>) -> LazyResult<Arc<R>> {
        let outcome = {
            let mut slot = self.slot.lock();
            debug_assert_eq!(slot.epoch, epoch, "only one attempt is in flight at a time");
            slot.in_flight = false;
            slot.epoch += 1;
            match result {
                Ok(value) => {
                    let value = Arc::new(value);
                    slot.value = Some(value.clone());
                    slot.last_failure = None;
                    Ok(value)
                }
                Err(err) => {
                    tracing::warn!(target: "ferrous_lease", attempt = slot.attempts, error = %err, "lazy resolution failed");
                    slot.last_failure = Some(err.clone());
                    Err(err)
                }
            }
        };

        self.finished.notify_all();
        #[cfg(feature = "async")]
        self.finished_async.notify_waiters();
        outcome
    }
}

/// Ownership of one in-flight attempt. Dropping it unfinished (panic or
/// cancelled future) publishes [`LazyError::Abandoned`] so waiters never hang.
struct Attempt<'a, C, R>
where
    C: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    lazy: &'a SingleFlightLazy<C, R>,
    epoch: u64,
    armed: bool,
}

impl<'a, C, R> Attempt<'a, C, R>
where
    C: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn new(lazy: &'a SingleFlightLazy<C, R>, epoch: u64) -> Self {
        Self { lazy, epoch, armed: true }
    }

    fn complete(mut self, result: LazyResult<R>) -> LazyResult<Arc<R>> {
        self.armed = false;
        self.lazy.finish(self.epoch, result)
    }
}

impl<C, R> Drop for Attempt<'_, C, R>
where
    C: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if self.armed {
            if std::thread::panicking() {
                tracing::warn!(target: "ferrous_lease", "lazy resolver panicked");
            }
            let _ = self.lazy.finish(self.epoch, Err(LazyError::Abandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_resolver_not_invoked_until_first_access() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let lazy = SingleFlightLazy::new("ctx".to_string(), move |ctx: &String| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BoxError>(ctx.len())
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!lazy.is_resolved());
        assert!(lazy.try_value().is_none());
        assert_eq!(lazy.context(), "ctx");

        assert_eq!(*lazy.value().unwrap(), 3);
        assert!(lazy.is_resolved());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sequential_access_returns_cached_value() {
        let lazy = SingleFlightLazy::new(5u32, |n: &u32| Ok::<_, BoxError>(vec![*n; 3]));

        let first = lazy.value().unwrap();
        let second = lazy.value().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(lazy.attempts(), 1);
        assert!(Arc::ptr_eq(&first, &lazy.try_value().unwrap()));
    }

    #[test]
    fn test_failure_then_success_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let lazy = SingleFlightLazy::new((), move |_: &()| {
            if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("transient".to_string())
            } else {
                Ok("ready")
            }
        });

        let err = lazy.value().unwrap_err();
        assert!(matches!(err, LazyError::Resolution(_)));
        assert_eq!(err.to_string(), "Resolution failed: transient");
        assert!(!lazy.is_resolved());

        assert_eq!(*lazy.value().unwrap(), "ready");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(lazy.attempts(), 2);
    }

    #[test]
    fn test_panicking_resolver_leaves_instance_retryable() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let lazy = Arc::new(SingleFlightLazy::new(0u8, move |_: &u8| {
            if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("resolver blew up");
            }
            Ok::<_, BoxError>(7u8)
        }));

        let lazy_clone = lazy.clone();
        let joined = std::thread::spawn(move || lazy_clone.value()).join();
        assert!(joined.is_err());

        assert!(!lazy.is_resolved());
        assert_eq!(*lazy.value().unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_debug_reports_state() {
        let lazy = SingleFlightLazy::new(1i32, |n: &i32| Ok::<_, BoxError>(*n));
        let before = format!("{:?}", lazy);
        assert!(before.contains("is_resolved: false"));
        lazy.value().unwrap();
        let after = format!("{:?}", lazy);
        assert!(after.contains("is_resolved: true"));
        assert!(after.contains("attempts: 1"));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_async_resolver_via_value_async() {
        let lazy = SingleFlightLazy::new_async(10u32, |n: &u32| {
            let n = *n;
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                Ok::<_, BoxError>(n + 1)
            }
        });

        assert_eq!(*lazy.value_async().await.unwrap(), 11);
        assert_eq!(*lazy.value_async().await.unwrap(), 11);
        assert_eq!(lazy.attempts(), 1);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_waiter_gets_failure_even_if_a_later_attempt_finished_first() {
        let calls = Arc::new(AtomicU32::new(0));
        let gate = Arc::new(tokio::sync::Notify::new());
        let lazy = SingleFlightLazy::new_async((), {
            let calls = calls.clone();
            let gate = gate.clone();
            move |_: &()| {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                let gate = gate.clone();
                async move {
                    if attempt == 0 {
                        gate.notified().await;
                    }
                    Err::<u32, BoxError>(format!("fail-{}", attempt).into())
                }
            }
        });

        let mut first = std::pin::pin!(lazy.value_async());
        let mut waiter = std::pin::pin!(lazy.value_async());
        assert!(futures_lite::future::poll_once(&mut first).await.is_none());
        assert!(futures_lite::future::poll_once(&mut waiter).await.is_none());

        gate.notify_one();
        let first = first.await.unwrap_err();
        assert_eq!(first.to_string(), "Resolution failed: fail-0");

        // Another caller runs and fails attempt 1 before the waiter is polled again
        let second = lazy.value().unwrap_err();
        assert_eq!(second.to_string(), "Resolution failed: fail-1");

        let waited = waiter.await.unwrap_err();
        assert!(matches!(waited, LazyError::Resolution(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2, "waiter must not start a third attempt");
        assert_eq!(lazy.attempts(), 2);
    }

    #[cfg(feature = "async")]
    #[test]
    fn test_async_resolver_via_blocking_value() {
        let lazy = SingleFlightLazy::new_async("abc".to_string(), |s: &String| {
            let upper = s.to_uppercase();
            async move { Ok::<_, BoxError>(upper) }
        });

        assert_eq!(*lazy.value().unwrap(), "ABC");
    }
}
