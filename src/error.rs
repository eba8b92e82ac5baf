//! Error types for lazy resolution and pooled leases.

use std::sync::Arc;
use std::time::Duration;

/// Boxed error returned by resolvers, factories and teardown hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by [`SingleFlightLazy`](crate::SingleFlightLazy).
///
/// A failed attempt never poisons the instance: the next access runs the
/// resolver again.
///
/// # Examples
///
/// ```rust
/// use ferrous_lease::{LazyError, SingleFlightLazy};
///
/// let lazy = SingleFlightLazy::new("db.example", |host: &&str| -> Result<String, String> {
///     Err(format!("cannot reach {}", host))
/// });
///
/// match lazy.value() {
///     Err(LazyError::Resolution(cause)) => {
///         assert_eq!(cause.to_string(), "cannot reach db.example");
///     }
///     _ => unreachable!(),
/// }
/// assert!(!lazy.is_resolved());
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum LazyError {
    /// The resolver returned an error. Every caller that waited on the same
    /// attempt receives a clone of this value.
    #[error("Resolution failed: {0}")]
    Resolution(Arc<dyn std::error::Error + Send + Sync>),
    /// The attempt ended without a result: the resolver panicked, or the
    /// future driving it was dropped mid-flight.
    #[error("Resolution abandoned before completing")]
    Abandoned,
}

impl LazyError {
    pub(crate) fn resolution(err: BoxError) -> Self {
        LazyError::Resolution(Arc::from(err))
    }
}

/// Errors surfaced by [`Pool`](crate::Pool).
///
/// [`PoolError::Exhausted`] is the expected backpressure signal when every
/// instance stays leased for the whole wait bound.
///
/// # Examples
///
/// ```rust
/// use ferrous_lease::{Pool, PoolError};
/// use std::time::Duration;
///
/// let pool = Pool::builder(|| Vec::<u8>::with_capacity(64)).max_items(1).build();
/// let _held = pool.take().unwrap();
///
/// match pool.take_timeout(Duration::from_millis(10)) {
///     Err(PoolError::Exhausted { waited }) => assert_eq!(waited, Duration::from_millis(10)),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// No pooled item became available within the wait bound
    #[error("No pooled item available after {waited:?}")]
    Exhausted {
        /// The wait bound that elapsed
        waited: Duration,
    },
    /// The pool was disposed before or while waiting
    #[error("Pool has been disposed")]
    Disposed,
    /// The factory failed to produce a new instance
    #[error("Pool factory failed: {0}")]
    Factory(#[source] BoxError),
}

impl PoolError {
    /// Returns true for the recoverable "nothing free in time" condition.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, PoolError::Exhausted { .. })
    }
}

/// Result type for lazy resolution
pub type LazyResult<T> = Result<T, LazyError>;

/// Result type for pool operations
///
/// ```rust
/// use ferrous_lease::{Pool, PoolResult, PoolItem};
///
/// fn checkout(pool: &Pool<String>) -> PoolResult<PoolItem<String>> {
///     pool.try_take()
/// }
///
/// let pool = Pool::new(String::new);
/// assert!(checkout(&pool).is_ok());
/// ```
pub type PoolResult<T> = Result<T, PoolError>;
