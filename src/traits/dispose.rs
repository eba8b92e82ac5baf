//! Disposal trait for pooled resources.

use crate::error::BoxError;

/// Trait for structured teardown of a pooled instance.
///
/// Implement this for resources that need more than `Drop` to shut down
/// (closing a connection, flushing a buffer) and hand them to
/// [`Pool::disposing`](crate::Pool::disposing). The pool calls `dispose`
/// when the instance is destroyed: when the pool itself is disposed, when a
/// handle is released after disposal, or when a handle is discarded.
///
/// Errors are logged and swallowed so that sibling instances are still torn
/// down.
///
/// # Examples
///
/// ```
/// use ferrous_lease::{BoxError, Dispose, Pool};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// struct Connection {
///     closed: Arc<AtomicUsize>,
/// }
///
/// impl Dispose for Connection {
///     fn dispose(self) -> Result<(), BoxError> {
///         self.closed.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let closed = Arc::new(AtomicUsize::new(0));
/// let closed_clone = closed.clone();
/// let pool = Pool::disposing(move || Connection { closed: closed_clone.clone() });
///
/// drop(pool.take().unwrap());
/// pool.dispose();
/// assert_eq!(closed.load(Ordering::SeqCst), 1);
/// ```
pub trait Dispose: Send + 'static {
    /// Tear the instance down, consuming it.
    fn dispose(self) -> Result<(), BoxError>;
}
