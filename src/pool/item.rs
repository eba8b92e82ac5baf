//! Leased handle returned by [`Pool::take`](crate::Pool::take).

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::Shared;

/// An instance leased from a [`Pool`](crate::Pool).
///
/// Dereferences to the pooled `T`. Dropping the handle (or calling
/// [`release`](Self::release)) returns the instance to the pool exactly once:
/// the release hook runs and the instance becomes idle again, unless the pool
/// has been disposed in the meantime, in which case it is torn down.
///
/// # Examples
///
/// ```
/// use ferrous_lease::Pool;
///
/// let pool = Pool::builder(|| String::with_capacity(128)).max_items(1).build();
///
/// {
///     let mut buf = pool.take().unwrap();
///     buf.push_str("scratch");
/// } // returned here
///
/// assert_eq!(pool.idle_count(), 1);
/// ```
pub struct PoolItem<T: Send + 'static> {
    item: Option<T>,
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> PoolItem<T> {
    pub(super) fn new(item: T, shared: Arc<Shared<T>>) -> Self {
        Self { item: Some(item), shared }
    }

    /// Returns the instance to its pool now.
    pub fn release(self) {
        drop(self);
    }

    /// Tears the instance down instead of returning it, freeing its slot for
    /// a fresh instance. Use this for instances known to be broken.
    pub fn discard(mut self) {
        if let Some(item) = self.item.take() {
            self.shared.destroy_one(item);
        }
    }

    /// Whether the owning pool has been disposed. A disposed pool destroys
    /// this instance on release.
    pub fn is_orphaned(&self) -> bool {
        self.shared.is_disposed()
    }
}

impl<T: Send + 'static> Deref for PoolItem<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().expect("pooled item accessed after release")
    }
}

impl<T: Send + 'static> DerefMut for PoolItem<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().expect("pooled item accessed after release")
    }
}

impl<T: Send + 'static> Drop for PoolItem<T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.shared.release(item);
        }
    }
}

impl<T: Send + std::fmt::Debug + 'static> std::fmt::Debug for PoolItem<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolItem")
            .field("item", &self.item)
            .field("pool", &self.shared.label)
            .finish()
    }
}
