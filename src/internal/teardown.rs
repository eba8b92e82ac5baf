//! Best-effort teardown of pooled instances.

use std::panic::{self, AssertUnwindSafe};

use crate::error::BoxError;

/// Hook that destroys one instance.
pub(crate) type DestroyFn<T> = dyn Fn(T) -> Result<(), BoxError> + Send + Sync;

/// Outcome of a single teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Teardown {
    Clean,
    Failed,
}

/// Runs `destroy` on `item`, containing both errors and panics.
///
/// Failures are logged and reported through the return value so callers can
/// count them; they never propagate.
pub(crate) fn best_effort<T>(label: &'static str, destroy: &DestroyFn<T>, item: T) -> Teardown {
    match panic::catch_unwind(AssertUnwindSafe(|| destroy(item))) {
        Ok(Ok(())) => Teardown::Clean,
        Ok(Err(err)) => {
            tracing::warn!(target: "ferrous_lease", pool = label, error = %err, "teardown failed");
            Teardown::Failed
        }
        Err(payload) => {
            tracing::warn!(
                target: "ferrous_lease",
                pool = label,
                panic = panic_message(payload.as_ref()),
                "teardown panicked"
            );
            Teardown::Failed
        }
    }
}

/// Container for pending teardowns, drained outside the pool lock.
///
/// Every entry is torn down even when earlier ones fail.
pub(crate) struct TeardownBag<T> {
    items: Vec<T>,
}

impl<T> TeardownBag<T> {
    pub(crate) fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Destroys every item in LIFO order, returning the number of failures.
    pub(crate) fn run_all_reverse(mut self, label: &'static str, destroy: &DestroyFn<T>) -> usize {
        let mut failures = 0;
        while let Some(item) = self.items.pop() {
            if best_effort(label, destroy, item) == Teardown::Failed {
                failures += 1;
            }
        }
        failures
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
