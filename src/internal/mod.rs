//! Internal implementation details.

pub(crate) mod teardown;

pub(crate) use teardown::{best_effort, panic_message, DestroyFn, Teardown, TeardownBag};
