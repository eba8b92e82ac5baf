/// Unit tests for LazyError and PoolError display and classification

use ferrous_lease::{BoxError, LazyError, PoolError};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_error_display_resolution() {
    let cause: BoxError = "config file missing".into();
    let error = LazyError::Resolution(Arc::from(cause));
    assert_eq!(error.to_string(), "Resolution failed: config file missing");
}

#[test]
fn test_error_display_abandoned() {
    assert_eq!(LazyError::Abandoned.to_string(), "Resolution abandoned before completing");
}

#[test]
fn test_lazy_error_clones_share_cause() {
    let cause: BoxError = "timeout".into();
    let error = LazyError::Resolution(Arc::from(cause));
    let cloned = error.clone();

    match (&error, &cloned) {
        (LazyError::Resolution(a), LazyError::Resolution(b)) => assert!(Arc::ptr_eq(a, b)),
        _ => unreachable!(),
    }
}

#[test]
fn test_error_display_exhausted() {
    let error = PoolError::Exhausted { waited: Duration::from_millis(1500) };
    assert_eq!(error.to_string(), "No pooled item available after 1.5s");
    assert!(error.is_exhausted());
    assert!(error.source().is_none());
}

#[test]
fn test_error_display_disposed() {
    let error = PoolError::Disposed;
    assert_eq!(error.to_string(), "Pool has been disposed");
    assert!(!error.is_exhausted());
}

#[test]
fn test_factory_error_exposes_source() {
    let error = PoolError::Factory("dns lookup failed".into());
    assert_eq!(error.to_string(), "Pool factory failed: dns lookup failed");
    let source = error.source().expect("factory error keeps its cause");
    assert_eq!(source.to_string(), "dns lookup failed");
    assert!(!error.is_exhausted());
}

#[test]
fn test_errors_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<LazyError>();
    assert_send_sync::<PoolError>();
}
