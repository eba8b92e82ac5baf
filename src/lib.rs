//! # ferrous-lease
//!
//! Thread-safe primitives that make sure a cached or pooled resource is built
//! or acquired at most once under concurrent callers.
//!
//! ## Features
//!
//! - **Single-flight lazy values**: a resolver runs once per context, no matter how
//!   many threads race the first access; failures are shared and retryable
//! - **Bounded pools**: blocking leases with optional timeouts, reuse on release,
//!   best-effort teardown when the pool is disposed
//! - **Time-to-live caches**: a single value regenerated lazily after it expires
//! - **Async resolvers** (feature `async`): resolve from a future, await the value
//! - **JSON options** (feature `config`): tune capacity, waits and TTLs at deploy time
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_lease::{Pool, SingleFlightLazy, TtlCache};
//! use std::time::Duration;
//!
//! // Resolve a connection string once per tenant
//! let dsn = SingleFlightLazy::new("tenant-a".to_string(), |tenant: &String| {
//!     Ok::<_, String>(format!("postgres://db/{}", tenant))
//! });
//! assert_eq!(*dsn.value().unwrap(), "postgres://db/tenant-a");
//!
//! // Reuse scratch buffers, at most four alive at once
//! let buffers = Pool::builder(|| Vec::<u8>::with_capacity(4096))
//!     .max_items(4)
//!     .on_release(|buf: &mut Vec<u8>| buf.clear())
//!     .build();
//! let mut buf = buffers.take().unwrap();
//! buf.extend_from_slice(b"hello");
//! drop(buf);
//! assert_eq!(buffers.count(), 1);
//!
//! // Recompute a snapshot at most once a second
//! let snapshot = TtlCache::new(|| vec![1, 2, 3], Duration::from_secs(1));
//! assert_eq!(snapshot.value().len(), 3);
//! ```
//!
//! ## Error Handling
//!
//! - [`LazyError`]: a resolver failure, shared with every caller that waited on it
//! - [`PoolError::Exhausted`]: backpressure, nothing freed up within the wait bound
//! - Teardown failures are logged through `tracing` and never propagate

pub mod error;
pub mod lazy;
pub mod metrics;
pub mod pool;
pub mod traits;
pub mod ttl_cache;

#[cfg(feature = "config")]
pub mod config;

// Internal modules
mod internal;

// Re-export core types
pub use error::{BoxError, LazyError, LazyResult, PoolError, PoolResult};
pub use lazy::SingleFlightLazy;
pub use metrics::{CacheStats, PoolStats};
pub use pool::{Pool, PoolBuilder, PoolItem};
pub use traits::Dispose;
pub use ttl_cache::TtlCache;

#[cfg(feature = "async")]
pub use traits::AsyncResolver;

#[cfg(feature = "config")]
pub use config::{CacheOptions, PoolOptions};
