//! JSON-configurable options for pools and caches.
//!
//! Lets deployments tune capacity, wait bounds and time-to-live without a
//! rebuild. Only the tuning knobs live here; factories, hooks and generators
//! are always supplied in code.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pool::PoolBuilder;
use crate::ttl_cache::TtlCache;

/// Tuning knobs for a [`Pool`](crate::Pool).
///
/// Missing fields keep the builder's defaults (unbounded, wait forever).
///
/// # Examples
///
/// ```
/// use ferrous_lease::{Pool, PoolOptions};
/// use std::time::Duration;
///
/// let options = PoolOptions::from_json(r#"{ "max_items": 4, "wait_timeout_ms": 250 }"#).unwrap();
/// assert_eq!(options.wait_timeout(), Some(Duration::from_millis(250)));
///
/// let pool = Pool::builder(|| 0u8).with_options(&options).build();
/// assert_eq!(pool.max_items(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    /// Upper bound on live instances
    pub max_items: Option<usize>,
    /// Default wait bound for `take`, in milliseconds
    pub wait_timeout_ms: Option<u64>,
}

impl PoolOptions {
    /// Parse options from a JSON document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize options to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Default wait bound as a `Duration`, if one is set
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_ms.map(Duration::from_millis)
    }
}

/// Tuning knobs for a [`TtlCache`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOptions {
    /// Time-to-live in milliseconds
    pub ttl_ms: u64,
}

impl CacheOptions {
    /// Parse options from a JSON document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Time-to-live as a `Duration`
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl<T: Send + 'static> PoolBuilder<T> {
    /// Applies every option that is set, leaving the rest untouched.
    pub fn with_options(self, options: &PoolOptions) -> Self {
        let builder = match options.max_items {
            Some(max_items) => self.max_items(max_items),
            None => self,
        };
        match options.wait_timeout() {
            Some(wait) => builder.default_wait(wait),
            None => builder,
        }
    }
}

impl<T> TtlCache<T>
where
    T: Send + Sync + 'static,
{
    /// Creates a cache whose time-to-live comes from `options`.
    pub fn with_options<F>(generator: F, options: &CacheOptions) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(generator, options.ttl())
    }
}
