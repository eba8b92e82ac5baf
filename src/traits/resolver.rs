//! Resolver traits for single-flight lazy values.

use crate::error::BoxError;

/// Boxed synchronous resolver: maps the owning context to a value.
pub(crate) type SyncResolveFn<C, R> = dyn Fn(&C) -> Result<R, BoxError> + Send + Sync;

/// Trait for resolvers that produce their value asynchronously.
///
/// This covers values that need I/O to come into existence, such as a
/// connection handshake or fetching remote configuration. A blanket
/// implementation accepts closures of the form `|ctx: &C| async move { .. }`
/// whose future does not borrow the context; clone what the future needs.
///
/// # Examples
///
/// ```
/// use ferrous_lease::{AsyncResolver, BoxError, SingleFlightLazy};
/// use async_trait::async_trait;
///
/// struct Endpoint(String);
///
/// struct Handshake;
///
/// #[async_trait]
/// impl AsyncResolver<Endpoint, String> for Handshake {
///     async fn resolve(&self, endpoint: &Endpoint) -> Result<String, BoxError> {
///         tokio::time::sleep(std::time::Duration::from_millis(5)).await;
///         Ok(format!("session@{}", endpoint.0))
///     }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let lazy = SingleFlightLazy::new_async(Endpoint("10.0.0.1".into()), Handshake);
/// let session = lazy.value_async().await?;
/// assert_eq!(*session, "session@10.0.0.1");
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "async")]
#[async_trait::async_trait]
pub trait AsyncResolver<C, R>: Send + Sync {
    /// Produces the value for `context`.
    async fn resolve(&self, context: &C) -> Result<R, BoxError>;
}

#[cfg(feature = "async")]
#[async_trait::async_trait]
impl<C, R, F, Fut> AsyncResolver<C, R> for F
where
    C: Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(&C) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<R, BoxError>> + Send,
{
    async fn resolve(&self, context: &C) -> Result<R, BoxError> {
        self(context).await
    }
}
