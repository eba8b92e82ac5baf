//! Core traits for resolvers and pooled resources.

mod dispose;
mod resolver;

pub use dispose::Dispose;
#[cfg(feature = "async")]
pub use resolver::AsyncResolver;
pub(crate) use resolver::SyncResolveFn;
