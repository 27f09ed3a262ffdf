//! Cache domain - Generic caching abstraction layer

mod key;
mod pipeline;
mod repository;
mod retry;

pub use key::{CacheKeyGenerator, CacheKeyParams, DefaultKeyGenerator, EntityKeys};
pub use pipeline::{CacheOp, CacheOpResult, CachePipeline};
pub(crate) use repository::glob_to_regex;
pub use repository::Cache;
pub use retry::RetryPolicy;

#[cfg(test)]
pub use repository::mock::MockCache;
