//! Runtime configuration types for the aggregation core.
//!
//! These types hold validated values. Parsing the configuration file is
//! handled by the server crate.

mod cache;
mod rate_limit;
mod source;

pub use cache::CacheConfig;
pub use rate_limit::RateLimitConfig;
pub use source::SourceConfig;

pub use crate::retry::RetryPolicy;
