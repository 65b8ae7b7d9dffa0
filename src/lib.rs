//! SWR Cache - An in-process stale-while-revalidate cache
//!
//! Serves cached values immediately, refreshes stale ones in the background,
//! bounds the entry count with LRU eviction and runs at most one producer per
//! key at a time.
//!
//! ```no_run
//! use swr_cache::{CacheConfig, SwrCache, Task};
//!
//! # async fn example() -> swr_cache::error::Result<()> {
//! let cache: SwrCache<&str, String> =
//!     SwrCache::new(CacheConfig::new().with_duration_secs(2).with_max_entries(3))?;
//!
//! cache.set_task_once("user:1", Task::new(|| async { Ok("Ada".to_string()) }))?;
//! let name = cache.get("user:1").await?;
//! assert_eq!(name, "Ada");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{CacheKey, CacheStats, SwrCache, Task};
pub use config::CacheConfig;
pub use error::CacheError;
