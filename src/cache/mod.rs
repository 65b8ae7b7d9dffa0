//! Cache Module
//!
//! Provides an in-memory stale-while-revalidate cache with LRU eviction and
//! single-flight producer invocations.

mod entry;
mod inflight;
mod key;
mod lru;
mod registry;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::Entry;
pub use inflight::{InFlightTracker, PendingResult};
pub use key::CacheKey;
pub use lru::{EntryId, EvictionList};
pub use registry::{Task, TaskRegistry};
pub use stats::CacheStats;
pub use store::SwrCache;

pub(crate) use store::{CacheState, SharedState};

// == Public Constants ==
/// Maximum allowed string key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
