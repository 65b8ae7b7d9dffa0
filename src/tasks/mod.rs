//! Background Tasks Module
//!
//! Contains the tokio tasks spawned on behalf of the cache.
//!
//! # Tasks
//! - Fetch: runs a producer for a first fetch or a background revalidation

mod fetch;

pub(crate) use fetch::{start_fetch, FetchJob, FetchMode};
