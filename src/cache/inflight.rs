//! In-Flight Tracker Module
//!
//! Records which keys currently have a producer running, so concurrent
//! readers share one pending result instead of starting their own.

use std::collections::HashMap;

use futures::future::{BoxFuture, Shared};

use crate::cache::CacheKey;
use crate::error::Result;

/// A producer result that any number of callers can await.
pub type PendingResult<V> = Shared<BoxFuture<'static, Result<V>>>;

// == In-Flight Tracker ==
/// Maps keys to the pending result of their running producer.
///
/// A key is present from the moment its producer is started until the
/// invocation settles, and never holds two invocations at once.
pub struct InFlightTracker<K, V> {
    running: HashMap<K, PendingResult<V>>,
}

impl<K: CacheKey, V: Clone> InFlightTracker<K, V> {
    pub fn new() -> Self {
        Self {
            running: HashMap::new(),
        }
    }

    // == Begin ==
    /// Records that `key` is being produced.
    pub fn begin(&mut self, key: K, pending: PendingResult<V>) {
        let previous = self.running.insert(key, pending);
        debug_assert!(previous.is_none(), "two producers in flight for one key");
    }

    // == Is Running ==
    pub fn is_running(&self, key: &K) -> bool {
        self.running.contains_key(key)
    }

    // == Peek ==
    /// Returns a handle to the pending result for `key`.
    pub fn peek(&self, key: &K) -> Option<PendingResult<V>> {
        self.running.get(key).cloned()
    }

    // == End ==
    /// Drops the record for `key`. Returns whether one existed.
    pub fn end(&mut self, key: &K) -> bool {
        self.running.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }
}

impl<K: CacheKey, V: Clone> Default for InFlightTracker<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
