//! Cache Store Module
//!
//! Main cache engine combining the eviction list, task registry and in-flight
//! tracker into the stale-while-revalidate read path.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{
    CacheKey, CacheStats, EvictionList, InFlightTracker, PendingResult, Task, TaskRegistry,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{start_fetch, FetchJob, FetchMode};

/// Everything a cache instance mutates, guarded by one lock.
///
/// The lock is only held for bookkeeping and never across a producer await.
pub(crate) struct CacheState<K, V> {
    pub(crate) list: EvictionList<K, V>,
    pub(crate) tasks: TaskRegistry<K, V>,
    pub(crate) in_flight: InFlightTracker<K, V>,
    /// Keys whose first fetch completed and whose entry is still listed
    pub(crate) cached: HashSet<K>,
    pub(crate) stats: CacheStats,
}

pub(crate) type SharedState<K, V> = Arc<Mutex<CacheState<K, V>>>;

// == SWR Cache ==
/// Stale-while-revalidate cache with LRU eviction.
///
/// Cloning is cheap and clones share the same entries.
pub struct SwrCache<K, V> {
    state: SharedState<K, V>,
    config: Arc<CacheConfig>,
}

impl<K, V> SwrCache<K, V>
where
    K: CacheKey,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache after validating `config`.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let state = CacheState {
            list: EvictionList::new(config.duration, config.max_entries),
            tasks: TaskRegistry::new(),
            in_flight: InFlightTracker::new(),
            cached: HashSet::new(),
            stats: CacheStats::new(),
        };

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            config: Arc::new(config),
        })
    }

    // == Set Task ==
    /// Registers the producer for `key`, replacing any previous one.
    pub fn set_task(&self, key: K, task: Task<K, V>) -> Result<()> {
        self.state.lock().tasks.set(key, task)
    }

    // == Set Task Once ==
    /// Registers the producer for `key` unless one is already registered.
    ///
    /// Returns whether the task was stored.
    pub fn set_task_once(&self, key: K, task: Task<K, V>) -> Result<bool> {
        self.state.lock().tasks.set_once(key, task)
    }

    // == Get ==
    /// Returns the value for `key`.
    ///
    /// - No cached value: runs the producer, or joins the run already in
    ///   flight, and waits for it. Producer errors are returned.
    /// - Cached value: returns it right away. A stale value also starts one
    ///   background revalidation; its errors go to the task's error handler
    ///   and never reach this call.
    pub async fn get(&self, key: K) -> Result<V> {
        key.validate()?;

        let (pending, job) = {
            let mut state = self.state.lock();
            let Some(task) = state.tasks.get(&key).cloned() else {
                return Err(CacheError::TaskNotRegistered(key.to_string()));
            };

            let served = if state.cached.contains(&key) {
                self.read_cached(&mut state, &key, &task)
            } else {
                None
            };

            if let Some((payload, revalidation)) = served {
                drop(state);
                if let Some(job) = revalidation {
                    job.spawn();
                }
                return Ok(payload);
            }

            self.fetch_first(&mut state, key, task)
        };

        if let Some(job) = job {
            job.spawn();
        }
        pending.await
    }

    // == Is Task Running ==
    /// Checks if a producer is currently in flight for `key`.
    pub fn is_task_running(&self, key: &K) -> bool {
        self.state.lock().in_flight.is_running(key)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.list.len());
        stats
    }

    /// Checks if `key` has a cached value.
    pub fn contains(&self, key: &K) -> bool {
        self.state.lock().cached.contains(key)
    }

    // == Length ==
    /// Returns the number of listed entries, placeholders included.
    pub fn len(&self) -> usize {
        self.state.lock().list.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.state.lock().list.is_empty()
    }

    /// Returns the number of registered tasks.
    pub fn task_count(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Returns the number of keys with a producer in flight.
    pub fn running_task_count(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Returns keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        self.state.lock().list.keys()
    }

    /// Returns the configuration the cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Serves a cached payload.
    ///
    /// A stale payload also yields the revalidation job to spawn once the
    /// lock is released.
    fn read_cached(
        &self,
        state: &mut CacheState<K, V>,
        key: &K,
        task: &Task<K, V>,
    ) -> Option<(V, Option<FetchJob<K, V>>)> {
        let id = state.list.promote_key(key)?;
        let payload = state.list.get(id)?.payload.clone()?;

        if !state.list.is_stale(id) {
            state.stats.record_hit();
            return Some((payload, None));
        }

        state.stats.record_stale_hit();
        if state.in_flight.is_running(key) {
            return Some((payload, None));
        }

        debug!("Serving stale value for key {}, revalidating", key);
        state.stats.record_revalidation();
        let (_, job) = start_fetch(
            &self.state,
            state,
            key.clone(),
            task.clone(),
            FetchMode::Revalidate,
        );

        Some((payload, Some(job)))
    }

    /// Joins the fetch in flight for `key`, or prepares its first fetch.
    fn fetch_first(
        &self,
        state: &mut CacheState<K, V>,
        key: K,
        task: Task<K, V>,
    ) -> (PendingResult<V>, Option<FetchJob<K, V>>) {
        state.stats.record_miss();

        if let Some(pending) = state.in_flight.peek(&key) {
            debug!("Joining in-flight fetch for key {}", key);
            state.list.promote_key(&key);
            return (pending, None);
        }

        debug!("Starting first fetch for key {}", key);
        state.stats.record_fetch();

        let CacheState {
            list,
            tasks,
            cached,
            stats,
            ..
        } = &mut *state;
        let id = list.create_placeholder(key.clone(), |evicted| {
            debug!("Evicting least recently used key {}", evicted);
            tasks.remove(evicted);
            cached.remove(evicted);
            stats.record_eviction();
        });
        let total = list.len();
        stats.set_total_entries(total);

        let (pending, job) = start_fetch(&self.state, state, key, task, FetchMode::Initial(id));
        (pending, Some(job))
    }
}

impl<K, V> Clone for SwrCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: Arc::clone(&self.config),
        }
    }
}

impl<K, V> fmt::Debug for SwrCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwrCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
