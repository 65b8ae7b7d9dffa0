//! Task Registry Module
//!
//! Maps each cache key to the producer that computes its value.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::cache::CacheKey;
use crate::error::{CacheError, Result};

type Producer<V> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync>;
type ErrorHandler<K> = Arc<dyn Fn(&CacheError, &K) + Send + Sync>;

// == Task ==
/// A registered producer plus its optional revalidation error handler.
///
/// ```
/// use swr_cache::Task;
///
/// let task: Task<&str, String> = Task::new(|| async { Ok("payload".to_string()) })
///     .on_error(|err, key| eprintln!("refresh of {key} failed: {err}"));
/// ```
pub struct Task<K, V> {
    producer: Producer<V>,
    error_handler: Option<ErrorHandler<K>>,
}

impl<K: 'static, V: 'static> Task<K, V> {
    /// Wraps a zero-argument async producer.
    pub fn new<F, Fut>(producer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        Self {
            producer: Arc::new(move || producer().boxed()),
            error_handler: None,
        }
    }

    /// Sets the handler called with `(error, key)` when a background
    /// revalidation fails.
    pub fn on_error<H>(mut self, handler: H) -> Self
    where
        H: Fn(&CacheError, &K) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Invokes the producer.
    pub fn run(&self) -> BoxFuture<'static, anyhow::Result<V>> {
        (self.producer)()
    }

    /// Routes a revalidation failure to the error handler.
    ///
    /// Returns false when no handler is registered.
    pub fn report(&self, error: &CacheError, key: &K) -> bool {
        match &self.error_handler {
            Some(handler) => {
                handler(error, key);
                true
            }
            None => false,
        }
    }

    /// Checks if revalidation errors are routed to a handler.
    pub fn has_error_handler(&self) -> bool {
        self.error_handler.is_some()
    }
}

impl<K, V> Clone for Task<K, V> {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
            error_handler: self.error_handler.clone(),
        }
    }
}

impl<K, V> fmt::Debug for Task<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("has_error_handler", &self.error_handler.is_some())
            .finish_non_exhaustive()
    }
}

// == Task Registry ==
/// Holds at most one task per key.
#[derive(Debug)]
pub struct TaskRegistry<K, V> {
    tasks: HashMap<K, Task<K, V>>,
}

impl<K: CacheKey, V> TaskRegistry<K, V> {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    // == Set ==
    /// Registers a task, replacing any previous registration for the key.
    pub fn set(&mut self, key: K, task: Task<K, V>) -> Result<()> {
        key.validate()?;
        self.tasks.insert(key, task);
        Ok(())
    }

    // == Set Once ==
    /// Registers a task only if the key has none yet.
    ///
    /// Returns whether the task was stored.
    pub fn set_once(&mut self, key: K, task: Task<K, V>) -> Result<bool> {
        key.validate()?;
        if self.tasks.contains_key(&key) {
            return Ok(false);
        }
        self.tasks.insert(key, task);
        Ok(true)
    }

    // == Remove ==
    pub fn remove(&mut self, key: &K) -> Option<Task<K, V>> {
        self.tasks.remove(key)
    }

    // == Get ==
    pub fn get(&self, key: &K) -> Option<&Task<K, V>> {
        self.tasks.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.tasks.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<K: CacheKey, V> Default for TaskRegistry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
