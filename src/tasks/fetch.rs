//! Producer Fetch Task
//!
//! Runs a registered producer on its own tokio task and applies its outcome to
//! the cache once it settles. Both first fetches and background revalidations
//! go through here, so in-flight bookkeeping is released in one place.

use std::sync::Arc;

use futures::future::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::cache::{CacheKey, CacheState, EntryId, PendingResult, SharedState, Task};
use crate::error::{CacheError, Result};

/// Why a producer is being invoked.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FetchMode {
    /// First fetch, filling the given placeholder
    Initial(EntryId),
    /// Background refresh of an already cached value
    Revalidate,
}

/// A producer invocation that is recorded as in flight but not yet spawned.
///
/// Created while the cache state is locked and spawned once the lock is
/// released. Dropping it unspawned settles waiters with `TaskAborted`.
pub(crate) struct FetchJob<K, V>
where
    K: CacheKey,
    V: Clone,
{
    shared: SharedState<K, V>,
    key: K,
    task: Task<K, V>,
    mode: FetchMode,
    sender: oneshot::Sender<Result<V>>,
    guard: ReleaseGuard<K, V>,
}

/// Records `key` as in flight and prepares the job that will produce it.
///
/// Must be called with the cache state locked.
pub(crate) fn start_fetch<K, V>(
    shared: &SharedState<K, V>,
    state: &mut CacheState<K, V>,
    key: K,
    task: Task<K, V>,
    mode: FetchMode,
) -> (PendingResult<V>, FetchJob<K, V>)
where
    K: CacheKey,
    V: Clone + Send + Sync + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let aborted_key = key.to_string();
    let pending = async move {
        receiver
            .await
            .unwrap_or_else(|_| Err(CacheError::TaskAborted(aborted_key)))
    }
    .boxed()
    .shared();

    state.in_flight.begin(key.clone(), pending.clone());

    let placeholder = match mode {
        FetchMode::Initial(id) => Some(id),
        FetchMode::Revalidate => None,
    };
    let job = FetchJob {
        shared: Arc::clone(shared),
        key: key.clone(),
        task,
        mode,
        sender,
        guard: ReleaseGuard {
            shared: Some(Arc::clone(shared)),
            key,
            placeholder,
        },
    };

    (pending, job)
}

impl<K, V> FetchJob<K, V>
where
    K: CacheKey,
    V: Clone + Send + Sync + 'static,
{
    /// Spawns the job on the current tokio runtime.
    ///
    /// Must not be called with the cache state locked.
    pub(crate) fn spawn(self) {
        tokio::spawn(self.settle());
    }

    async fn settle(self) {
        let FetchJob {
            shared,
            key,
            task,
            mode,
            sender,
            guard,
        } = self;

        let outcome = match tokio::spawn(task.run()).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(error)) => Err(CacheError::task_execution(key.to_string(), error)),
            Err(join_error) => {
                warn!("Producer for key {} did not settle: {}", key, join_error);
                Err(CacheError::TaskAborted(key.to_string()))
            }
        };

        match mode {
            FetchMode::Initial(id) => {
                let mut state = shared.lock();
                match &outcome {
                    Ok(payload) => {
                        if state.list.refresh(id, payload.clone()).is_some() {
                            state.cached.insert(key.clone());
                            debug!("First fetch for key {} cached", key);
                        } else {
                            debug!("Key {} was evicted before its first fetch settled", key);
                        }
                    }
                    Err(error) => {
                        state.list.remove(id);
                        debug!("First fetch for key {} failed: {}", key, error);
                    }
                }
                let total = state.list.len();
                state.stats.set_total_entries(total);
                guard.release(&mut state);
            }
            FetchMode::Revalidate => {
                {
                    let mut state = shared.lock();
                    match &outcome {
                        Ok(payload) => {
                            let id = state
                                .cached
                                .contains(&key)
                                .then(|| state.list.id_of(&key))
                                .flatten();
                            match id {
                                Some(id) => {
                                    state.list.refresh(id, payload.clone());
                                    debug!("Revalidated key {}", key);
                                }
                                None => debug!("Dropping revalidation of evicted key {}", key),
                            }
                        }
                        Err(_) => state.stats.record_revalidation_failure(),
                    }
                    guard.release(&mut state);
                }

                if let Err(error) = &outcome {
                    if !task.report(error, &key) {
                        warn!("Revalidation of key {} failed: {}", key, error);
                    }
                }
            }
        }

        // Fails only when every waiter has dropped its handle
        let _ = sender.send(outcome);
    }
}

// == Release Guard ==
/// Ends the in-flight record of a key exactly once.
///
/// `release` is the normal exit, used while the state is already locked. If
/// the job is dropped before that, dropping the guard ends the record and
/// discards the unfilled placeholder.
struct ReleaseGuard<K, V>
where
    K: CacheKey,
    V: Clone,
{
    shared: Option<SharedState<K, V>>,
    key: K,
    placeholder: Option<EntryId>,
}

impl<K, V> ReleaseGuard<K, V>
where
    K: CacheKey,
    V: Clone,
{
    fn release(mut self, state: &mut CacheState<K, V>) {
        self.shared = None;
        state.in_flight.end(&self.key);
    }
}

impl<K, V> Drop for ReleaseGuard<K, V>
where
    K: CacheKey,
    V: Clone,
{
    fn drop(&mut self) {
        let Some(shared) = self.shared.take() else {
            return;
        };

        let mut state = shared.lock();
        state.in_flight.end(&self.key);
        if let Some(id) = self.placeholder {
            if !state.cached.contains(&self.key) {
                state.list.remove(id);
            }
        }
        warn!("Fetch for key {} was dropped before settling", self.key);
    }
}
