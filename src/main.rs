//! SWR Cache demo
//!
//! Walks through the cache lifecycle: a first fetch, a stale read that
//! refreshes in the background, and a failing refresh routed to an error
//! handler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swr_cache::{CacheConfig, SwrCache, Task};

/// Entry point for the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables, falling back to demo values
/// 3. Serve a value, let it go stale and read the refreshed value
/// 4. Make the refresh fail and keep serving the stale value
/// 5. Print cache statistics as JSON
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swr_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = CacheConfig::from_env().context("invalid cache configuration")?;
    if config.duration.is_none() {
        config.duration = Some(Duration::from_secs(2));
    }
    if config.max_entries.is_none() {
        config.max_entries = Some(3);
    }
    info!(
        "Configuration loaded: duration={:?}, max_entries={:?}",
        config.duration, config.max_entries
    );

    let wait = config.duration.unwrap_or_default() + Duration::from_secs(1);
    let cache: SwrCache<&'static str, u64> = SwrCache::new(config)?;

    let counter = Arc::new(AtomicU64::new(1));
    let task: Task<&'static str, u64> = {
        let counter = Arc::clone(&counter);
        Task::new(move || {
            let value = counter.load(Ordering::SeqCst);
            async move {
                info!("Producing value {}", value);
                if value == 3 {
                    anyhow::bail!("Something went wrong");
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(value)
            }
        })
        .on_error(|err, key| warn!("Logging error message \"{}\" for key \"{}\"", err, key))
    };
    cache.set_task_once("counter", task)?;

    info!("value: {}", cache.get("counter").await?);
    counter.fetch_add(1, Ordering::SeqCst);

    tokio::time::sleep(wait).await;
    info!("stale value: {}", cache.get("counter").await?);
    tokio::time::sleep(Duration::from_millis(500)).await;
    info!("refreshed value: {}", cache.get("counter").await?);

    counter.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(wait).await;
    info!("stale value: {}", cache.get("counter").await?);
    tokio::time::sleep(Duration::from_millis(100)).await;
    info!("value after failed refresh: {}", cache.get("counter").await?);

    println!("{}", serde_json::to_string_pretty(&cache.stats())?);
    Ok(())
}
