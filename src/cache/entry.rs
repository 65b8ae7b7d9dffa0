//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and their staleness rule.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cache entry with payload and refresh metadata.
#[derive(Debug, Clone)]
pub struct Entry<K, V> {
    /// Key the entry is indexed under
    pub key: K,
    /// Last successfully produced value, None while awaiting the first fetch
    pub payload: Option<V>,
    /// Time of the last successful fetch (placeholder creation time before that)
    pub updated_at: Instant,
}

impl<K, V> Entry<K, V> {
    // == Constructor ==
    /// Creates an entry that has no payload yet.
    pub fn placeholder(key: K) -> Self {
        Self {
            key,
            payload: None,
            updated_at: Instant::now(),
        }
    }

    // == Refresh ==
    /// Stores a new payload and resets the refresh timestamp.
    pub fn refresh(&mut self, payload: V) {
        self.payload = Some(payload);
        self.updated_at = Instant::now();
    }

    // == Age ==
    /// Returns the age in whole seconds, rounded half up.
    pub fn age_secs(&self) -> u64 {
        rounded_secs(self.updated_at.elapsed())
    }

    // == Is Stale ==
    /// Checks if the entry should be revalidated.
    ///
    /// An entry is stale once its rounded age in seconds reaches `duration`.
    /// Without a duration an entry never becomes stale.
    pub fn is_stale(&self, duration: Option<Duration>) -> bool {
        match duration {
            Some(duration) => self.age_secs() as f64 >= duration.as_secs_f64(),
            None => false,
        }
    }
}

// == Utility Functions ==
/// Rounds an elapsed time to whole seconds, halves rounding up.
pub fn rounded_secs(elapsed: Duration) -> u64 {
    let millis = elapsed.as_millis();
    ((millis + 500) / 1000) as u64
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounded_secs() {
        assert_eq!(rounded_secs(Duration::from_millis(0)), 0);
        assert_eq!(rounded_secs(Duration::from_millis(499)), 0);
        assert_eq!(rounded_secs(Duration::from_millis(500)), 1);
        assert_eq!(rounded_secs(Duration::from_millis(1499)), 1);
        assert_eq!(rounded_secs(Duration::from_millis(2500)), 3);
    }

    #[tokio::test]
    async fn test_placeholder_has_no_payload() {
        let entry: Entry<&str, String> = Entry::placeholder("k");
        assert_eq!(entry.key, "k");
        assert!(entry.payload.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_staleness() {
        let mut entry = Entry::placeholder("k");
        entry.refresh("v1");
        let duration = Some(Duration::from_secs(2));

        assert!(!entry.is_stale(duration));

        tokio::time::advance(Duration::from_millis(1400)).await;
        assert!(!entry.is_stale(duration));

        // 1.5s rounds up to 2s
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(entry.is_stale(duration));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_resets_age() {
        let mut entry = Entry::placeholder("k");
        entry.refresh(1);

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(entry.age_secs(), 3);

        entry.refresh(2);
        assert_eq!(entry.age_secs(), 0);
        assert_eq!(entry.payload, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_duration_never_stale() {
        let mut entry = Entry::placeholder("k");
        entry.refresh(());

        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert!(!entry.is_stale(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_always_stale() {
        let mut entry = Entry::placeholder("k");
        entry.refresh(());
        assert!(entry.is_stale(Some(Duration::ZERO)));
    }
}
