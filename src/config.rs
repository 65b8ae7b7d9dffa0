//! Configuration Module
//!
//! Handles construction options of a cache instance, either built in code or
//! loaded from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// `None` means unbounded for both options. The configuration is immutable
/// once handed to a cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheConfig {
    /// Age after which a cached value is served stale and refreshed
    pub duration: Option<Duration>,
    /// Maximum number of entries the cache can hold
    pub max_entries: Option<usize>,
}

impl CacheConfig {
    /// Creates an unbounded configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the freshness window.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Sets the freshness window in whole seconds.
    pub fn with_duration_secs(self, secs: u64) -> Self {
        self.with_duration(Duration::from_secs(secs))
    }

    /// Sets the capacity.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Checks option ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == Some(0) {
            return Err(CacheError::InvalidConfig(
                "max_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DURATION` - Freshness window in seconds, fractions allowed (default: unbounded)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: unbounded)
    ///
    /// Malformed or out-of-range values are an `InvalidConfig` error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let duration = match lookup("CACHE_DURATION") {
            Some(raw) => Some(parse_duration(&raw)?),
            None => None,
        };
        let max_entries = match lookup("CACHE_MAX_ENTRIES") {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| {
                CacheError::InvalidConfig(format!(
                    "CACHE_MAX_ENTRIES must be a positive integer, got {raw:?}"
                ))
            })?),
            None => None,
        };

        let config = Self {
            duration,
            max_entries,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    let secs: f64 = raw.trim().parse().map_err(|_| {
        CacheError::InvalidConfig(format!("CACHE_DURATION must be a number, got {raw:?}"))
    })?;
    Duration::try_from_secs_f64(secs).map_err(|_| {
        CacheError::InvalidConfig(format!(
            "CACHE_DURATION must be a non-negative number, got {raw:?}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.duration, None);
        assert_eq!(config.max_entries, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::new().with_duration_secs(2).with_max_entries(3);
        assert_eq!(config.duration, Some(Duration::from_secs(2)));
        assert_eq!(config.max_entries, Some(3));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = CacheConfig::new().with_max_entries(0);
        assert!(matches!(config.validate(), Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        let config = CacheConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_config_from_lookup_values() {
        let config = CacheConfig::from_lookup(lookup_from(&[
            ("CACHE_DURATION", "1.5"),
            ("CACHE_MAX_ENTRIES", "10"),
        ]))
        .unwrap();
        assert_eq!(config.duration, Some(Duration::from_millis(1500)));
        assert_eq!(config.max_entries, Some(10));
    }

    #[test]
    fn test_config_from_lookup_rejects_bad_values() {
        for vars in [
            [("CACHE_DURATION", "-1")],
            [("CACHE_DURATION", "soon")],
            [("CACHE_MAX_ENTRIES", "0")],
            [("CACHE_MAX_ENTRIES", "-3")],
        ] {
            let result = CacheConfig::from_lookup(lookup_from(&vars));
            assert!(
                matches!(result, Err(CacheError::InvalidConfig(_))),
                "{vars:?} should be rejected"
            );
        }
    }
}
