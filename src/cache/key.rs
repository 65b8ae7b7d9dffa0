//! Cache Key Module
//!
//! Defines which types can identify a cached value and how they are validated.

use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::Arc;

use crate::cache::MAX_KEY_LENGTH;
use crate::error::{CacheError, Result};

// == Cache Key ==
/// A type usable as a cache key.
///
/// Implemented for string-like types and the integer types. String keys must
/// be non-empty and at most [`MAX_KEY_LENGTH`] bytes; integer keys are always
/// valid.
pub trait CacheKey: Hash + Eq + Clone + Display + Debug + Send + Sync + 'static {
    /// Checks the key, returning `CacheError::InvalidKey` when it is rejected.
    fn validate(&self) -> Result<()>;
}

fn validate_str(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("Key must not be empty".to_string()));
    }

    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }

    Ok(())
}

impl CacheKey for String {
    fn validate(&self) -> Result<()> {
        validate_str(self)
    }
}

impl CacheKey for &'static str {
    fn validate(&self) -> Result<()> {
        validate_str(self)
    }
}

impl CacheKey for Arc<str> {
    fn validate(&self) -> Result<()> {
        validate_str(self)
    }
}

macro_rules! impl_integer_key {
    ($($ty:ty),*) => {
        $(
            impl CacheKey for $ty {
                fn validate(&self) -> Result<()> {
                    Ok(())
                }
            }
        )*
    };
}

impl_integer_key!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
