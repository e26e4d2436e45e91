//! Cache Item Module
//!
//! Defines the immutable value stored under each cache key.

use chrono::{DateTime, Utc};

// == Item ==
/// A single cached value with an optional absolute expiry.
///
/// Items are never mutated in place: writing the same key again builds a
/// new `Item` that replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    key: String,
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Item {
    // == Constructor ==
    /// Creates a new item. `None` for `expires_at` means the item never expires.
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expires_at,
        }
    }

    /// Key of the stored value.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The stored value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Absolute expiry instant, if any.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    // == Is Expired ==
    /// Checks the item against the current wall clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Checks the item against `now`.
    ///
    /// An item is expired only once `now` is strictly past its expiry; at the
    /// expiry instant itself it is still served.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => expires < now,
            None => false,
        }
    }
}
