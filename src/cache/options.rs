//! Per-call options for cache operations.

use std::time::Duration;

// == Cache Options ==
/// Options accepted by every keyed operation.
///
/// Defaults: values are JSON encoded, no prefix, category TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Encode on write and decode on read as JSON; raw strings otherwise
    pub json: bool,
    /// Category prefix prepended to the key
    pub prefix: String,
    /// Expiry override; the category default applies when None
    pub ttl: Option<Duration>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            json: true,
            prefix: String::new(),
            ttl: None,
        }
    }
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with the given category prefix.
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self::default().with_prefix(prefix)
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Store and return values as raw strings.
    pub fn raw(mut self) -> Self {
        self.json = false;
        self
    }
}
