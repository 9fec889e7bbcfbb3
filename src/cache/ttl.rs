//! TTL Policy Module
//!
//! Maps key categories to their default expiry.

use std::time::Duration;

use serde::Serialize;

use crate::cache::keys;

// == TTL Policy ==
/// Default TTL in seconds for each key category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TtlPolicy {
    /// Keys without a recognised category prefix
    pub default: u64,
    pub products: u64,
    pub prices: u64,
    pub sessions: u64,
    pub search: u64,
    pub recommendations: u64,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            default: 3600,
            products: 1800,
            prices: 300,
            sessions: 86400,
            search: 600,
            recommendations: 1800,
        }
    }
}

impl TtlPolicy {
    // == TTL For Key ==
    /// Resolves the category default for a fully built key.
    pub fn ttl_for_key(&self, key: &str) -> Duration {
        let secs = if key.starts_with(keys::PRODUCT) {
            self.products
        } else if key.starts_with(keys::PRICE) {
            self.prices
        } else if key.starts_with(keys::SESSION) {
            self.sessions
        } else if key.starts_with(keys::SEARCH) {
            self.search
        } else if key.starts_with(keys::RECOMMENDATION) {
            self.recommendations
        } else {
            self.default
        };
        Duration::from_secs(secs)
    }

    // == Resolve ==
    /// Returns the override when given, otherwise the category default.
    pub fn resolve(&self, key: &str, ttl: Option<Duration>) -> Duration {
        ttl.unwrap_or_else(|| self.ttl_for_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_defaults() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl_for_key("product:1"), Duration::from_secs(1800));
        assert_eq!(policy.ttl_for_key("price:1"), Duration::from_secs(300));
        assert_eq!(policy.ttl_for_key("session:abc"), Duration::from_secs(86400));
        assert_eq!(policy.ttl_for_key("search:ff00"), Duration::from_secs(600));
        assert_eq!(policy.ttl_for_key("rec:42"), Duration::from_secs(1800));
    }

    #[test]
    fn test_unknown_prefix_uses_default() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl_for_key("order:9"), Duration::from_secs(3600));
        assert_eq!(policy.ttl_for_key("user:9"), Duration::from_secs(3600));
        assert_eq!(policy.ttl_for_key("x"), Duration::from_secs(3600));
    }

    #[test]
    fn test_override_wins() {
        let policy = TtlPolicy::default();
        let ttl = policy.resolve("product:1", Some(Duration::from_secs(5)));
        assert_eq!(ttl, Duration::from_secs(5));
        assert_eq!(policy.resolve("product:1", None), Duration::from_secs(1800));
    }

    #[test]
    fn test_custom_policy() {
        let policy = TtlPolicy {
            prices: 30,
            ..TtlPolicy::default()
        };
        assert_eq!(policy.ttl_for_key("price:1"), Duration::from_secs(30));
    }
}
