//! Cache Key Module
//!
//! Category prefixes and key construction helpers.

use sha2::{Digest, Sha256};

// == Category Prefixes ==
pub const PRODUCT: &str = "product:";
pub const PRICE: &str = "price:";
pub const SESSION: &str = "session:";
pub const SEARCH: &str = "search:";
pub const RECOMMENDATION: &str = "rec:";
pub const USER: &str = "user:";
pub const ORDER: &str = "order:";
pub const INVENTORY: &str = "inventory:";

// == Build Key ==
/// Concatenates prefix and key verbatim.
///
/// No escaping or collision detection is performed: a wrong prefix silently
/// addresses the wrong category.
pub fn build_key(key: &str, prefix: &str) -> String {
    let mut full = String::with_capacity(prefix.len() + key.len());
    full.push_str(prefix);
    full.push_str(key);
    full
}

// == Search Key ==
/// Hashes a search query into a fixed-length key identifier.
pub fn search_key(query: &str) -> String {
    hex::encode(Sha256::digest(query.as_bytes()))
}

// == Escape Glob ==
/// Escapes glob metacharacters so the input matches only itself inside a
/// key pattern.
pub fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_key_concatenates() {
        assert_eq!(build_key("SKU1", PRODUCT), "product:SKU1");
        assert_eq!(build_key("plain", ""), "plain");
    }

    #[test]
    fn test_build_key_does_not_escape() {
        assert_eq!(build_key("a:b*c", SESSION), "session:a:b*c");
    }

    #[test]
    fn test_search_key_is_stable_and_bounded() {
        let a = search_key("red shoes");
        let b = search_key("red shoes");
        let long = search_key(&"x".repeat(10_000));

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(long.len(), 64);
        assert_ne!(a, search_key("red shoes "));
    }

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("user42"), "user42");
        assert_eq!(escape_glob("a*b?[c]"), "a\\*b\\?\\[c\\]");
    }
}
