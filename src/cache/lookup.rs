//! Lookup Result Module
//!
//! Distinguishes a hit, a miss and a failed read internally while letting
//! callers collapse the latter two into "absent".

use crate::error::CacheError;

// == Lookup ==
/// Outcome of a single cache read.
#[derive(Debug)]
pub enum Lookup<T> {
    /// Key present
    Hit(T),
    /// Key absent
    Miss,
    /// Read failed; counted as an error, seen by callers as absent
    Error(CacheError),
}

impl<T> Lookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Lookup::Miss)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Lookup::Error(_))
    }

    /// Best-effort view: misses and errors both become None.
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss | Lookup::Error(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Hit(value) => Lookup::Hit(f(value)),
            Lookup::Miss => Lookup::Miss,
            Lookup::Error(err) => Lookup::Error(err),
        }
    }
}
