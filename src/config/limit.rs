// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::fmt;
use std::num::NonZeroUsize;

use crate::config::consts::UNBOUNDED_LITERAL;
use crate::errors::ConfigError;

/// Maximum number of units allowed in flight at once.
///
/// A limit is either a positive count or unbounded. Zero is not representable:
/// [`Limit::new`] rejects it, which is how every operation taking a limit
/// reports a bad concurrency option before doing any work.
///
/// In config files a limit is written as a positive integer or as the string
/// `"unbounded"`:
///
/// ```yaml
/// concurrency: 4
/// queue:
///   payload: unbounded
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "LimitRepr")]
pub struct Limit(Option<NonZeroUsize>);

impl Limit {
    /// One unit at a time.
    pub const SERIES: Limit = Limit(Some(NonZeroUsize::MIN));
    /// No cap on in-flight units.
    pub const UNBOUNDED: Limit = Limit(None);

    /// Create a bounded limit.
    ///
    /// ```
    /// use the_cadence::config::Limit;
    ///
    /// assert_eq!(Limit::new(3).unwrap().get(), 3);
    /// assert!(Limit::new(0).is_err());
    /// ```
    pub fn new(count: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(count)
            .map(|n| Limit(Some(n)))
            .ok_or(ConfigError::ZeroLimit)
    }

    /// The cap as a plain count; unbounded reads as `usize::MAX`.
    pub fn get(self) -> usize {
        self.0.map_or(usize::MAX, NonZeroUsize::get)
    }

    pub fn is_unbounded(self) -> bool {
        self.0.is_none()
    }
}

impl Default for Limit {
    fn default() -> Self {
        Limit::UNBOUNDED
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(n) => write!(f, "{}", n),
            None => f.write_str(UNBOUNDED_LITERAL),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LimitRepr {
    Count(usize),
    Keyword(String),
}

impl TryFrom<LimitRepr> for Limit {
    type Error = ConfigError;

    fn try_from(repr: LimitRepr) -> Result<Self, Self::Error> {
        match repr {
            LimitRepr::Count(n) => Limit::new(n),
            LimitRepr::Keyword(word) if word.eq_ignore_ascii_case(UNBOUNDED_LITERAL) => {
                Ok(Limit::UNBOUNDED)
            }
            LimitRepr::Keyword(word) => Err(ConfigError::InvalidLimit(word)),
        }
    }
}
