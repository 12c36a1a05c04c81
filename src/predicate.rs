// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-regexp)

//! `regexp` — Scalar predicate testing a string against a regular expression.
//!
//! # SQL Usage
//!
//! ```sql
//! SELECT name FROM users WHERE regexp('^John', name);
//!
//! SELECT p.category, i.item
//! FROM patterns AS p
//! JOIN items AS i ON regexp(p.pattern, i.item);
//! ```
//!
//! The pattern is always the first argument and the text the second.
//!
//! # Semantics
//!
//! - Returns true if the pattern matches anywhere in the text (use `^`/`$` to
//!   anchor). Syntax is that of the [`regex`] crate.
//! - NULL in either argument yields NULL.
//! - A malformed pattern fails the query with the compiler's error message;
//!   it is never treated as "no match".

use crate::cache::PatternCache;
use crate::error::RegexpError;
use std::sync::Arc;

/// SQL name of the predicate.
pub const FUNCTION_NAME: &str = "regexp";

/// Number of arguments the predicate takes: `(pattern, text)`.
pub const ARITY: usize = 2;

/// The `regexp` predicate bound to a pattern cache.
///
/// Cheap to clone; clones share the same cache.
#[derive(Debug, Clone)]
pub struct Predicate {
    cache: Arc<PatternCache>,
}

impl Predicate {
    /// Creates a predicate that compiles through `cache`.
    #[must_use]
    pub const fn new(cache: Arc<PatternCache>) -> Self {
        Self { cache }
    }

    /// The cache this predicate compiles through.
    #[must_use]
    pub const fn cache(&self) -> &Arc<PatternCache> {
        &self.cache
    }

    /// Returns true if `text` matches `pattern`.
    pub fn is_match(&self, pattern: &str, text: &str) -> Result<bool, RegexpError> {
        let matcher = self.cache.get_or_compile(pattern)?;
        Ok(matcher.is_match(text))
    }

    /// Returns 1 if `text` matches `pattern`, 0 otherwise.
    pub fn evaluate(&self, pattern: &str, text: &str) -> Result<i32, RegexpError> {
        self.is_match(pattern, text).map(i32::from)
    }

    /// Evaluates one row of raw engine arguments.
    ///
    /// `None` stands for SQL NULL and short-circuits to a NULL result without
    /// touching the cache. Both values must be valid UTF-8.
    pub fn evaluate_row(
        &self,
        pattern: Option<&[u8]>,
        text: Option<&[u8]>,
    ) -> Result<Option<bool>, RegexpError> {
        let (Some(pattern), Some(text)) = (pattern, text) else {
            return Ok(None);
        };
        let pattern = coerce_argument(1, pattern)?;
        let text = coerce_argument(2, text)?;
        self.is_match(pattern, text).map(Some)
    }
}

impl Default for Predicate {
    /// A predicate bound to [`PatternCache::shared`].
    fn default() -> Self {
        Self::new(Arc::clone(PatternCache::shared()))
    }
}

/// Rejects any argument count other than [`ARITY`].
pub fn check_arity(actual: usize) -> Result<(), RegexpError> {
    if actual == ARITY {
        Ok(())
    } else {
        Err(RegexpError::Arity {
            expected: ARITY,
            actual,
        })
    }
}

fn coerce_argument(position: usize, bytes: &[u8]) -> Result<&str, RegexpError> {
    std::str::from_utf8(bytes).map_err(|_| RegexpError::InvalidArgument {
        position,
        reason: "not valid UTF-8",
    })
}
