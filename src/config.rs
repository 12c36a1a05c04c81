// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-regexp)

//! Cache configuration.
//!
//! The cache is unbounded unless a capacity is configured. When the extension
//! is loaded by `DuckDB`, the capacity is read from the environment:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `REGEXP_CACHE_CAPACITY` | Maximum cached patterns. Unset, empty or `0` means unbounded. |

use crate::error::RegexpError;
use std::num::NonZeroUsize;

/// Environment variable holding the cache capacity.
pub const CAPACITY_VAR: &str = "REGEXP_CACHE_CAPACITY";

/// Configuration for a [`PatternCache`](crate::cache::PatternCache).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct CacheConfig {
    /// Maximum number of compiled patterns kept. `None` means unbounded.
    pub capacity: Option<NonZeroUsize>,
}

impl CacheConfig {
    /// Unbounded cache: entries are only dropped by an explicit clear.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { capacity: None }
    }

    /// Cache bounded to `capacity` entries. A capacity of zero is unbounded.
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: NonZeroUsize::new(capacity),
        }
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, RegexpError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RegexpError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(raw) = lookup(CAPACITY_VAR) else {
            return Ok(Self::unbounded());
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::unbounded());
        }

        match trimmed.parse::<usize>() {
            Ok(capacity) => Ok(Self::with_capacity(capacity)),
            Err(e) => Err(RegexpError::Config {
                variable: CAPACITY_VAR,
                value: raw,
                reason: e.to_string(),
            }),
        }
    }
}
