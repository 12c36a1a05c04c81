// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-regexp)

//! Error type shared by the cache, the predicate and the registration glue.

use thiserror::Error;

/// Errors produced by the `regexp` extension.
///
/// Matching itself cannot fail once a pattern is compiled, so every variant
/// describes either a bad pattern, a bad argument, or a failure outside the
/// query path (registration, configuration).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegexpError {
    /// The pattern is not a valid regular expression. The message is the
    /// `regex` crate's own, passed through unchanged.
    #[error(transparent)]
    Compile(#[from] regex::Error),

    /// An argument could not be coerced to a string.
    #[error("regexp() argument {position} is invalid: {reason}")]
    InvalidArgument {
        /// 1-based argument position (1 = pattern, 2 = text).
        position: usize,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// The predicate was called with the wrong number of arguments.
    #[error("regexp() expects {expected} arguments, got {actual}")]
    Arity {
        /// Number of arguments the predicate takes.
        expected: usize,
        /// Number of arguments supplied.
        actual: usize,
    },

    /// `DuckDB` rejected a function registration.
    #[error("failed to register function `{function}` with DuckDB")]
    Registration {
        /// SQL name of the function that failed to register.
        function: &'static str,
    },

    /// A configuration value could not be parsed.
    #[error("invalid value {value:?} for {variable}: {reason}")]
    Config {
        /// Name of the configuration variable.
        variable: &'static str,
        /// The rejected raw value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}
