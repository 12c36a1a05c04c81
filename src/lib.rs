// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-regexp)

//! # `regexp` — Regular-Expression Predicate for `DuckDB`
//!
//! Adds a `regexp(pattern, text)` predicate so queries can filter and join
//! rows by regular-expression match. Compiled patterns are memoized in a
//! process-wide [`PatternCache`], so a pattern is compiled once per process no
//! matter how many rows it is tested against.
//!
//! ## Functions
//!
//! | Function | Type | Description |
//! |----------|------|-------------|
//! | `regexp(pattern, text)` | Scalar | True if `text` matches `pattern`; NULL if either is NULL |
//! | `regexp_cache_size()` | Scalar | Number of compiled patterns cached |
//! | `regexp_cache_clear()` | Scalar | Drops all cached patterns, returns how many |
//!
//! ## Installation
//!
//! ```sql
//! LOAD 'regexp.duckdb_extension';
//!
//! SELECT p.category, i.item
//! FROM patterns p
//! JOIN items i ON regexp(p.pattern, i.item);
//! ```
//!
//! ## Cache growth
//!
//! The cache is unbounded by default and grows with the number of distinct
//! patterns seen. Set `REGEXP_CACHE_CAPACITY` before loading the extension to
//! bound it (see [`config`]), or call `regexp_cache_clear()` periodically.
//!
//! ## Rust usage
//!
//! ```
//! use regexp::{PatternCache, Predicate};
//! use std::sync::Arc;
//!
//! let predicate = Predicate::new(Arc::new(PatternCache::new()));
//! assert_eq!(predicate.evaluate("^ap", "apple").unwrap(), 1);
//! assert_eq!(predicate.evaluate("^ap", "banana").unwrap(), 0);
//! assert!(predicate.evaluate("[", "anything").is_err());
//! assert_eq!(predicate.cache().size(), 1);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod predicate;

mod ffi;

pub use cache::{CacheStats, PatternCache};
pub use config::CacheConfig;
pub use error::RegexpError;
pub use predicate::Predicate;

use std::sync::Arc;

/// Registers the `regexp` functions on a raw `DuckDB` connection.
///
/// All functions share `predicate`'s cache. This crate links `libduckdb-sys`
/// with `loadable-extension`, so its C calls go through function pointers
/// that exist only after `duckdb_rs_extension_api_init` has run. Call this
/// from inside a loadable extension's init (as [`regexp_init_c_api`] does),
/// not from a host that embeds `DuckDB` directly.
///
/// # Safety
///
/// `con` must be a valid `duckdb_connection` handle, and
/// `duckdb_rs_extension_api_init` must have succeeded in this process.
pub unsafe fn register(
    con: libduckdb_sys::duckdb_connection,
    predicate: &Predicate,
) -> Result<(), RegexpError> {
    ffi::register_all_raw(con, predicate)
}

/// Builds the predicate every loading database registers with.
///
/// All loads share the process-wide cache; `config` only takes effect on the
/// load that creates it.
fn extension_predicate(config: CacheConfig) -> Predicate {
    Predicate::new(Arc::clone(PatternCache::init_shared(config)))
}

/// Extension entry point called by `DuckDB` when the extension is loaded.
///
/// This is a hand-written C entry point that bypasses `duckdb::Connection` entirely,
/// avoiding fragile struct layout assumptions. Instead, we obtain the raw
/// `duckdb_connection` directly via the C API (`duckdb_connect`), register all
/// functions, and disconnect.
///
/// # Safety
///
/// Called by `DuckDB`'s extension loading mechanism via FFI.
/// `info` and `access` must be valid pointers provided by `DuckDB`.
#[no_mangle]
pub unsafe extern "C" fn regexp_init_c_api(
    info: libduckdb_sys::duckdb_extension_info,
    access: *const libduckdb_sys::duckdb_extension_access,
) -> bool {
    match regexp_init_internal(info, access) {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "regexp extension failed to load");
            let Some(set_error) = (*access).set_error else {
                return false;
            };
            let error_c_string = std::ffi::CString::new(e.to_string());
            if let Ok(err) = error_c_string {
                set_error(info, err.as_ptr());
            } else {
                let fallback = c"Extension init failed and could not allocate error string";
                set_error(info, fallback.as_ptr());
            }
            false
        }
    }
}

unsafe fn regexp_init_internal(
    info: libduckdb_sys::duckdb_extension_info,
    access: *const libduckdb_sys::duckdb_extension_access,
) -> Result<bool, Box<dyn std::error::Error>> {
    // Initialize the extension API function pointers (populates global atomic statics).
    // "v1.2.0" matches the default minimum version used by duckdb-loadable-macros.
    let have_api = libduckdb_sys::duckdb_rs_extension_api_init(info, access, "v1.2.0")
        .map_err(|e| -> Box<dyn std::error::Error> { e.into() })?;

    if !have_api {
        // API version mismatch: DuckDB is too old for this extension.
        return Ok(false);
    }

    let config = CacheConfig::from_env()?;
    let predicate = extension_predicate(config);

    let get_database = (*access)
        .get_database
        .ok_or("DuckDB did not provide get_database in the extension access struct")?;
    let db: libduckdb_sys::duckdb_database = *get_database(info);

    // Open a raw connection for function registration.
    let mut raw_con: libduckdb_sys::duckdb_connection = std::ptr::null_mut();
    let rc = libduckdb_sys::duckdb_connect(db, &mut raw_con);
    if rc != libduckdb_sys::DuckDBSuccess {
        return Err("Failed to open DuckDB connection for extension registration".into());
    }

    let registered = register(raw_con, &predicate);

    // Clean up the registration connection before reporting the outcome.
    libduckdb_sys::duckdb_disconnect(&mut raw_con);

    registered?;
    tracing::debug!(
        capacity = ?predicate.cache().capacity(),
        "regexp extension loaded"
    );
    Ok(true)
}
