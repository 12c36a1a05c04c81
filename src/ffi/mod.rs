// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-regexp)

//! FFI bindings for registering the `regexp` functions with `DuckDB`.
//!
//! This module bridges the pure Rust [`Predicate`] and [`PatternCache`] with
//! `DuckDB`'s C Extension API.
//!
//! # Architecture
//!
//! Every function is registered as a scalar function whose extra-info pointer
//! holds a heap-allocated [`Predicate`]. All predicates registered from one
//! call share a single [`PatternCache`] through their `Arc`, so
//! `regexp_cache_size()` and `regexp_cache_clear()` observe exactly the cache
//! that `regexp()` fills. `DuckDB` frees each extra-info box through
//! [`destroy_predicate`] when the function is dropped from the catalog.
//!
//! [`PatternCache`]: crate::cache::PatternCache

pub mod cache;
pub mod regexp;

use crate::error::RegexpError;
use crate::predicate::Predicate;
use libduckdb_sys::*;
use std::ffi::{c_void, CString};

/// Callback signature of a `DuckDB` scalar function.
type ScalarCallback =
    unsafe extern "C" fn(duckdb_function_info, duckdb_data_chunk, duckdb_vector);

/// Registers all `regexp` functions using a raw `duckdb_connection` handle.
///
/// The functions share the cache held by `predicate`. Stops at the first
/// function `DuckDB` rejects.
///
/// # Safety
///
/// The caller must ensure `raw_con` is a valid `duckdb_connection` handle.
pub unsafe fn register_all_raw(
    raw_con: duckdb_connection,
    predicate: &Predicate,
) -> Result<(), RegexpError> {
    unsafe {
        regexp::register_regexp(raw_con, predicate)?;
        cache::register_cache_size(raw_con, predicate)?;
        cache::register_cache_clear(raw_con, predicate)?;
    }
    Ok(())
}

/// Shape of a scalar function to register.
struct ScalarDef {
    name: &'static str,
    parameters: &'static [DUCKDB_TYPE],
    return_type: DUCKDB_TYPE,
    volatile: bool,
    callback: ScalarCallback,
}

/// Creates, registers and destroys one scalar function.
///
/// # Safety
///
/// Requires a valid `duckdb_connection` handle.
unsafe fn register_scalar(
    con: duckdb_connection,
    def: &ScalarDef,
    predicate: &Predicate,
) -> Result<(), RegexpError> {
    let name = CString::new(def.name).map_err(|_| RegexpError::Registration {
        function: def.name,
    })?;

    unsafe {
        let mut func = duckdb_create_scalar_function();
        duckdb_scalar_function_set_name(func, name.as_ptr());

        for &type_id in def.parameters {
            let param_type = duckdb_create_logical_type(type_id);
            duckdb_scalar_function_add_parameter(func, param_type);
            duckdb_destroy_logical_type(&mut { param_type });
        }

        let ret_type = duckdb_create_logical_type(def.return_type);
        duckdb_scalar_function_set_return_type(func, ret_type);
        duckdb_destroy_logical_type(&mut { ret_type });

        if def.volatile {
            duckdb_scalar_function_set_volatile(func);
        }

        // Ownership of the box passes to DuckDB, which calls destroy_predicate.
        let extra = Box::into_raw(Box::new(predicate.clone()));
        duckdb_scalar_function_set_extra_info(
            func,
            extra as *mut c_void,
            Some(destroy_predicate),
        );
        duckdb_scalar_function_set_function(func, Some(def.callback));

        let result = duckdb_register_scalar_function(con, func);
        duckdb_destroy_scalar_function(&mut func);

        if result != DuckDBSuccess {
            tracing::error!(
                function = def.name,
                "DuckDB rejected function registration"
            );
            return Err(RegexpError::Registration {
                function: def.name,
            });
        }
    }

    tracing::debug!(function = def.name, "registered scalar function");
    Ok(())
}

/// Returns the [`Predicate`] stored as the function's extra info.
///
/// # Safety
///
/// `info` must belong to a function registered through [`register_scalar`],
/// and the returned reference must not outlive the callback.
unsafe fn predicate_from_info<'a>(info: duckdb_function_info) -> &'a Predicate {
    unsafe { &*(duckdb_scalar_function_get_extra_info(info) as *const Predicate) }
}

/// Fails the current query with `err`'s message.
///
/// # Safety
///
/// `info` must be the function info passed to the running callback.
unsafe fn set_error(info: duckdb_function_info, err: &RegexpError) {
    unsafe {
        if let Ok(message) = CString::new(err.to_string()) {
            duckdb_scalar_function_set_error(info, message.as_ptr());
        } else {
            let fallback = c"regexp: error message contained a NUL byte";
            duckdb_scalar_function_set_error(info, fallback.as_ptr());
        }
    }
}

// SAFETY: `data` was produced by `Box::into_raw(Box<Predicate>)` in
// `register_scalar`. DuckDB calls this exactly once per extra-info pointer.
unsafe extern "C" fn destroy_predicate(data: *mut c_void) {
    unsafe {
        if !data.is_null() {
            drop(Box::from_raw(data as *mut Predicate));
        }
    }
}
