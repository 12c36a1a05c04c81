// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-regexp)

//! FFI registration for the cache management functions.
//!
//! `regexp_cache_size()` and `regexp_cache_clear()` let long-running
//! processes watch and cap the pattern cache from SQL. Both are volatile so
//! `DuckDB` never folds them into constants.

use super::{predicate_from_info, register_scalar, ScalarDef};
use crate::error::RegexpError;
use crate::predicate::Predicate;
use libduckdb_sys::*;

/// Registers `regexp_cache_size() -> BIGINT`.
///
/// # Safety
///
/// Requires a valid `duckdb_connection` handle.
pub unsafe fn register_cache_size(
    con: duckdb_connection,
    predicate: &Predicate,
) -> Result<(), RegexpError> {
    let def = ScalarDef {
        name: "regexp_cache_size",
        parameters: &[],
        return_type: DUCKDB_TYPE_DUCKDB_TYPE_BIGINT,
        volatile: true,
        callback: cache_size_invoke,
    };
    unsafe { register_scalar(con, &def, predicate) }
}

/// Registers `regexp_cache_clear() -> BIGINT`, returning the number of
/// patterns dropped.
///
/// # Safety
///
/// Requires a valid `duckdb_connection` handle.
pub unsafe fn register_cache_clear(
    con: duckdb_connection,
    predicate: &Predicate,
) -> Result<(), RegexpError> {
    let def = ScalarDef {
        name: "regexp_cache_clear",
        parameters: &[],
        return_type: DUCKDB_TYPE_DUCKDB_TYPE_BIGINT,
        volatile: true,
        callback: cache_clear_invoke,
    };
    unsafe { register_scalar(con, &def, predicate) }
}

fn to_bigint(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

// SAFETY: `output` is a BIGINT vector with room for the chunk's rows. `info`
// carries the Predicate installed by `register_scalar`.
unsafe extern "C" fn cache_size_invoke(
    info: duckdb_function_info,
    input: duckdb_data_chunk,
    output: duckdb_vector,
) {
    unsafe {
        let predicate = predicate_from_info(info);
        let row_count = duckdb_data_chunk_get_size(input) as usize;
        let out = duckdb_vector_get_data(output) as *mut i64;

        let size = to_bigint(predicate.cache().size());
        for i in 0..row_count {
            *out.add(i) = size;
        }
    }
}

// SAFETY: Same contract as `cache_size_invoke`. Each row clears, so only the
// first row of a chunk normally reports a non-zero count.
unsafe extern "C" fn cache_clear_invoke(
    info: duckdb_function_info,
    input: duckdb_data_chunk,
    output: duckdb_vector,
) {
    unsafe {
        let predicate = predicate_from_info(info);
        let row_count = duckdb_data_chunk_get_size(input) as usize;
        let out = duckdb_vector_get_data(output) as *mut i64;

        for i in 0..row_count {
            *out.add(i) = to_bigint(predicate.cache().clear());
        }
    }
}
