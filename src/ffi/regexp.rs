// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-regexp)

//! FFI registration for the `regexp` scalar function.

use super::{predicate_from_info, register_scalar, set_error, ScalarDef};
use crate::error::RegexpError;
use crate::predicate::{check_arity, Predicate, FUNCTION_NAME};
use libduckdb_sys::*;

/// Registers the `regexp` function with `DuckDB`.
///
/// Signature: `regexp(VARCHAR, VARCHAR) -> BOOLEAN`
///
/// ```sql
/// SELECT p.category, i.item
/// FROM patterns p
/// JOIN items i ON regexp(p.pattern, i.item)
/// ```
///
/// # Safety
///
/// Requires a valid `duckdb_connection` handle.
pub unsafe fn register_regexp(
    con: duckdb_connection,
    predicate: &Predicate,
) -> Result<(), RegexpError> {
    let def = ScalarDef {
        name: FUNCTION_NAME,
        parameters: &[
            DUCKDB_TYPE_DUCKDB_TYPE_VARCHAR, // pattern
            DUCKDB_TYPE_DUCKDB_TYPE_VARCHAR, // text
        ],
        return_type: DUCKDB_TYPE_DUCKDB_TYPE_BOOLEAN,
        volatile: false,
        callback: regexp_invoke,
    };
    unsafe { register_scalar(con, &def, predicate) }
}

/// Reads row `row` of a VARCHAR vector, or `None` if the row is NULL.
///
/// # Safety
///
/// `data` and `validity` must come from the same flat VARCHAR vector, which
/// must hold more than `row` rows and outlive the returned slice.
unsafe fn read_varchar<'a>(
    data: *mut duckdb_string_t,
    validity: *mut u64,
    row: usize,
) -> Option<&'a [u8]> {
    unsafe {
        if !validity.is_null() && !duckdb_validity_row_is_valid(validity, row as idx_t) {
            return None;
        }
        // Inline strings (<= 12 bytes) live inside the struct, longer ones
        // behind a pointer; duckdb_string_t_data handles both.
        let str_struct = data.add(row);
        let len = duckdb_string_t_length(*str_struct) as usize;
        if len == 0 {
            return Some(&b""[..]);
        }
        let str_ptr = duckdb_string_t_data(str_struct);
        if str_ptr.is_null() {
            return Some(&b""[..]);
        }
        Some(std::slice::from_raw_parts(str_ptr as *const u8, len))
    }
}

// SAFETY: `input` is a valid DuckDB data chunk with two VARCHAR columns (as
// registered); DuckDB flattens input chunks before calling C scalar
// functions. `output` is a BOOLEAN vector with room for the chunk's rows.
// `info` carries the Predicate installed by `register_scalar`. String data is
// valid for the lifetime of the chunk.
unsafe extern "C" fn regexp_invoke(
    info: duckdb_function_info,
    input: duckdb_data_chunk,
    output: duckdb_vector,
) {
    unsafe {
        let predicate = predicate_from_info(info);

        let col_count = duckdb_data_chunk_get_column_count(input) as usize;
        if let Err(e) = check_arity(col_count) {
            set_error(info, &e);
            return;
        }

        let row_count = duckdb_data_chunk_get_size(input) as usize;

        // Vector 0: VARCHAR (pattern)
        let pattern_vec = duckdb_data_chunk_get_vector(input, 0);
        let pattern_data = duckdb_vector_get_data(pattern_vec) as *mut duckdb_string_t;
        let pattern_validity = duckdb_vector_get_validity(pattern_vec);

        // Vector 1: VARCHAR (text)
        let text_vec = duckdb_data_chunk_get_vector(input, 1);
        let text_data = duckdb_vector_get_data(text_vec) as *mut duckdb_string_t;
        let text_validity = duckdb_vector_get_validity(text_vec);

        let out = duckdb_vector_get_data(output) as *mut bool;
        duckdb_vector_ensure_validity_writable(output);
        let out_validity = duckdb_vector_get_validity(output);

        for i in 0..row_count {
            let pattern = read_varchar(pattern_data, pattern_validity, i);
            let text = read_varchar(text_data, text_validity, i);

            match predicate.evaluate_row(pattern, text) {
                Ok(Some(matched)) => *out.add(i) = matched,
                Ok(None) => duckdb_validity_set_row_invalid(out_validity, i as idx_t),
                Err(e) => {
                    set_error(info, &e);
                    return;
                }
            }
        }
    }
}
