//! Shared helpers for Diesel repository implementations.
//!
//! - Error message extraction from pool and Diesel errors
//! - Conversions between unsigned domain counters and `INT4` columns
//! - `ILIKE` pattern escaping for keyword search

use tracing::debug;

use super::pool::PoolError;

/// Extract a readable message from a pool error.
pub fn map_pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Extract a readable message from a Diesel error and emit debug context.
///
/// Returns `Err(message)` for a closed connection so callers can map it to
/// their connection variant.
pub fn classify_diesel_error(error: diesel::result::Error, operation: &str) -> Result<String, String> {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    let message = error.to_string();
    debug!(%message, %operation, "diesel operation failed");
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => Err(message),
        _ => Ok(message),
    }
}

/// Read an `INT4` counter column into a domain counter.
pub fn counter_from_db(column: &str, value: i32) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("{column} must not be negative, found {value}"))
}

/// Write a domain counter into an `INT4` column.
pub fn counter_for_db(column: &str, value: u32) -> Result<i32, String> {
    i32::try_from(value).map_err(|_| format!("{column} {value} does not fit INT4"))
}

/// Collect row conversion results, mapping the first error through `map_err`.
pub fn collect_rows<T, E>(
    results: impl Iterator<Item = Result<T, String>>,
    map_err: impl FnOnce(String) -> E,
) -> Result<Vec<T>, E> {
    results.collect::<Result<Vec<_>, _>>().map_err(map_err)
}

/// Build a case-insensitive substring pattern, escaping `ILIKE` wildcards.
pub fn contains_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for ch in keyword.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
