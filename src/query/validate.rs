//! Argument checks shared by builder calls

use super::error::{QueryError, QueryResult};

/// Whether `s` is empty or whitespace only
pub(crate) fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Reject empty or whitespace-only strings
pub(crate) fn ensure_not_blank(value: &str, param: &'static str) -> QueryResult<()> {
    if is_blank(value) {
        return Err(QueryError::invalid(param, "must not be blank"));
    }
    Ok(())
}

/// Reject empty lists
pub(crate) fn ensure_not_empty<T>(values: &[T], param: &'static str) -> QueryResult<()> {
    if values.is_empty() {
        return Err(QueryError::invalid(param, "must not be empty"));
    }
    Ok(())
}
