use thiserror::Error;

use crate::rest::BackendError;

/// Errors surfaced by the SQL-to-REST translation path.
///
/// Everything except `Backend` is raised before any network I/O happens, so
/// a failed statement never leaves partial side effects behind. `Backend` is
/// a verbatim pass-through of whatever the REST layer reported.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The statement does not start with SELECT, INSERT, UPDATE, or DELETE.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A required clause could not be parsed, or the statement uses a SQL
    /// feature outside the supported subset (JOINs, CTEs, sub-selects, ...).
    #[error("malformed statement: {0}")]
    MalformedStatement(String),

    /// The WHERE clause is not a flat conjunction of `column op value`
    /// comparisons. OR and grouped boolean logic are rejected rather than
    /// silently re-ANDed.
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// A `$n` placeholder appeared after the parameter list ran out.
    #[error("placeholder {placeholder} has no matching parameter ({supplied} supplied)")]
    MissingParameter {
        placeholder: String,
        supplied: usize,
    },

    /// Error reported by the REST backend, propagated unchanged.
    #[error(transparent)]
    Backend(#[from] BackendError),
}
