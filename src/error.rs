/// Error types for sqlx-record-bind
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed bind token, record expression, field tag or unterminated quote
    #[error("Failed to parse: {0}")]
    Parse(String),

    /// A name (record type, destination column, map key, record field) could not be resolved
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// Destinations or arguments of a kind the query cannot work with
    #[error("Kind mismatch: {0}")]
    KindMismatch(String),

    /// Error from SQLx while preparing, executing or scanning a statement
    #[error("Database error in statement {statement:?}: {source}")]
    Database {
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    /// Placeholder was referenced but no value was supplied for it
    #[error("Placeholder '{0}' was not bound to any argument")]
    UnboundPlaceholder(String),

    /// Error while building the placeholder pattern
    #[error("Failed to build placeholder pattern: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Returns a closure wrapping a SQLx error with the statement it came from.
    pub(crate) fn database(statement: &str) -> impl FnOnce(sqlx::Error) -> Error + '_ {
        move |source| Error::Database {
            statement: statement.to_owned(),
            source,
        }
    }
}

/// Result type alias for sqlx-record-bind operations
pub type Result<T> = std::result::Result<T, Error>;
