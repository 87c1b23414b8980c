use thiserror::Error;

/// Errors surfaced by every fallible operation in this crate.
///
/// Nothing is retried internally; each failure reaches the immediate caller.
#[derive(Debug, Error)]
pub enum DbcError {
    /// Opening the connection failed. `dsn` is sanitized (password masked).
    #[error("Connection failed for DSN {dsn}: {message}")]
    ConnectionFailure { dsn: String, message: String },

    /// A statement failed on the server or in the driver. The connection stays usable.
    #[error("SQL execution error: {0}")]
    ExecutionFailure(String),

    /// The request was structurally invalid and no SQL was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The connection is closed or in an unknown state and should be discarded.
    #[error("Connection broken: {0}")]
    ConnectionBroken(String),
}

impl DbcError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        DbcError::InvalidArgument(message.into())
    }

    /// Map a driver error raised while running a statement.
    pub(crate) fn from_execution(err: &tokio_postgres::Error) -> Self {
        DbcError::ExecutionFailure(driver_message(err))
    }
}

/// Render the most specific text the driver has for an error.
///
/// Server-side errors carry a `DbError` whose message is more useful than the
/// generic "db error" display of `tokio_postgres::Error`.
pub(crate) fn driver_message(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => match db.detail() {
            Some(detail) => format!("{}: {} ({detail})", db.code().code(), db.message()),
            None => format!("{}: {}", db.code().code(), db.message()),
        },
        None => with_sources(err),
    }
}

/// `err` followed by each of its causes, separated by `: `.
fn with_sources(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
