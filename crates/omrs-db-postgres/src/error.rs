//! Error types for the PostgreSQL backend.

use omrs_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// Errors specific to the PostgreSQL backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Error reported by the driver or the server.
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Misuse of a read session, e.g. a read after `finish`.
    #[error("Read session error: {message}")]
    Session { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }
}

/// Returns `true` for errors where the server was never reached.
pub fn is_connection_error(err: &SqlxError) -> bool {
    matches!(
        err,
        SqlxError::Io(_)
            | SqlxError::Tls(_)
            | SqlxError::PoolTimedOut
            | SqlxError::PoolClosed
            | SqlxError::WorkerCrashed
    )
}

/// Maps a driver error to the engine's taxonomy.
///
/// Server-side errors keep the server's message verbatim.
pub fn storage_error(err: SqlxError) -> StorageError {
    match err {
        SqlxError::Database(db_err) => StorageError::query_failed(db_err.message()),
        err if is_connection_error(&err) => StorageError::connection(err.to_string()),
        err => StorageError::query_failed(err.to_string()),
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Database(e) => storage_error(e),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
            PostgresError::Session { message } => {
                StorageError::internal(format!("Read session error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
