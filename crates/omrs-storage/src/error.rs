//! Error types for the order enrichment engine.

use omrs_search::SqlBuilderError;

/// Errors surfaced by the enrichment engine and its stores.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No order matched; detected by the existence probe.
    #[error("Order not found: {key}")]
    NotFound {
        /// The lookup that failed, e.g. `order_id=42`.
        key: String,
    },

    /// The request was rejected before any query ran.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of what was wrong with the request.
        message: String,
    },

    /// The store rejected or failed a statement. The message is the store's own.
    #[error("Query failed: {message}")]
    QueryFailed {
        /// The store's error message, verbatim.
        message: String,
    },

    /// Failed to reach the store.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// An internal engine error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `QueryFailed` error.
    #[must_use]
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed {
            message: message.into(),
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the request was rejected before querying.
    #[must_use]
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. })
    }

    /// Returns `true` if a statement failed in the store.
    #[must_use]
    pub fn is_query_failed(&self) -> bool {
        matches!(self, Self::QueryFailed { .. })
    }
}

impl From<SqlBuilderError> for StorageError {
    fn from(err: SqlBuilderError) -> Self {
        match err {
            SqlBuilderError::InvalidValue { .. } => Self::invalid_request(err.to_string()),
            SqlBuilderError::UnboundParameter(_) | SqlBuilderError::InvalidParameterName(_) => {
                Self::internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::not_found("order_id=42");
        assert_eq!(err.to_string(), "Order not found: order_id=42");
        assert!(err.is_not_found());

        let err = StorageError::query_failed("relation \"orders\" does not exist");
        assert_eq!(
            err.to_string(),
            "Query failed: relation \"orders\" does not exist"
        );
        assert!(err.is_query_failed());
    }

    #[test]
    fn test_sql_builder_error_conversion() {
        let err: StorageError = SqlBuilderError::invalid_value("patient_id", "bad").into();
        assert!(err.is_invalid_request());

        let err: StorageError = SqlBuilderError::UnboundParameter("limit".into()).into();
        assert!(matches!(err, StorageError::Internal { .. }));
    }
}
