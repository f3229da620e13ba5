//! Error types for ouroboros

use thiserror::Error;

/// Result type alias for ouroboros operations
pub type Result<T> = std::result::Result<T, OrmError>;

/// Unified error type for the table layer.
///
/// Configuration and compilation errors are raised before any statement
/// reaches the database. Driver errors are carried unmodified in
/// [`OrmError::Database`] so callers can inspect the original SQLSTATE.
#[derive(Error, Debug)]
pub enum OrmError {
    /// Invalid schema declaration, unknown column, missing primary key,
    /// dependency cycle.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A filter or statement that cannot be turned into SQL.
    #[error("Compilation error: {0}")]
    Compilation(String),

    /// Error reported by the driver or the server, passed through as-is.
    #[cfg(feature = "postgres-errors")]
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    /// Pool acquisition or connect timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrmError {
    /// SQLSTATE code of the underlying server error, if any.
    pub fn sqlstate(&self) -> Option<String> {
        match self {
            #[cfg(feature = "postgres-errors")]
            OrmError::Database(sqlx::Error::Database(db_err)) => {
                db_err.code().map(|code| code.into_owned())
            }
            _ => None,
        }
    }

    /// Returns true if this error is potentially retryable.
    ///
    /// The layer never retries on its own; this only classifies the error
    /// for callers that implement a retry policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            OrmError::Timeout(_) => true,
            #[cfg(feature = "postgres-errors")]
            OrmError::Database(err) => match err {
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
                sqlx::Error::Database(_) => self
                    .sqlstate()
                    .map(|code| is_retryable_sqlstate(&code))
                    .unwrap_or(false),
                _ => false,
            },
            _ => false,
        }
    }

    /// Returns true if this is an integrity constraint violation (class 23)
    pub fn is_constraint_violation(&self) -> bool {
        self.sqlstate()
            .map(|code| code.starts_with("23"))
            .unwrap_or(false)
    }

    /// Returns true if the server rejected a duplicate object
    /// (`duplicate_object`, `duplicate_table`, `duplicate_schema`).
    pub fn is_duplicate_object(&self) -> bool {
        matches!(
            self.sqlstate().as_deref(),
            Some("42710") | Some("42P07") | Some("42P06")
        )
    }
}

/// SQLSTATE codes worth retrying.
///
/// See: https://www.postgresql.org/docs/current/errcodes-appendix.html
fn is_retryable_sqlstate(code: &str) -> bool {
    // Class 40: transaction rollback (deadlock, serialization failure)
    // Class 08: connection exceptions
    code.starts_with("40")
        || code.starts_with("08")
        || matches!(code, "57P01" | "57P02" | "57P03")
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_configuration() {
        let err = OrmError::Configuration("unknown column 'agee'".to_string());
        assert_eq!(err.to_string(), "Configuration error: unknown column 'agee'");
    }

    #[test]
    fn test_error_display_compilation() {
        let err = OrmError::Compilation("raw filter in OR group".to_string());
        assert_eq!(err.to_string(), "Compilation error: raw filter in OR group");
    }

    #[test]
    fn test_error_display_timeout() {
        let err = OrmError::Timeout("pool acquire".to_string());
        assert_eq!(err.to_string(), "Timeout: pool acquire");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: OrmError = json_err.into();
        assert!(matches!(err, OrmError::Serialization(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: OrmError = io_err.into();
        assert!(matches!(err, OrmError::Io(_)));
    }

    #[test]
    fn test_retryable_sqlstates() {
        assert!(is_retryable_sqlstate("40P01"));
        assert!(is_retryable_sqlstate("40001"));
        assert!(is_retryable_sqlstate("08006"));
        assert!(is_retryable_sqlstate("57P01"));
        assert!(!is_retryable_sqlstate("23505"));
        assert!(!is_retryable_sqlstate("42P01"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(OrmError::Timeout("test".to_string()).is_retryable());
        assert!(!OrmError::Configuration("test".to_string()).is_retryable());
        assert!(!OrmError::Compilation("test".to_string()).is_retryable());
    }

    #[test]
    fn test_not_constraint_violation_without_sqlstate() {
        assert!(!OrmError::Configuration("test".to_string()).is_constraint_violation());
        assert!(OrmError::Connection("test".to_string()).sqlstate().is_none());
    }

    #[cfg(feature = "postgres-errors")]
    #[test]
    fn test_driver_error_passthrough() {
        let err: OrmError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, OrmError::Database(sqlx::Error::PoolTimedOut)));
        assert!(err.is_retryable());
        assert!(!err.is_constraint_violation());
        assert_eq!(err.to_string(), sqlx::Error::PoolTimedOut.to_string());
    }

    #[cfg(feature = "postgres-errors")]
    #[test]
    fn test_decode_failure_stays_a_driver_error() {
        let decode = sqlx::Error::ColumnDecode {
            index: "\"age\"".to_string(),
            source: "mismatched types".into(),
        };
        let message = decode.to_string();
        let err: OrmError = decode.into();
        assert!(matches!(err, OrmError::Database(sqlx::Error::ColumnDecode { .. })));
        assert_eq!(err.to_string(), message);
    }

    #[cfg(feature = "postgres-errors")]
    #[test]
    fn test_row_not_found_is_not_retryable() {
        let err: OrmError = sqlx::Error::RowNotFound.into();
        assert!(!err.is_retryable());
    }
}
