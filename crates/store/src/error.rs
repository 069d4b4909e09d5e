//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. The underlying `sqlx` error is kept
//! as the child of every raised [`ErrorKind`].

use derive_more::{Display, Error};

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// A lookup that finds nothing is not an error: those return `Ok(None)`.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The database is unreachable, or the connection URL is malformed.
    #[display("unable to connect to database")]
    Connection,
    #[display("database migration error")]
    Migration,
    /// A statement failed: constraint violation, timeout, dropped connection...
    #[display("database error")]
    Database,
    /// A stored value could not be converted to or from its model type.
    #[display("invalid data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Database.to_string(), "database error");
        assert_eq!(ErrorKind::InvalidData("published at").to_string(), "invalid data: published at");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Connection.is_retryable());
        assert!(!ErrorKind::Database.is_retryable());
        assert!(!ErrorKind::InvalidData("post id").is_retryable());
    }

    #[test]
    fn error_from_sqlx() {
        let result: std::result::Result<(), sqlx::Error> = Err(sqlx::Error::RowNotFound);
        let err: Result<()> = result.or_raise(|| ErrorKind::Database);
        assert_eq!(*err.unwrap_err(), ErrorKind::Database);
    }
}
