use error_stack::Report;
use thiserror::Error;

/// Database related errors
#[derive(Debug, Error)]
pub enum Error {
    /// An error caused by an invalid Postgres connection url for
    /// either the primary or the replica pool.
    #[error("invalid connection url")]
    InvalidUrl,
    /// An error caused by an [`sqlx`] error.
    #[error("received a pool error: {0}")]
    Internal(sqlx::Error),
    /// The primary pool is currently in read mode (most likely due to
    /// maintenance) and should not perform any writes.
    #[error("database is currently in read mode")]
    Readonly,
    /// Either the primary or replica pool has no reliable connection
    /// to the database.
    #[error("unhealthy database pool")]
    UnhealthyPool,
}

/// Converts a generic [sqlx] result into a [database error](Error).
pub trait ErrorExt<T> {
    fn into_db_error(self) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, sqlx::Error> {
    fn into_db_error(self) -> Result<T> {
        self.map_err(|e| match &e {
            sqlx::Error::Database(err) if err.message().ends_with("read-only transaction") => {
                Report::new(e).change_context(Error::Readonly)
            }
            _ => Report::new(Error::Internal(e)),
        })
    }
}

/// Lazily typed [`std::result::Result`] with the error generic filled
/// up with [a database error](Error).
pub type Result<T> = error_stack::Result<T, Error>;

/// Classification helpers on `Report<Error>`, since downcasting at
/// every call site gets noisy.
pub trait ErrorExt2 {
    fn is_unhealthy(&self) -> bool;
    /// Whether the failure is a recoverable connectivity fault, as
    /// opposed to a data-integrity violation. Only these are worth
    /// retrying.
    fn is_transient(&self) -> bool;
}

impl ErrorExt2 for error_stack::Report<Error> {
    fn is_unhealthy(&self) -> bool {
        self.downcast_ref::<Error>()
            .map(|v| matches!(v, Error::UnhealthyPool))
            .unwrap_or_default()
    }

    fn is_transient(&self) -> bool {
        match self.downcast_ref::<Error>() {
            Some(Error::UnhealthyPool) => true,
            Some(Error::Internal(e)) => matches!(
                e,
                sqlx::Error::Io(..) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }
}
