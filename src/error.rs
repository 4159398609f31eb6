//! Error taxonomy shared by the persistence gateway and the repositories.
//!
//! Repository and gateway errors propagate unchanged up to the HTTP/GraphQL
//! layer, which decides on the response status. The core never retries; it
//! only labels causes that are safe to retry with [`Retryable`].

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Errors raised by the persistence gateway and the repository layer.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The database could not be reached or the pool is closed
    #[error("database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    /// The requested row is absent or soft-deleted
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness constraint rejected the write
    #[error("conflict on {constraint}")]
    Conflict {
        constraint: String,
        #[source]
        source: sqlx::Error,
    },

    /// A schema migration statement failed
    #[error("migration of table '{table}' failed: {source}")]
    Migration {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// Any other driver error
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A cause labelled as safe to retry by the caller
    #[error(transparent)]
    Retryable(Retryable),
}

impl RepoError {
    /// Build a not-found error for the given entity and identifier
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True when the error means the row does not exist (or is soft-deleted)
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for uniqueness-constraint violations
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// True when the caller may safely retry the operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => {
                Self::Retryable(Retryable::new(Self::Connection(sqlx::Error::PoolTimedOut)))
            }
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                Self::Connection(err)
            }
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                let constraint = db_err
                    .constraint()
                    .map(str::to_string)
                    .unwrap_or_else(|| db_err.message().to_string());
                Self::Conflict {
                    constraint,
                    source: err,
                }
            }
            other => Self::Database(other),
        }
    }
}

/// Marker wrapping an underlying cause to signal that the failed operation may
/// be retried.
#[derive(Debug)]
pub struct Retryable {
    cause: Box<dyn StdError + Send + Sync + 'static>,
}

impl Retryable {
    pub fn new(cause: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            cause: Box::new(cause),
        }
    }
}

impl fmt::Display for Retryable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "retryable: {}", self.cause)
    }
}

impl StdError for Retryable {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// Walk an error chain looking for a [`Retryable`] label.
pub fn is_retryable(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<Retryable>().is_some() {
            return true;
        }
        if let Some(repo) = e.downcast_ref::<RepoError>() {
            if repo.is_retryable() {
                return true;
            }
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = RepoError::not_found("article", "42");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "article not found: 42");
    }

    #[test]
    fn test_pool_timeout_is_labelled_retryable() {
        let err = RepoError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable());
        assert!(is_retryable(&err));
        assert!(err.to_string().starts_with("retryable: "));
    }

    #[test]
    fn test_pool_closed_is_connection_error() {
        let err = RepoError::from(sqlx::Error::PoolClosed);
        assert!(matches!(err, RepoError::Connection(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_wraps_cause() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let wrapped = Retryable::new(inner);
        assert_eq!(wrapped.to_string(), "retryable: boom");
        assert!(wrapped.source().is_some());
        assert!(is_retryable(&wrapped));
    }

    #[test]
    fn test_plain_error_is_not_retryable() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(!is_retryable(&err));
    }
}
