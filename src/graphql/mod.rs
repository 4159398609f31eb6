//! GraphQL API
//!
//! The schema is built once at startup over the repository set and shared by
//! every request. Lookups of absent or soft-deleted rows resolve to `null`;
//! every other repository failure becomes a GraphQL error carrying an
//! `extensions.code`.

pub mod mutation;
pub mod query;
pub mod schema;
pub mod types;

pub use schema::{build_schema, BlogSchema, GraphQLContext};

use async_graphql::ErrorExtensions;
use uuid::Uuid;

use crate::error::{is_retryable, RepoError};

/// Error code exposed in `extensions.code` for a repository failure
pub fn error_code(err: &RepoError) -> &'static str {
    match err {
        RepoError::NotFound { .. } => "NOT_FOUND",
        RepoError::Conflict { .. } => "CONFLICT",
        RepoError::Connection(_) | RepoError::Retryable(_) => "UNAVAILABLE",
        RepoError::Migration { .. } | RepoError::Database(_) => "INTERNAL",
    }
}

/// Convert a repository error into a GraphQL error with a code extension.
/// Causes labelled retryable also get `extensions.retryable = true`.
pub fn to_graphql_error(err: RepoError) -> async_graphql::Error {
    let code = error_code(&err);
    if code == "INTERNAL" || code == "UNAVAILABLE" {
        tracing::error!(error = %err, "GraphQL resolver failed");
    }
    let retryable = is_retryable(&err);
    async_graphql::Error::new(err.to_string()).extend_with(|_, e| {
        e.set("code", code);
        if retryable {
            e.set("retryable", true);
        }
    })
}

/// Map not-found to `None`, keeping every other error
pub(crate) fn optional<T>(result: Result<T, RepoError>) -> async_graphql::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(to_graphql_error(err)),
    }
}

/// Parse a GraphQL ID into a UUID
pub(crate) fn parse_id(id: &async_graphql::ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|e| {
        async_graphql::Error::new(format!("invalid id '{}': {}", id.as_str(), e))
            .extend_with(|_, ext| ext.set("code", "BAD_USER_INPUT"))
    })
}
