//! API middleware
//!
//! Contains:
//! - `AppState`, the shared state handed to every handler
//! - `ApiError`, the JSON error response
//! - `RequestLogger`, the per-request logger, and the middleware that attaches it

use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, Extensions, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use tracing::Instrument;

use crate::db::repositories::Repositories;
use crate::db::DynDatabasePool;
use crate::graphql::{build_schema, BlogSchema};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub schema: BlogSchema,
}

impl AppState {
    /// Bind the GraphQL schema to the repositories over one pool
    pub fn new(pool: DynDatabasePool) -> Self {
        let schema = build_schema(Repositories::new(pool.clone()));
        Self { pool, schema }
    }
}

/// JSON error response for failures outside GraphQL
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: "INTERNAL_ERROR".to_string(),
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

/// Per-request logger.
///
/// Wraps a span annotated with the request URL. The logging middleware
/// inserts one into every request's extensions; handlers take it as an
/// extractor parameter.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    span: tracing::Span,
    url: String,
}

impl RequestLogger {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let span = tracing::info_span!("request", url = %url);
        Self { span, url }
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn info(&self, message: &str) {
        self.span.in_scope(|| tracing::info!(url = %self.url, "{}", message));
    }

    pub fn warn(&self, message: &str, err: &dyn fmt::Display) {
        self.span
            .in_scope(|| tracing::warn!(url = %self.url, error = %err, "{}", message));
    }

    pub fn error(&self, message: &str, err: &dyn fmt::Display) {
        self.span
            .in_scope(|| tracing::error!(url = %self.url, error = %err, "{}", message));
    }

    pub fn from_extensions(extensions: &Extensions) -> Option<Self> {
        extensions.get::<RequestLogger>().cloned()
    }

    /// Fetch the logger, panicking if the middleware did not run.
    ///
    /// # Panics
    ///
    /// Panics when no logger is present in `extensions`.
    pub fn must_from(extensions: &Extensions) -> Self {
        match Self::from_extensions(extensions) {
            Some(logger) => logger,
            None => panic!("request logger missing from request extensions"),
        }
    }
}

impl<S> FromRequestParts<S> for RequestLogger
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_extensions(&parts.extensions).ok_or_else(|| {
            tracing::error!(uri = %parts.uri, "Request logger missing; logging middleware not installed");
            ApiError::internal_error("request logger missing")
        })
    }
}

/// Attach a `RequestLogger` for this request and run the rest of the stack
/// inside its span.
pub async fn logging_middleware(mut request: Request, next: Next) -> Response {
    let logger = RequestLogger::new(request.uri().to_string());
    let span = logger.span().clone();
    request.extensions_mut().insert(logger);

    next.run(request).instrument(span).await
}
