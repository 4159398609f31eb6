//! Health check endpoint

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::{AppState, RequestLogger};

/// Ping the database. 200 `OK` when reachable, 500 with an empty body
/// otherwise.
pub async fn health_check(State(state): State<AppState>, logger: RequestLogger) -> Response {
    match state.pool.ping().await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            logger.error("Health check failed", &e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
