//! GraphQL HTTP endpoints

use async_graphql::{http::GraphiQLSource, BatchRequest};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use tracing::Instrument;

use super::{AppState, RequestLogger};

/// GraphiQL IDE page pointing at `/graphql`
pub async fn graphql_playground() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// Execute a single or batched GraphQL request.
///
/// A body that is not a GraphQL request yields 400 with a GraphQL-shaped
/// `errors` array.
pub async fn graphql_handler(
    State(state): State<AppState>,
    logger: RequestLogger,
    body: String,
) -> Response {
    let request = match serde_json::from_str::<BatchRequest>(&body) {
        Ok(request) => request,
        Err(e) => {
            logger.warn("Malformed GraphQL request", &e);
            let payload = serde_json::json!({
                "errors": [{ "message": format!("invalid GraphQL request: {}", e) }]
            });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    let response = state
        .schema
        .execute_batch(request)
        .instrument(logger.span().clone())
        .await;

    if !response.is_ok() {
        logger.info("GraphQL request completed with errors");
    }

    Json(response).into_response()
}
