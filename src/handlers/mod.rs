pub mod products;

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::{
    error::{ApiError, ApiResult},
    responses::{Payload, RouteKey},
    AppState,
};

/// Status and payload of a successful handler run.
pub type Outcome = ApiResult<(StatusCode, Payload)>;

/// Renders an outcome through the response table. Failures carry no payload.
pub fn respond(state: &AppState, route: RouteKey, method: Method, outcome: Outcome) -> Response {
    let (status, payload) = match outcome {
        Ok(ok) => ok,
        Err(err) => {
            match &err {
                ApiError::Internal(cause) => {
                    error!(route = route.pattern(), %method, error = %cause, "Request failed")
                }
                _ => warn!(route = route.pattern(), %method, error = %err, "Request rejected"),
            }
            (err.status(), Payload::Absent)
        }
    };

    let envelope = state.responses.render(route, &method, status, payload);
    (status, Json(envelope)).into_response()
}

pub async fn root(State(state): State<AppState>) -> Response {
    respond(&state, RouteKey::Root, Method::GET, Ok((StatusCode::OK, Payload::Absent)))
}

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok", "service": "jm-products-api" })))
}

/// Requests matching no registered path.
pub async fn not_found(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    warn!(%method, path = %uri.path(), "No route");
    let status = StatusCode::NOT_FOUND;
    (status, Json(state.responses.unmatched(status))).into_response()
}

/// Registered paths hit with a method they do not serve.
pub async fn method_not_allowed(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Response {
    warn!(%method, path = %uri.path(), "Method not allowed");
    let status = StatusCode::METHOD_NOT_ALLOWED;
    (status, Json(state.responses.unmatched(status))).into_response()
}
