use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

use crate::gate::{
    pages::{html_response, relay_page, relay_script, SCRIPT_CONTENT_TYPE},
    GateState,
};

#[utoipa::path(
    get,
    path = "/api/security/oidc/implicit",
    responses(
        (status = 200, description = "Relay page moving the URL fragment to the callback", body = String, content_type = "text/html")
    ),
    tag = "oidc"
)]
pub async fn implicit_page(gate: Extension<Arc<GateState>>) -> Response {
    html_response(StatusCode::OK, relay_page(gate.config().base_path()))
}

#[utoipa::path(
    get,
    path = "/internal/security/oidc/implicit.js",
    responses(
        (status = 200, description = "Relay script", body = String, content_type = "application/javascript")
    ),
    tag = "oidc"
)]
pub async fn implicit_script(gate: Extension<Arc<GateState>>) -> Response {
    match relay_script(gate.config().base_path()) {
        Ok(script) => (
            StatusCode::OK,
            [(CONTENT_TYPE, HeaderValue::from_static(SCRIPT_CONTENT_TYPE))],
            script,
        )
            .into_response(),
        Err(err) => {
            error!("Failed to render relay script: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
