use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use crate::gate::{
    cookies::{clear_session_cookie, extract_cookie, SESSION_COOKIE_NAME},
    GateState,
};

#[utoipa::path(
    post,
    path = "/api/security/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "oidc"
)]
pub async fn logout(headers: HeaderMap, gate: Extension<Arc<GateState>>) -> impl IntoResponse {
    if let Some(token) = extract_cookie(&headers, SESSION_COOKIE_NAME) {
        if let Err(err) = gate.validator().end_session(&token).await {
            error!("Failed to delete session: {err}");
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(gate.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}
