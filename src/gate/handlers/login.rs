//! Login start: issues the handshake and the provider authorization URL.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::has_xsrf_header;
use crate::{
    gate::{cookies::handshake_cookie, GateState},
    handshake::{AuthError, HandshakeStoreFull},
};

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub provider_type: String,
    pub provider_name: String,
    /// Page that triggered the login, usually the capture URL carrying `next`.
    #[serde(rename = "currentURL")]
    pub current_url: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub location: String,
}

#[utoipa::path(
    post,
    path = "/internal/security/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Handshake started, follow `location`", body = LoginResponse),
        (status = 400, description = "Missing kbn-xsrf header, bad payload or unknown provider"),
        (status = 500, description = "Handshake could not be stored"),
        (status = 503, description = "Too many pending handshakes")
    ),
    tag = "oidc"
)]
pub async fn login(
    headers: HeaderMap,
    gate: Extension<Arc<GateState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    if !has_xsrf_header(&headers) {
        return (
            StatusCode::BAD_REQUEST,
            "Request must contain a kbn-xsrf header.".to_string(),
        )
            .into_response();
    }
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let provider = gate.provider();
    if !provider.matches(&request.provider_type, &request.provider_name) {
        warn!(
            provider_type = %request.provider_type,
            provider_name = %request.provider_name,
            "Login requested for unknown provider"
        );
        return (StatusCode::BAD_REQUEST, "Unknown provider".to_string()).into_response();
    }

    let (handshake, cookie) = match gate
        .validator()
        .begin_handshake(&request.current_url)
        .await
    {
        Ok(started) => started,
        Err(AuthError::Internal(err)) if err.is::<HandshakeStoreFull>() => {
            warn!("Refusing login: {err}");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
        Err(err) => {
            error!(kind = err.kind(), "Failed to begin handshake: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let location = match provider.authorization_url(&handshake.state, &handshake.nonce) {
        Ok(url) => url.to_string(),
        Err(err) => {
            error!("Invalid authorization endpoint: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response_headers = HeaderMap::new();
    match handshake_cookie(
        gate.config(),
        cookie.value.expose_secret(),
        cookie.max_age_seconds,
    ) {
        Ok(value) => {
            response_headers.insert(SET_COOKIE, value);
        }
        Err(err) => {
            error!("Failed to build handshake cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    info!(provider = %provider.name, "Login handshake started");
    (StatusCode::OK, response_headers, Json(LoginResponse { location })).into_response()
}
