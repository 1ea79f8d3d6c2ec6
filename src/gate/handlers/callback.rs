//! Callback: validates the relayed provider response and issues the session.

use axum::{
    extract::{Extension, Query},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use anyhow::Context;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, instrument, warn};
use utoipa::IntoParams;

use crate::{
    gate::{
        cookies::{clear_handshake_cookie, extract_cookie, session_cookie, HANDSHAKE_COOKIE_NAME},
        pages::{html_response, login_failure_page},
        GateState,
    },
    handshake::{AuthError, CompletedLogin, IdentityAssertion},
};

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    /// Full provider response URL, fragment included, as relayed by the implicit page.
    #[serde(rename = "authenticationResponseURI")]
    pub authentication_response_uri: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/security/oidc/callback",
    params(CallbackQuery),
    responses(
        (status = 302, description = "Session issued, redirecting to the requested page"),
        (status = 401, description = "Login failed", body = String, content_type = "text/html"),
        (status = 500, description = "Login failed on the server side", body = String, content_type = "text/html")
    ),
    tag = "oidc"
)]
#[instrument(skip_all)]
pub async fn callback(
    headers: HeaderMap,
    gate: Extension<Arc<GateState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let assertion = query
        .authentication_response_uri
        .as_deref()
        .map(IdentityAssertion::from_response_uri)
        .unwrap_or_default();
    if let Some(provider_error) = assertion.error.as_deref() {
        warn!(provider_error, "Identity provider returned an error");
    }

    let handshake_id = extract_cookie(&headers, HANDSHAKE_COOKIE_NAME);
    let result = gate
        .validator()
        .complete_handshake(&assertion, handshake_id.as_deref())
        .await;

    match result {
        Ok(login) => match redirect_with_session(&gate, &login) {
            Ok(response) => response,
            Err(err) => {
                // The session was already stored; it must not outlive the failed response.
                if let Err(end_err) = gate
                    .validator()
                    .end_session(login.credential.session_id.expose_secret())
                    .await
                {
                    error!("Failed to discard session: {end_err}");
                }
                failure(&gate, &AuthError::Internal(err), true)
            }
        },
        Err(err) => failure(&gate, &err, handshake_id.is_some()),
    }
}

fn redirect_with_session(gate: &GateState, login: &CompletedLogin) -> anyhow::Result<Response> {
    let location = HeaderValue::from_str(&login.redirect_target)
        .context("redirect target is not a valid header value")?;
    let ttl = login.credential.expires_at - login.credential.issued_at;
    let cookie = session_cookie(
        gate.config(),
        login.credential.session_id.expose_secret(),
        ttl,
    )
    .context("failed to build session cookie")?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(LOCATION, location);
    response_headers.insert(SET_COOKIE, cookie);
    Ok((StatusCode::FOUND, response_headers).into_response())
}

/// Same page for every failure; the reason only goes to the logs.
fn failure(gate: &GateState, err: &AuthError, clear_handshake: bool) -> Response {
    let status = if err.is_internal() {
        error!(kind = err.kind(), "Login failed: {err}");
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        warn!(kind = err.kind(), "Login failed: {err}");
        StatusCode::UNAUTHORIZED
    };

    let mut response = html_response(status, login_failure_page());
    if clear_handshake {
        if let Ok(cookie) = clear_handshake_cookie(gate.config()) {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
    }
    response
}
