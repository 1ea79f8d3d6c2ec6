//! `Set-Cookie` builders and `Cookie` header parsing.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};

use crate::handshake::{HandshakeConfig, SESSION_COOKIE_PATH};

pub const SESSION_COOKIE_NAME: &str = "sid";
pub const HANDSHAKE_COOKIE_NAME: &str = "oidc_handshake";

fn build(
    name: &str,
    value: &str,
    max_age_seconds: i64,
    config: &HandshakeConfig,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{name}={value}; Path={SESSION_COOKIE_PATH}; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}"
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn session_cookie(
    config: &HandshakeConfig,
    token: &str,
    max_age_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    build(SESSION_COOKIE_NAME, token, max_age_seconds, config)
}

pub(crate) fn clear_session_cookie(
    config: &HandshakeConfig,
) -> Result<HeaderValue, InvalidHeaderValue> {
    build(SESSION_COOKIE_NAME, "", 0, config)
}

pub(crate) fn handshake_cookie(
    config: &HandshakeConfig,
    id: &str,
    max_age_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    build(HANDSHAKE_COOKIE_NAME, id, max_age_seconds, config)
}

pub(crate) fn clear_handshake_cookie(
    config: &HandshakeConfig,
) -> Result<HeaderValue, InvalidHeaderValue> {
    build(HANDSHAKE_COOKIE_NAME, "", 0, config)
}

/// First value of cookie `name` across all `Cookie` headers.
pub(crate) fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim().to_string())
        })
        .filter(|value| !value.is_empty())
}
