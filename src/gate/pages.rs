//! Static pages and security headers of the login flow.

use axum::{
    http::{
        header::{CACHE_CONTROL, CONTENT_SECURITY_POLICY, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
        HeaderName, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};

use super::IMPLICIT_SCRIPT_PATH;

pub const CACHE_CONTROL_VALUE: &str = "private, no-cache, no-store, must-revalidate";
pub const CONTENT_SECURITY_POLICY_VALUE: &str =
    "script-src 'unsafe-eval' 'self'; worker-src blob: 'self'; style-src 'unsafe-inline' 'self'";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const SCRIPT_CONTENT_TYPE: &str = "application/javascript; charset=utf-8";
/// Content type of flow responses whose handler sets none (redirects, empty bodies).
pub const FALLBACK_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// The only failure text a client ever sees.
pub const LOGIN_FAILURE_MESSAGE: &str = "We couldn't log you in";

/// Headers every login-flow response carries.
#[must_use]
pub fn security_headers() -> [(HeaderName, HeaderValue); 3] {
    [
        (CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE)),
        (
            CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY_VALUE),
        ),
        (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
    ]
}

pub(crate) fn html_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE))],
        body,
    )
        .into_response()
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Relay page: loads the relay script from the same origin and nothing else.
pub(crate) fn relay_page(base_path: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="referrer" content="no-referrer">
    <title>Logging in</title>
    <script src="{}{IMPLICIT_SCRIPT_PATH}"></script>
  </head>
  <body></body>
</html>
"#,
        escape_html(base_path)
    )
}

/// Relay script: the browser-side twin of [`crate::handshake::relay_target`].
pub(crate) fn relay_script(base_path: &str) -> Result<String, serde_json::Error> {
    let callback = format!(
        "{base_path}{}?{}=",
        crate::handshake::CALLBACK_PATH,
        crate::handshake::RESPONSE_URI_PARAM
    );
    Ok(format!(
        "window.location.replace({} + encodeURIComponent(window.location.href));\n",
        serde_json::to_string(&callback)?
    ))
}

pub(crate) fn login_failure_page() -> String {
    let message = escape_html(LOGIN_FAILURE_MESSAGE);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>{message}</title>
  </head>
  <body>
    <h1>{message}</h1>
    <p>Close this window and start the login again.</p>
  </body>
</html>
"#
    )
}
