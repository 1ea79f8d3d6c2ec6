//! Fragment relay: moves an implicit-flow response out of the URL fragment.
//!
//! The relay page runs a script that performs exactly [`relay_target`] on
//! `window.location.href` and replaces the location with the result.

/// Callback endpoint receiving the relayed response, relative to the base path.
pub const CALLBACK_PATH: &str = "/api/security/oidc/callback";

/// Query parameter carrying the full identity provider response URL.
pub const RESPONSE_URI_PARAM: &str = "authenticationResponseURI";

/// Map the relay page URL (including its fragment) to the callback URL.
#[must_use]
pub fn relay_target(current_href: &str, base_path: &str) -> String {
    format!(
        "{base_path}{CALLBACK_PATH}?{RESPONSE_URI_PARAM}={}",
        encode_uri_component(current_href)
    )
}

/// Percent-encode like ECMAScript `encodeURIComponent`.
fn encode_uri_component(value: &str) -> String {
    // `urlencoding` also escapes the marks below, which encodeURIComponent leaves alone.
    urlencoding::encode(value)
        .replace("%21", "!")
        .replace("%2A", "*")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
}
