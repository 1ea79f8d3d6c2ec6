//! Identity provider arguments.

use clap::{Arg, ArgGroup, Command};

pub const ARG_PROVIDER_NAME: &str = "provider-name";
pub const ARG_REALM: &str = "realm";
pub const ARG_ISSUER: &str = "issuer";
pub const ARG_CLIENT_ID: &str = "client-id";
pub const ARG_AUTHORIZATION_ENDPOINT: &str = "authorization-endpoint";
pub const ARG_REDIRECT_URI: &str = "redirect-uri";
pub const ARG_SCOPE: &str = "scope";
pub const ARG_JWKS_URL: &str = "jwks-url";
pub const ARG_JWKS_PATH: &str = "jwks-path";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PROVIDER_NAME)
                .long(ARG_PROVIDER_NAME)
                .help("Provider name clients pass as providerName when logging in")
                .env("OIDC_GATE_PROVIDER_NAME")
                .default_value("oidc"),
        )
        .arg(
            Arg::new(ARG_REALM)
                .long(ARG_REALM)
                .help("Realm name reported for authenticated users")
                .env("OIDC_GATE_REALM")
                .default_value("oidc1"),
        )
        .arg(
            Arg::new(ARG_ISSUER)
                .long(ARG_ISSUER)
                .help("Expected `iss` claim of identity tokens")
                .env("OIDC_GATE_ISSUER")
                .required(true),
        )
        .arg(
            Arg::new(ARG_CLIENT_ID)
                .long(ARG_CLIENT_ID)
                .help("Client id registered at the provider, expected in `aud`")
                .env("OIDC_GATE_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_AUTHORIZATION_ENDPOINT)
                .long(ARG_AUTHORIZATION_ENDPOINT)
                .help("Provider authorization endpoint, example: https://idp.tld/oauth2/authorize")
                .env("OIDC_GATE_AUTHORIZATION_ENDPOINT")
                .required(true),
        )
        .arg(
            Arg::new(ARG_REDIRECT_URI)
                .long(ARG_REDIRECT_URI)
                .help("Redirect URI sent to the provider (default: <public-base-url><base-path>/api/security/oidc/implicit)")
                .env("OIDC_GATE_REDIRECT_URI"),
        )
        .arg(
            Arg::new(ARG_SCOPE)
                .long(ARG_SCOPE)
                .help("Requested scopes")
                .env("OIDC_GATE_SCOPE")
                .default_value("openid profile email"),
        )
        .arg(
            Arg::new(ARG_JWKS_URL)
                .long(ARG_JWKS_URL)
                .help("URL of the provider JWKS")
                .env("OIDC_GATE_JWKS_URL"),
        )
        .arg(
            Arg::new(ARG_JWKS_PATH)
                .long(ARG_JWKS_PATH)
                .help("Path to a local copy of the provider JWKS")
                .env("OIDC_GATE_JWKS_PATH"),
        )
        .group(
            ArgGroup::new("jwks")
                .args([ARG_JWKS_URL, ARG_JWKS_PATH])
                .required(true),
        )
}
