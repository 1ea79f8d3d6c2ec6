use crate::cli::{
    actions::{
        server::{Args, JwksSource},
        Action,
    },
    commands::{oidc, session},
};
use anyhow::{Context, Result};
use secrecy::SecretString;

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let jwks = match (
        matches.get_one::<String>(oidc::ARG_JWKS_URL),
        matches.get_one::<String>(oidc::ARG_JWKS_PATH),
    ) {
        (Some(url), _) => JwksSource::Url(url.clone()),
        (None, Some(path)) => JwksSource::Path(path.clone()),
        (None, None) => anyhow::bail!(
            "missing required argument: --{} or --{}",
            oidc::ARG_JWKS_URL,
            oidc::ARG_JWKS_PATH
        ),
    };

    Ok(Action::Server(Args {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches
            .get_one::<String>("dsn")
            .cloned()
            .map(SecretString::from),
        public_base_url: required(matches, session::ARG_PUBLIC_BASE_URL)?,
        base_path: matches
            .get_one::<String>(session::ARG_BASE_PATH)
            .cloned()
            .unwrap_or_default(),
        handshake_ttl_seconds: matches
            .get_one::<i64>(session::ARG_HANDSHAKE_TTL_SECONDS)
            .copied()
            .unwrap_or(300),
        session_ttl_seconds: matches
            .get_one::<i64>(session::ARG_SESSION_TTL_SECONDS)
            .copied()
            .unwrap_or(28800),
        provider_name: required(matches, oidc::ARG_PROVIDER_NAME)?,
        realm: required(matches, oidc::ARG_REALM)?,
        issuer: required(matches, oidc::ARG_ISSUER)?,
        client_id: required(matches, oidc::ARG_CLIENT_ID)?,
        authorization_endpoint: required(matches, oidc::ARG_AUTHORIZATION_ENDPOINT)?,
        redirect_uri: matches.get_one::<String>(oidc::ARG_REDIRECT_URI).cloned(),
        scope: required(matches, oidc::ARG_SCOPE)?,
        jwks,
    }))
}
