use super::{verify_id_token, Error, IdTokenClaims, Jwks};
use crate::{now_unix_seconds, APP_USER_AGENT};
use anyhow::{Context, Result};
use reqwest::Client;
use std::{fs, time::Duration};
use subtle::ConstantTimeEq;
use tracing::{debug, instrument};

/// Validates the identity token carried by an identity provider callback.
pub trait AssertionVerifier: Send + Sync {
    /// Verify `identity_token` and check its embedded nonce against `expected_nonce`.
    ///
    /// # Errors
    ///
    /// Returns an error when the token cannot be verified or the nonce differs.
    fn verify(&self, identity_token: &str, expected_nonce: &str) -> Result<IdTokenClaims, Error>;
}

/// Production verifier backed by the provider JWKS.
#[derive(Debug, Clone)]
pub struct JwksAssertionVerifier {
    jwks: Jwks,
    issuer: String,
    audience: String,
}

impl JwksAssertionVerifier {
    #[must_use]
    pub fn new(jwks: Jwks, issuer: String, audience: String) -> Self {
        Self {
            jwks,
            issuer,
            audience,
        }
    }
}

impl AssertionVerifier for JwksAssertionVerifier {
    fn verify(&self, identity_token: &str, expected_nonce: &str) -> Result<IdTokenClaims, Error> {
        let claims = verify_id_token(
            identity_token,
            &self.jwks,
            &self.issuer,
            &self.audience,
            now_unix_seconds(),
        )?;

        let nonce = claims.nonce.as_deref().ok_or(Error::MissingNonce)?;
        if !bool::from(nonce.as_bytes().ct_eq(expected_nonce.as_bytes())) {
            return Err(Error::NonceMismatch);
        }

        Ok(claims)
    }
}

/// Download the provider JWKS.
///
/// # Errors
///
/// Returns an error if the request fails, the status is not successful, or the body is
/// not a JWKS document.
#[instrument]
pub async fn fetch_jwks(url: &str) -> Result<Jwks> {
    let client = Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;

    let body = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch JWKS from {url}"))?
        .error_for_status()
        .with_context(|| format!("JWKS endpoint returned an error: {url}"))?
        .text()
        .await
        .context("Failed to read JWKS response body")?;

    let jwks = Jwks::from_json(&body).context("Invalid JWKS document")?;
    debug!("Loaded {} signing keys", jwks.keys.len());

    Ok(jwks)
}

/// Read the provider JWKS from a local file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_jwks(path: &str) -> Result<Jwks> {
    let body = fs::read_to_string(path).with_context(|| format!("Failed to read JWKS file: {path}"))?;
    Jwks::from_json(&body).with_context(|| format!("Invalid JWKS document: {path}"))
}
