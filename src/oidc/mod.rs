//! Identity token verification for the OpenID Connect provider.
//!
//! Tokens are compact RS256 JWS values checked against the provider JWKS. The
//! handshake layer only sees the [`AssertionVerifier`] trait.

mod error;
mod jwks;
mod jwt;
mod provider;
mod verifier;

pub use error::Error;
pub use jwks::{Jwk, Jwks};
pub use jwt::{
    sign_rs256, verify_id_token, Audience, IdTokenClaims, IdTokenHeader, DEFAULT_LEEWAY_SECONDS,
};
pub use provider::{ProviderConfig, PROVIDER_TYPE};
pub use verifier::{fetch_jwks, read_jwks, AssertionVerifier, JwksAssertionVerifier};
