//! # oidc-gate (OpenID Connect login gateway)
//!
//! `oidc-gate` performs the OpenID Connect implicit-flow login handshake in front of
//! a web application and turns a validated identity token into a local session.
//!
//! ## Handshake
//!
//! Every login attempt gets a server-side handshake record holding a random `state`
//! and `nonce` plus the local URL the user originally asked for. The browser only
//! receives an opaque reference to that record in an `HttpOnly` cookie.
//!
//! - **Single use:** the record is atomically taken before any check runs, so a
//!   replayed or double-submitted callback can never succeed twice, and a failed
//!   attempt cannot be retried with another guess.
//! - **Opaque failures:** every failure renders the same page. The precise reason is
//!   only written to the logs.
//! - **Local redirects only:** the redirect target is restricted to paths under the
//!   application base path; query and fragment are kept verbatim.
//!
//! ## Fragment relay
//!
//! Identity providers deliver implicit-flow tokens in the URL fragment, which never
//! reaches the server. A same-origin relay page moves the full URL into the
//! `authenticationResponseURI` query parameter of the callback endpoint.

use std::time::{SystemTime, UNIX_EPOCH};

pub mod cli;
pub mod gate;
pub mod handshake;
pub mod oidc;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Wall-clock time in whole seconds since the Unix epoch.
pub(crate) fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| i64::try_from(duration.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
