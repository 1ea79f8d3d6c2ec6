//! Handshake-bound login flow.
//!
//! [`HandshakeValidator`] issues a single-use handshake for every login attempt and
//! exchanges a matching identity provider callback for a session credential.

mod assertion;
mod config;
mod error;
mod postgres;
mod redirect;
mod relay;
mod session;
mod store;
mod token;
mod validator;

pub use assertion::IdentityAssertion;
pub use config::HandshakeConfig;
pub use error::AuthError;
pub use postgres::{PgHandshakeStore, PgSessionStore};
pub use redirect::{default_target, resolve_redirect_target, sanitize, NEXT_PARAM};
pub use relay::{relay_target, CALLBACK_PATH, RESPONSE_URI_PARAM};
pub use session::{
    MemorySessionStore, SessionCredential, SessionRecord, SessionStore, Subject,
    SESSION_COOKIE_PATH,
};
pub use store::{
    HandshakeState, HandshakeStore, HandshakeStoreFull, MemoryHandshakeStore, TakeOutcome,
    DEFAULT_MAX_HANDSHAKES, DEFAULT_RETENTION_SECONDS,
};
pub use validator::{CompletedLogin, HandshakeCookie, HandshakeValidator};
