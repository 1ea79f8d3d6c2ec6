use thiserror::Error;

/// Reasons a login handshake fails.
///
/// The variants are for logs only; responses never reveal which one occurred.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("handshake state is missing or unknown")]
    MissingHandshakeState,
    #[error("returned state does not match the handshake state")]
    StateMismatch,
    #[error("identity assertion failed verification")]
    InvalidAssertion,
    #[error("handshake state expired")]
    ExpiredHandshake,
    #[error("handshake state was already consumed")]
    AlreadyConsumed,
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Stable label for structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingHandshakeState => "missing_handshake_state",
            Self::StateMismatch => "state_mismatch",
            Self::InvalidAssertion => "invalid_assertion",
            Self::ExpiredHandshake => "expired_handshake",
            Self::AlreadyConsumed => "already_consumed",
            Self::Internal(_) => "internal",
        }
    }

    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}
