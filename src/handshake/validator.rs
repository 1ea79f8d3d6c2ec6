//! Handshake issuance and completion.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    assertion::IdentityAssertion,
    config::HandshakeConfig,
    error::AuthError,
    redirect::resolve_redirect_target,
    session::{SessionCredential, SessionRecord, SessionStore, Subject, SESSION_COOKIE_PATH},
    store::{HandshakeState, HandshakeStore, TakeOutcome},
    token::{constant_time_eq, generate_token, hash_token, is_well_formed},
};
use crate::{now_unix_seconds, oidc::AssertionVerifier};

/// Opaque handshake reference handed to the browser as a cookie.
#[derive(Debug)]
pub struct HandshakeCookie {
    pub value: SecretString,
    pub max_age_seconds: i64,
}

/// Outcome of a successful [`HandshakeValidator::complete_handshake`].
#[derive(Debug)]
pub struct CompletedLogin {
    pub credential: SessionCredential,
    pub redirect_target: String,
}

pub struct HandshakeValidator {
    config: HandshakeConfig,
    handshakes: Arc<dyn HandshakeStore>,
    sessions: Arc<dyn SessionStore>,
    verifier: Arc<dyn AssertionVerifier>,
}

impl HandshakeValidator {
    pub fn new(
        config: HandshakeConfig,
        handshakes: Arc<dyn HandshakeStore>,
        sessions: Arc<dyn SessionStore>,
        verifier: Arc<dyn AssertionVerifier>,
    ) -> Self {
        Self {
            config,
            handshakes,
            sessions,
            verifier,
        }
    }

    #[must_use]
    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Start a login attempt that returns to `requested_url` once completed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] when randomness or the store fails.
    #[instrument(skip(self))]
    pub async fn begin_handshake(
        &self,
        requested_url: &str,
    ) -> Result<(HandshakeState, HandshakeCookie), AuthError> {
        let id = generate_token()?;
        let now = now_unix_seconds();
        let ttl = self.config.handshake_ttl_seconds();
        let handshake = HandshakeState {
            state: generate_token()?,
            nonce: generate_token()?,
            redirect_target: resolve_redirect_target(requested_url, self.config.base_path()),
            created_at: now,
            expires_at: now.saturating_add(ttl),
        };

        self.handshakes.put(&id, &handshake).await?;

        Ok((
            handshake,
            HandshakeCookie {
                value: SecretString::from(id),
                max_age_seconds: ttl,
            },
        ))
    }

    /// Validate an identity provider callback and exchange it for a session.
    ///
    /// The handshake is consumed before any check runs, so it is gone after this call
    /// whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] describing the first failed check.
    #[instrument(skip_all)]
    pub async fn complete_handshake(
        &self,
        assertion: &IdentityAssertion,
        handshake_cookie: Option<&str>,
    ) -> Result<CompletedLogin, AuthError> {
        let Some(id) = handshake_cookie.filter(|value| is_well_formed(value)) else {
            return Err(AuthError::MissingHandshakeState);
        };

        let handshake = match self.handshakes.take(id).await? {
            TakeOutcome::Taken(handshake) => handshake,
            TakeOutcome::Consumed => return Err(AuthError::AlreadyConsumed),
            TakeOutcome::Unknown => return Err(AuthError::MissingHandshakeState),
        };

        if handshake.is_expired(now_unix_seconds()) {
            return Err(AuthError::ExpiredHandshake);
        }

        match assertion.returned_state.as_deref() {
            Some(state) if constant_time_eq(state, &handshake.state) => {}
            _ => return Err(AuthError::StateMismatch),
        }

        let Some(identity_token) = assertion.identity_token.as_ref() else {
            return Err(AuthError::InvalidAssertion);
        };
        let claims = self
            .verifier
            .verify(identity_token.expose_secret(), &handshake.nonce)
            .map_err(|err| {
                warn!(reason = %err, "Identity token rejected");
                AuthError::InvalidAssertion
            })?;

        let credential = self.issue_session(Subject::from_claims(&claims)).await?;
        info!(username = %credential.subject.username, "Login handshake completed");

        Ok(CompletedLogin {
            credential,
            redirect_target: handshake.redirect_target,
        })
    }

    async fn issue_session(&self, subject: Subject) -> Result<SessionCredential, AuthError> {
        let session_id = generate_token()?;
        let issued_at = now_unix_seconds();
        let record = SessionRecord {
            subject,
            issued_at,
            expires_at: issued_at.saturating_add(self.config.session_ttl_seconds()),
        };
        self.sessions
            .insert(&hash_token(&session_id), &record)
            .await?;

        Ok(SessionCredential {
            session_id: SecretString::from(session_id),
            subject: record.subject,
            issued_at: record.issued_at,
            expires_at: record.expires_at,
            path: SESSION_COOKIE_PATH,
            http_only: true,
        })
    }

    /// Resolve a session cookie value into its live session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn resolve_session(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionRecord>, AuthError> {
        if !is_well_formed(session_id) {
            return Ok(None);
        }
        Ok(self
            .sessions
            .lookup(&hash_token(session_id), now_unix_seconds())
            .await?)
    }

    /// Destroy the session behind a cookie value.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn end_session(&self, session_id: &str) -> Result<(), AuthError> {
        if is_well_formed(session_id) {
            self.sessions.delete(&hash_token(session_id)).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::{MemoryHandshakeStore, MemorySessionStore};
    use crate::oidc::{sign_rs256, Audience, IdTokenClaims, Jwks, JwksAssertionVerifier};
    use anyhow::{anyhow, Result};
    use secrecy::ExposeSecret;

    const TEST_PRIVATE_KEY_PEM: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/idp_signing_key.pem"
    ));
    const ISSUER: &str = "https://idp.example.test";
    const CLIENT_ID: &str = "oidc-gate";

    fn validator_with_ttl(handshake_ttl_seconds: i64) -> Result<HandshakeValidator> {
        let jwks = Jwks::from_rsa_private_key_pem_or_der(TEST_PRIVATE_KEY_PEM.as_bytes(), "k1")?;
        let verifier = JwksAssertionVerifier::new(jwks, ISSUER.to_string(), CLIENT_ID.to_string());
        let config = HandshakeConfig::new("https://kibana.com".to_string())
            .with_handshake_ttl_seconds(handshake_ttl_seconds);
        Ok(HandshakeValidator::new(
            config,
            Arc::new(MemoryHandshakeStore::default()),
            Arc::new(MemorySessionStore::default()),
            Arc::new(verifier),
        ))
    }

    fn validator() -> Result<HandshakeValidator> {
        validator_with_ttl(300)
    }

    fn id_token(nonce: &str) -> Result<String> {
        let now = now_unix_seconds();
        let claims = IdTokenClaims {
            iss: ISSUER.to_string(),
            sub: "1".to_string(),
            aud: Audience::One(CLIENT_ID.to_string()),
            exp: now + 300,
            iat: now,
            nonce: Some(nonce.to_string()),
            preferred_username: Some("user1".to_string()),
            name: None,
            email: None,
            roles: Vec::new(),
        };
        Ok(sign_rs256(TEST_PRIVATE_KEY_PEM.as_bytes(), "k1", &claims)?)
    }

    fn assertion(state: Option<&str>, token: Option<String>) -> IdentityAssertion {
        IdentityAssertion {
            identity_token: token.map(SecretString::from),
            access_token: Some(SecretString::from("access".to_string())),
            returned_state: state.map(ToString::to_string),
            token_type: Some("bearer".to_string()),
            error: None,
        }
    }

    #[tokio::test]
    async fn completes_once_then_reports_consumed() -> Result<()> {
        let validator = validator()?;
        let (handshake, cookie) = validator
            .begin_handshake("/abc/xyz/handshake?one=two%20three#/workpad")
            .await?;
        let valid = assertion(Some(&handshake.state), Some(id_token(&handshake.nonce)?));
        let cookie = cookie.value.expose_secret();

        let login = validator.complete_handshake(&valid, Some(cookie)).await?;
        assert_eq!(
            login.redirect_target,
            "/abc/xyz/handshake?one=two%20three#/workpad"
        );
        assert_eq!(login.credential.subject.username, "user1");
        assert_eq!(login.credential.path, "/");
        assert!(login.credential.http_only);

        let replay = validator.complete_handshake(&valid, Some(cookie)).await;
        assert!(matches!(replay, Err(AuthError::AlreadyConsumed)));
        Ok(())
    }

    #[tokio::test]
    async fn state_mismatch_wins_over_valid_nonce() -> Result<()> {
        let validator = validator()?;
        let (handshake, cookie) = validator.begin_handshake("/").await?;
        let token = id_token(&handshake.nonce)?;

        let result = validator
            .complete_handshake(
                &assertion(Some("garbage"), Some(token)),
                Some(cookie.value.expose_secret()),
            )
            .await;
        assert!(matches!(result, Err(AuthError::StateMismatch)));
        Ok(())
    }

    #[tokio::test]
    async fn absent_state_is_a_mismatch() -> Result<()> {
        let validator = validator()?;
        let (handshake, cookie) = validator.begin_handshake("/").await?;
        let result = validator
            .complete_handshake(
                &assertion(None, Some(id_token(&handshake.nonce)?)),
                Some(cookie.value.expose_secret()),
            )
            .await;
        assert!(matches!(result, Err(AuthError::StateMismatch)));
        Ok(())
    }

    #[tokio::test]
    async fn nonce_mismatch_is_invalid_assertion() -> Result<()> {
        let validator = validator()?;
        let (handshake, cookie) = validator.begin_handshake("/").await?;
        let result = validator
            .complete_handshake(
                &assertion(Some(&handshake.state), Some(id_token("other-nonce")?)),
                Some(cookie.value.expose_secret()),
            )
            .await;
        assert!(matches!(result, Err(AuthError::InvalidAssertion)));
        Ok(())
    }

    #[tokio::test]
    async fn garbage_or_missing_token_is_invalid_assertion() -> Result<()> {
        let validator = validator()?;
        for token in [Some("not.a.jwt".to_string()), None] {
            let (handshake, cookie) = validator.begin_handshake("/").await?;
            let result = validator
                .complete_handshake(
                    &assertion(Some(&handshake.state), token),
                    Some(cookie.value.expose_secret()),
                )
                .await;
            assert!(matches!(result, Err(AuthError::InvalidAssertion)));
        }
        Ok(())
    }

    #[tokio::test]
    async fn missing_or_unknown_cookie_never_succeeds() -> Result<()> {
        let validator = validator()?;
        let (handshake, _cookie) = validator.begin_handshake("/").await?;
        let valid = assertion(Some(&handshake.state), Some(id_token(&handshake.nonce)?));

        let result = validator.complete_handshake(&valid, None).await;
        assert!(matches!(result, Err(AuthError::MissingHandshakeState)));

        let unknown = generate_token()?;
        let result = validator.complete_handshake(&valid, Some(&unknown)).await;
        assert!(matches!(result, Err(AuthError::MissingHandshakeState)));

        let result = validator.complete_handshake(&valid, Some("junk")).await;
        assert!(matches!(result, Err(AuthError::MissingHandshakeState)));
        Ok(())
    }

    #[tokio::test]
    async fn failures_consume_the_handshake() -> Result<()> {
        let validator = validator()?;
        let (handshake, cookie) = validator.begin_handshake("/").await?;
        let cookie = cookie.value.expose_secret();

        let bad = assertion(Some("guess"), Some(id_token(&handshake.nonce)?));
        assert!(matches!(
            validator.complete_handshake(&bad, Some(cookie)).await,
            Err(AuthError::StateMismatch)
        ));

        let good = assertion(Some(&handshake.state), Some(id_token(&handshake.nonce)?));
        assert!(matches!(
            validator.complete_handshake(&good, Some(cookie)).await,
            Err(AuthError::AlreadyConsumed)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn expired_handshake_is_rejected() -> Result<()> {
        let validator = validator_with_ttl(0)?;
        let (handshake, cookie) = validator.begin_handshake("/").await?;
        let valid = assertion(Some(&handshake.state), Some(id_token(&handshake.nonce)?));

        let result = validator
            .complete_handshake(&valid, Some(cookie.value.expose_secret()))
            .await;
        assert!(matches!(result, Err(AuthError::ExpiredHandshake)));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_handshakes_are_independent() -> Result<()> {
        let validator = validator()?;
        let (first, first_cookie) = validator.begin_handshake("/first").await?;
        let (second, second_cookie) = validator.begin_handshake("/second").await?;
        assert_ne!(first.state, second.state);
        assert_ne!(first.nonce, second.nonce);

        // The first callback carries the second attempt's state: rejected.
        let crossed = assertion(Some(&second.state), Some(id_token(&second.nonce)?));
        assert!(matches!(
            validator
                .complete_handshake(&crossed, Some(first_cookie.value.expose_secret()))
                .await,
            Err(AuthError::StateMismatch)
        ));

        let login = validator
            .complete_handshake(&crossed, Some(second_cookie.value.expose_secret()))
            .await?;
        assert_eq!(login.redirect_target, "/second");
        Ok(())
    }

    #[tokio::test]
    async fn racing_callbacks_yield_one_session() -> Result<()> {
        let validator = Arc::new(validator()?);
        let (handshake, cookie) = validator.begin_handshake("/").await?;
        let cookie = cookie.value.expose_secret().to_string();
        let token = id_token(&handshake.nonce)?;

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let validator = validator.clone();
            let cookie = cookie.clone();
            let valid = assertion(Some(&handshake.state), Some(token.clone()));
            tasks.push(tokio::spawn(async move {
                validator
                    .complete_handshake(&valid, Some(&cookie))
                    .await
                    .is_ok()
            }));
        }

        let mut successes = 0;
        for task in tasks {
            if task.await? {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        Ok(())
    }

    #[tokio::test]
    async fn sessions_resolve_until_ended() -> Result<()> {
        let validator = validator()?;
        let (handshake, cookie) = validator.begin_handshake("/").await?;
        let valid = assertion(Some(&handshake.state), Some(id_token(&handshake.nonce)?));
        let login = validator
            .complete_handshake(&valid, Some(cookie.value.expose_secret()))
            .await?;
        let sid = login.credential.session_id.expose_secret();

        let record = validator
            .resolve_session(sid)
            .await?
            .ok_or_else(|| anyhow!("session not found"))?;
        assert_eq!(record.subject.username, "user1");

        validator.end_session(sid).await?;
        assert!(validator.resolve_session(sid).await?.is_none());
        assert!(validator.resolve_session("junk").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn open_redirect_targets_are_replaced() -> Result<()> {
        let validator = validator()?;
        let (handshake, _) = validator
            .begin_handshake("https://kibana.com/capture?next=https%3A%2F%2Fevil.test")
            .await?;
        assert_eq!(handshake.redirect_target, "/");
        Ok(())
    }
}
