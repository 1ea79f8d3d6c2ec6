//! Session credentials issued after a completed handshake.

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::oidc::IdTokenClaims;

/// Cookie scope of every session credential.
pub const SESSION_COOKIE_PATH: &str = "/";

/// User identity resolved from a verified identity token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subject {
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

impl Subject {
    /// `preferred_username` wins over `sub` when the provider sends it.
    #[must_use]
    pub fn from_claims(claims: &IdTokenClaims) -> Self {
        let username = claims
            .preferred_username
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(claims.sub.as_str())
            .to_string();
        Self {
            username,
            full_name: claims.name.clone(),
            email: claims.email.clone(),
            roles: claims.roles.clone(),
        }
    }
}

/// Credential handed to the client after a successful login.
///
/// `session_id` is the only copy of the raw token; stores keep its hash.
#[derive(Debug)]
pub struct SessionCredential {
    pub session_id: SecretString,
    pub subject: Subject,
    pub issued_at: i64,
    pub expires_at: i64,
    pub path: &'static str,
    pub http_only: bool,
}

/// What a store knows about a live session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub subject: Subject,
    pub issued_at: i64,
    pub expires_at: i64,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session_hash: &[u8], record: &SessionRecord) -> Result<()>;

    /// Only sessions with `expires_at > now_unix_seconds` are returned.
    async fn lookup(&self, session_hash: &[u8], now_unix_seconds: i64)
        -> Result<Option<SessionRecord>>;

    /// Idempotent; missing sessions are not an error.
    async fn delete(&self, session_hash: &[u8]) -> Result<()>;
}

/// Process-local session store.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Vec<u8>, SessionRecord>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session_hash: &[u8], record: &SessionRecord) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, session| session.expires_at > record.issued_at);
        sessions.insert(session_hash.to_vec(), record.clone());
        Ok(())
    }

    async fn lookup(
        &self,
        session_hash: &[u8],
        now_unix_seconds: i64,
    ) -> Result<Option<SessionRecord>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .get(session_hash)
            .filter(|session| session.expires_at > now_unix_seconds)
            .cloned())
    }

    async fn delete(&self, session_hash: &[u8]) -> Result<()> {
        self.sessions.lock().await.remove(session_hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oidc::Audience;

    fn claims() -> IdTokenClaims {
        IdTokenClaims {
            iss: "https://idp.example.test".to_string(),
            sub: "subject-1".to_string(),
            aud: Audience::One("oidc-gate".to_string()),
            exp: 0,
            iat: 0,
            nonce: None,
            preferred_username: Some("user1".to_string()),
            name: Some("User One".to_string()),
            email: Some("user1@example.test".to_string()),
            roles: vec!["viewer".to_string()],
        }
    }

    #[test]
    fn subject_prefers_preferred_username() {
        let subject = Subject::from_claims(&claims());
        assert_eq!(subject.username, "user1");
        assert_eq!(subject.full_name.as_deref(), Some("User One"));
        assert_eq!(subject.roles, vec!["viewer".to_string()]);
    }

    #[test]
    fn subject_falls_back_to_sub() {
        let mut claims = claims();
        claims.preferred_username = Some("  ".to_string());
        assert_eq!(Subject::from_claims(&claims).username, "subject-1");
        claims.preferred_username = None;
        assert_eq!(Subject::from_claims(&claims).username, "subject-1");
    }

    #[tokio::test]
    async fn lookup_ignores_expired_sessions() -> Result<()> {
        let store = MemorySessionStore::default();
        let record = SessionRecord {
            subject: Subject::from_claims(&claims()),
            issued_at: 100,
            expires_at: 200,
        };
        store.insert(b"hash", &record).await?;

        assert_eq!(store.lookup(b"hash", 150).await?, Some(record));
        assert_eq!(store.lookup(b"hash", 200).await?, None);
        assert_eq!(store.lookup(b"other", 150).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_idempotent() -> Result<()> {
        let store = MemorySessionStore::default();
        let record = SessionRecord {
            subject: Subject::from_claims(&claims()),
            issued_at: 100,
            expires_at: 200,
        };
        store.insert(b"hash", &record).await?;
        store.delete(b"hash").await?;
        store.delete(b"hash").await?;
        assert_eq!(store.lookup(b"hash", 150).await?, None);
        Ok(())
    }
}
