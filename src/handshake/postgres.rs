//! Postgres-backed handshake and session stores.
//!
//! Tables are defined in `sql/schema.sql`. Handshake ids and session tokens are
//! stored as SHA-256 hashes only.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::{
    session::{SessionRecord, SessionStore, Subject},
    store::{HandshakeState, HandshakeStore, TakeOutcome},
    token::hash_token,
};
use crate::now_unix_seconds;

fn db_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

pub struct PgHandshakeStore {
    pool: PgPool,
    retention_seconds: i64,
}

impl PgHandshakeStore {
    #[must_use]
    pub fn new(pool: PgPool, retention_seconds: i64) -> Self {
        Self {
            pool,
            retention_seconds,
        }
    }
}

#[async_trait]
impl HandshakeStore for PgHandshakeStore {
    async fn put(&self, id: &str, handshake: &HandshakeState) -> Result<()> {
        let query = "DELETE FROM oidc_handshakes WHERE expires_at < $1";
        sqlx::query(query)
            .bind(now_unix_seconds().saturating_sub(self.retention_seconds))
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to reclaim expired handshakes")?;

        let query = r"
            INSERT INTO oidc_handshakes
                (id_hash, state, nonce, redirect_target, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        ";
        sqlx::query(query)
            .bind(hash_token(id))
            .bind(&handshake.state)
            .bind(&handshake.nonce)
            .bind(&handshake.redirect_target)
            .bind(handshake.created_at)
            .bind(handshake.expires_at)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to insert handshake")?;

        Ok(())
    }

    async fn take(&self, id: &str) -> Result<TakeOutcome> {
        let id_hash = hash_token(id);

        // Row lock plus the `consumed_at IS NULL` guard lets exactly one racer win.
        let query = r"
            UPDATE oidc_handshakes
            SET consumed_at = $2
            WHERE id_hash = $1 AND consumed_at IS NULL
            RETURNING state, nonce, redirect_target, created_at, expires_at
        ";
        let row = sqlx::query(query)
            .bind(&id_hash)
            .bind(now_unix_seconds())
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to consume handshake")?;

        if let Some(row) = row {
            return Ok(TakeOutcome::Taken(HandshakeState {
                state: row.get("state"),
                nonce: row.get("nonce"),
                redirect_target: row.get("redirect_target"),
                created_at: row.get("created_at"),
                expires_at: row.get("expires_at"),
            }));
        }

        let query = "SELECT 1 FROM oidc_handshakes WHERE id_hash = $1";
        let existing = sqlx::query(query)
            .bind(&id_hash)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup handshake")?;

        Ok(if existing.is_some() {
            TakeOutcome::Consumed
        } else {
            TakeOutcome::Unknown
        })
    }
}

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session_hash: &[u8], record: &SessionRecord) -> Result<()> {
        let query = "DELETE FROM oidc_sessions WHERE expires_at <= $1";
        sqlx::query(query)
            .bind(record.issued_at)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to reclaim expired sessions")?;

        let query = r"
            INSERT INTO oidc_sessions
                (session_hash, username, full_name, email, roles, issued_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        ";
        sqlx::query(query)
            .bind(session_hash)
            .bind(&record.subject.username)
            .bind(&record.subject.full_name)
            .bind(&record.subject.email)
            .bind(&record.subject.roles)
            .bind(record.issued_at)
            .bind(record.expires_at)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to insert session")?;
        Ok(())
    }

    async fn lookup(
        &self,
        session_hash: &[u8],
        now_unix_seconds: i64,
    ) -> Result<Option<SessionRecord>> {
        let query = r"
            SELECT username, full_name, email, roles, issued_at, expires_at
            FROM oidc_sessions
            WHERE session_hash = $1 AND expires_at > $2
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(session_hash)
            .bind(now_unix_seconds)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup session")?;

        Ok(row.map(|row| SessionRecord {
            subject: Subject {
                username: row.get("username"),
                full_name: row.get("full_name"),
                email: row.get("email"),
                roles: row.get("roles"),
            },
            issued_at: row.get("issued_at"),
            expires_at: row.get("expires_at"),
        }))
    }

    async fn delete(&self, session_hash: &[u8]) -> Result<()> {
        let query = "DELETE FROM oidc_sessions WHERE session_hash = $1";
        sqlx::query(query)
            .bind(session_hash)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to delete session")?;
        Ok(())
    }
}
