use crate::{
    gate::{self, GateState},
    handshake::{
        HandshakeConfig, HandshakeStore, HandshakeValidator, MemoryHandshakeStore,
        MemorySessionStore, PgHandshakeStore, PgSessionStore, SessionStore,
        DEFAULT_RETENTION_SECONDS,
    },
    oidc::{fetch_jwks, read_jwks, Jwks, JwksAssertionVerifier, ProviderConfig},
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, Instrument};

const SCHEMA: &str = include_str!("../../../sql/schema.sql");

#[derive(Debug)]
pub enum JwksSource {
    Url(String),
    Path(String),
}

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<SecretString>,
    pub public_base_url: String,
    pub base_path: String,
    pub handshake_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub provider_name: String,
    pub realm: String,
    pub issuer: String,
    pub client_id: String,
    pub authorization_endpoint: String,
    pub redirect_uri: Option<String>,
    pub scope: String,
    pub jwks: JwksSource,
}

impl Args {
    fn handshake_config(&self) -> HandshakeConfig {
        HandshakeConfig::new(self.public_base_url.clone())
            .with_base_path(&self.base_path)
            .with_handshake_ttl_seconds(self.handshake_ttl_seconds)
            .with_session_ttl_seconds(self.session_ttl_seconds)
    }

    fn provider_config(&self, config: &HandshakeConfig) -> ProviderConfig {
        let redirect_uri = self.redirect_uri.clone().unwrap_or_else(|| {
            format!(
                "{}{}{}",
                config.public_base_url(),
                config.base_path(),
                gate::IMPLICIT_PAGE_PATH
            )
        });
        ProviderConfig {
            name: self.provider_name.clone(),
            realm: self.realm.clone(),
            issuer: self.issuer.clone(),
            client_id: self.client_id.clone(),
            authorization_endpoint: self.authorization_endpoint.clone(),
            redirect_uri,
            scope: self.scope.clone(),
        }
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the JWKS cannot be loaded, the database is unreachable, or the
/// server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.handshake_config();
    let provider = args.provider_config(&config);

    let jwks = load_jwks(&args.jwks).await?;
    let verifier = JwksAssertionVerifier::new(jwks, provider.issuer.clone(), provider.client_id.clone());

    let (handshakes, sessions) = stores(args.dsn.as_ref()).await?;

    info!(
        provider = %provider.name,
        issuer = %provider.issuer,
        base_path = %config.base_path(),
        "Starting login gateway"
    );

    let validator = HandshakeValidator::new(config, handshakes, sessions, Arc::new(verifier));
    gate::new(args.port, Arc::new(GateState::new(validator, provider))).await
}

async fn load_jwks(source: &JwksSource) -> Result<Jwks> {
    match source {
        JwksSource::Url(url) => fetch_jwks(url).await,
        JwksSource::Path(path) => read_jwks(path),
    }
}

async fn stores(
    dsn: Option<&SecretString>,
) -> Result<(Arc<dyn HandshakeStore>, Arc<dyn SessionStore>)> {
    let Some(dsn) = dsn else {
        info!("No database configured, using in-memory stores");
        return Ok((
            Arc::new(MemoryHandshakeStore::default()),
            Arc::new(MemorySessionStore::default()),
        ));
    };

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    sqlx::raw_sql(SCHEMA)
        .execute(&pool)
        .instrument(tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "MIGRATE"
        ))
        .await
        .context("Failed to apply database schema")?;

    Ok((
        Arc::new(PgHandshakeStore::new(pool.clone(), DEFAULT_RETENTION_SECONDS)),
        Arc::new(PgSessionStore::new(pool)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args {
            port: 8080,
            dsn: None,
            public_base_url: "https://kibana.com/".to_string(),
            base_path: "kbn".to_string(),
            handshake_ttl_seconds: 60,
            session_ttl_seconds: 120,
            provider_name: "oidc".to_string(),
            realm: "oidc1".to_string(),
            issuer: "https://idp.tld".to_string(),
            client_id: "client".to_string(),
            authorization_endpoint: "https://idp.tld/authorize".to_string(),
            redirect_uri: None,
            scope: "openid".to_string(),
            jwks: JwksSource::Path("/nonexistent/jwks.json".to_string()),
        }
    }

    #[test]
    fn redirect_uri_defaults_to_relay_page() {
        let args = args();
        let config = args.handshake_config();
        assert_eq!(config.base_path(), "/kbn");
        assert_eq!(config.handshake_ttl_seconds(), 60);
        assert_eq!(
            args.provider_config(&config).redirect_uri,
            "https://kibana.com/kbn/api/security/oidc/implicit"
        );
    }

    #[test]
    fn explicit_redirect_uri_wins() {
        let mut args = args();
        args.redirect_uri = Some("https://proxy.tld/implicit".to_string());
        let config = args.handshake_config();
        assert_eq!(
            args.provider_config(&config).redirect_uri,
            "https://proxy.tld/implicit"
        );
    }

    #[tokio::test]
    async fn missing_jwks_file_fails_startup() {
        let result = execute(args()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn memory_stores_without_dsn() -> Result<()> {
        let (handshakes, _sessions) = stores(None).await?;
        assert!(matches!(
            handshakes.take("unknown").await?,
            crate::handshake::TakeOutcome::Unknown
        ));
        Ok(())
    }
}
