const DEFAULT_HANDSHAKE_TTL_SECONDS: i64 = 5 * 60;
const DEFAULT_SESSION_TTL_SECONDS: i64 = 8 * 60 * 60;

#[derive(Clone, Debug)]
pub struct HandshakeConfig {
    public_base_url: String,
    base_path: String,
    handshake_ttl_seconds: i64,
    session_ttl_seconds: i64,
}

impl HandshakeConfig {
    #[must_use]
    pub fn new(public_base_url: String) -> Self {
        Self {
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            base_path: String::new(),
            handshake_ttl_seconds: DEFAULT_HANDSHAKE_TTL_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    /// Mount point of the application, e.g. `/kbn`. Empty when served from `/`.
    #[must_use]
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = normalize_base_path(base_path);
        self
    }

    #[must_use]
    pub fn with_handshake_ttl_seconds(mut self, seconds: i64) -> Self {
        self.handshake_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn handshake_ttl_seconds(&self) -> i64 {
        self.handshake_ttl_seconds
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    /// Only mark cookies secure when the application is served over HTTPS.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.public_base_url.starts_with("https://")
    }
}

fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let config = HandshakeConfig::new("https://gate.example.test/".to_string());
        assert_eq!(config.public_base_url(), "https://gate.example.test");
        assert_eq!(config.base_path(), "");
        assert_eq!(
            config.handshake_ttl_seconds(),
            DEFAULT_HANDSHAKE_TTL_SECONDS
        );
        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert!(config.cookie_secure());

        let config = config
            .with_base_path("kbn/")
            .with_handshake_ttl_seconds(30)
            .with_session_ttl_seconds(60);
        assert_eq!(config.base_path(), "/kbn");
        assert_eq!(config.handshake_ttl_seconds(), 30);
        assert_eq!(config.session_ttl_seconds(), 60);
    }

    #[test]
    fn plain_http_cookies_are_not_secure() {
        let config = HandshakeConfig::new("http://localhost:8080".to_string());
        assert!(!config.cookie_secure());
    }

    #[test]
    fn normalize_base_path_variants() {
        assert_eq!(normalize_base_path(""), "");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path("/a/b/"), "/a/b");
        assert_eq!(normalize_base_path("a"), "/a");
    }
}
