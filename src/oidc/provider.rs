use url::Url;

/// Provider type reported by the login endpoint and the session user.
pub const PROVIDER_TYPE: &str = "oidc";

/// Implicit flow asks for the identity token and an access token in the fragment.
const RESPONSE_TYPE: &str = "id_token token";

/// Static settings of the configured OpenID Connect provider.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub name: String,
    /// Realm reported as the authentication and lookup realm of a session.
    pub realm: String,
    pub issuer: String,
    pub client_id: String,
    pub authorization_endpoint: String,
    pub redirect_uri: String,
    pub scope: String,
}

impl ProviderConfig {
    /// Build the authorization request URL for one login attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the authorization endpoint is not an absolute URL.
    pub fn authorization_url(&self, state: &str, nonce: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.authorization_endpoint)?;
        url.query_pairs_mut()
            .append_pair("response_type", RESPONSE_TYPE)
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scope)
            .append_pair("state", state)
            .append_pair("nonce", nonce);
        Ok(url)
    }

    #[must_use]
    pub fn matches(&self, provider_type: &str, provider_name: &str) -> bool {
        provider_type == PROVIDER_TYPE && provider_name == self.name
    }
}
