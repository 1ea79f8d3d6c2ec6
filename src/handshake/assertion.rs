use secrecy::SecretString;
use url::{form_urlencoded, Url};

/// Identity provider callback payload.
///
/// Tokens are kept in [`SecretString`] so they never show up in `Debug` output or logs.
#[derive(Debug, Default)]
pub struct IdentityAssertion {
    pub identity_token: Option<SecretString>,
    pub access_token: Option<SecretString>,
    pub returned_state: Option<String>,
    pub token_type: Option<String>,
    /// OAuth `error` code when the provider refused the request.
    pub error: Option<String>,
}

impl IdentityAssertion {
    /// Extract the implicit-flow response from the relayed provider URL.
    ///
    /// Parameters are read from the fragment, or from the query when the fragment is
    /// empty. An unparsable URL yields an empty assertion, which can never pass the
    /// state check.
    #[must_use]
    pub fn from_response_uri(response_uri: &str) -> Self {
        let Ok(parsed) = Url::parse(response_uri) else {
            return Self::default();
        };
        let params = parsed
            .fragment()
            .filter(|fragment| !fragment.is_empty())
            .or_else(|| parsed.query())
            .unwrap_or_default();

        let mut assertion = Self::default();
        for (key, value) in form_urlencoded::parse(params.as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "id_token" => assertion.identity_token = Some(SecretString::from(value)),
                "access_token" => assertion.access_token = Some(SecretString::from(value)),
                "state" => assertion.returned_state = Some(value),
                "token_type" => assertion.token_type = Some(value),
                "error" => assertion.error = Some(value),
                _ => {}
            }
        }
        assertion
    }
}
