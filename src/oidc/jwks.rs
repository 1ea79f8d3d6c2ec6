use super::Error;
use base64ct::{Base64UrlUnpadded, Encoding};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

/// Identity provider signing keys as published on its `jwks_uri`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Parse a JWKS from JSON.
    ///
    /// Keys that are not RSA (`kty != "RSA"`) are dropped, providers commonly publish
    /// EC keys next to the RSA ones.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is not valid JSON or doesn't match the expected JWKS shape.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        let raw: RawJwks = serde_json::from_str(s)?;
        let keys = raw
            .keys
            .into_iter()
            .filter(|key| key.get("kty").and_then(serde_json::Value::as_str) == Some("RSA"))
            .map(serde_json::from_value)
            .collect::<Result<Vec<Jwk>, _>>()?;
        Ok(Self { keys })
    }

    /// Find a key by `kid` (Key ID).
    #[must_use]
    pub fn find_by_kid(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    /// Build a JWKS from an RSA private key (PEM or DER), deriving the public half.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be parsed.
    pub fn from_rsa_private_key_pem_or_der(
        private_key_pem_or_der: &[u8],
        kid: impl Into<String>,
    ) -> Result<Self, Error> {
        let private_key = decode_private_key(private_key_pem_or_der)?;
        let public_key = RsaPublicKey::from(&private_key);
        Ok(Self {
            keys: vec![Jwk::from_rsa_public_key(&public_key, kid)],
        })
    }
}

#[derive(Deserialize)]
struct RawJwks {
    keys: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    pub kid: String,
    pub n: String,
    pub e: String,
}

impl Jwk {
    #[must_use]
    pub fn from_rsa_public_key(public_key: &RsaPublicKey, kid: impl Into<String>) -> Self {
        Self {
            kty: "RSA".to_string(),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            kid: kid.into(),
            n: Base64UrlUnpadded::encode_string(&public_key.n().to_bytes_be()),
            e: Base64UrlUnpadded::encode_string(&public_key.e().to_bytes_be()),
        }
    }

    /// Only signature keys may verify identity tokens; `use` is optional in JWKS.
    #[must_use]
    pub fn is_signing_key(&self) -> bool {
        self.key_use.as_deref().map_or(true, |key_use| key_use == "sig")
    }

    /// Convert this JWK to an `RsaPublicKey`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base64url values cannot be decoded or the RSA key is invalid.
    pub fn to_rsa_public_key(&self) -> Result<RsaPublicKey, Error> {
        let n_bytes = Base64UrlUnpadded::decode_vec(&self.n).map_err(|_| Error::Base64)?;
        let e_bytes = Base64UrlUnpadded::decode_vec(&self.e).map_err(|_| Error::Base64)?;
        let n = BigUint::from_bytes_be(&n_bytes);
        let e = BigUint::from_bytes_be(&e_bytes);
        RsaPublicKey::new(n, e).map_err(Error::Rsa)
    }
}

pub(super) fn decode_private_key(pem_or_der: &[u8]) -> Result<RsaPrivateKey, Error> {
    if pem_or_der.starts_with(b"-----BEGIN") {
        let s = std::str::from_utf8(pem_or_der).map_err(|_| Error::KeyParse)?;
        if let Ok(k) = RsaPrivateKey::from_pkcs8_pem(s) {
            return Ok(k);
        }
        if let Ok(k) = RsaPrivateKey::from_pkcs1_pem(s) {
            return Ok(k);
        }
        return Err(Error::KeyParse);
    }

    if let Ok(k) = RsaPrivateKey::from_pkcs8_der(pem_or_der) {
        return Ok(k);
    }
    RsaPrivateKey::from_pkcs1_der(pem_or_der).map_err(|_| Error::KeyParse)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PRIVATE_KEY_PEM: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/idp_signing_key.pem"
    ));

    #[test]
    fn jwks_from_private_key_round_trips_public_key() -> Result<(), Error> {
        let jwks = Jwks::from_rsa_private_key_pem_or_der(TEST_PRIVATE_KEY_PEM.as_bytes(), "k1")?;
        let jwk = jwks.find_by_kid("k1").ok_or(Error::KeyParse)?;
        assert_eq!(jwk.kty, "RSA");
        assert!(jwk.is_signing_key());

        let private_key = decode_private_key(TEST_PRIVATE_KEY_PEM.as_bytes())?;
        assert_eq!(jwk.to_rsa_public_key()?, RsaPublicKey::from(&private_key));
        Ok(())
    }

    #[test]
    fn from_json_skips_non_rsa_keys() -> Result<(), serde_json::Error> {
        let json = r#"{"keys":[
            {"kty":"EC","crv":"P-256","kid":"ec","x":"AA","y":"AA"},
            {"kty":"RSA","kid":"rsa","n":"AQAB","e":"AQAB","use":"sig"}
        ]}"#;
        let jwks = Jwks::from_json(json)?;
        assert_eq!(jwks.keys.len(), 1);
        assert!(jwks.find_by_kid("rsa").is_some());
        assert!(jwks.find_by_kid("ec").is_none());
        Ok(())
    }

    #[test]
    fn encryption_keys_are_not_signing_keys() {
        let jwk = Jwk {
            kty: "RSA".to_string(),
            alg: None,
            key_use: Some("enc".to_string()),
            kid: "enc".to_string(),
            n: "AQAB".to_string(),
            e: "AQAB".to_string(),
        };
        assert!(!jwk.is_signing_key());
    }

    #[test]
    fn rejects_garbage_key_material() {
        assert!(matches!(
            Jwks::from_rsa_private_key_pem_or_der(b"not a key", "k"),
            Err(Error::KeyParse)
        ));
    }
}
