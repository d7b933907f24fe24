//! JWKS-backed ID token verification
//!
//! Fetches the provider's published signing keys and verifies RS256
//! signatures with `jsonwebtoken`. Time and audience checks are disabled at
//! the decode layer; [`Claims::validate`] applies them afterwards so each
//! failure surfaces as its own error kind.
//!
//! The key set is cached behind a `RwLock` and refreshed once when a token
//! arrives with an unknown `kid` (providers rotate keys).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{jwk::JwkSet, Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;

use super::{Claims, IdTokenVerifier};
use crate::oauth2::AuthError;

/// Verifies ID tokens against a JWKS endpoint.
pub struct JwksVerifier {
    jwks_url: String,
    expected_issuer: String,
    expected_audience: String,
    http: reqwest::Client,
    keys: RwLock<Option<JwkSet>>,
}

impl JwksVerifier {
    /// Create a verifier for the given JWKS endpoint, issuer, and audience
    /// (client ID).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        jwks_url: impl Into<String>,
        expected_issuer: impl Into<String>,
        expected_audience: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(crate::oauth2::PROVIDER_TIMEOUT)
            .build()?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            expected_issuer: expected_issuer.into(),
            expected_audience: expected_audience.into(),
            http,
            keys: RwLock::new(None),
        })
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::InvalidSignature(format!("JWKS fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::InvalidSignature(format!(
                "JWKS fetch failed: HTTP {}",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::InvalidSignature(format!("invalid JWKS document: {e}")))
    }

    /// Find the decoding key for `kid`, refreshing the cached set once if
    /// the key is unknown.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(jwks) = self.keys.read().as_ref() {
            if let Some(jwk) = jwks.find(kid) {
                return DecodingKey::from_jwk(jwk)
                    .map_err(|e| AuthError::InvalidSignature(e.to_string()));
            }
        }

        let fresh = self.fetch_keys().await?;
        let key = fresh
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()
            .map_err(|e| AuthError::InvalidSignature(e.to_string()))?;
        *self.keys.write() = Some(fresh);

        key.ok_or_else(|| {
            AuthError::InvalidSignature(format!("no JWKS key matches kid {kid:?}"))
        })
    }
}

#[async_trait]
impl IdTokenVerifier for JwksVerifier {
    async fn verify(&self, id_token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let header = jsonwebtoken::decode_header(id_token)
            .map_err(|e| AuthError::InvalidSignature(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidSignature("token header has no kid".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        // Signature only here; iss/aud/exp/iat are Claims::validate's job so
        // each failure keeps its own error kind.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims::<&str>(&[]);

        let decoded = jsonwebtoken::decode::<Claims>(id_token, &key, &validation)
            .map_err(|e| AuthError::InvalidSignature(e.to_string()))?;

        let claims = decoded.claims;
        claims.validate(&self.expected_issuer, &self.expected_audience, now)?;
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn garbage_token_is_an_invalid_signature() {
        let verifier = JwksVerifier::new(
            "https://provider.example/jwks",
            "https://provider.example",
            "client-id",
        )
        .unwrap();

        let result = verifier.verify("not.a.jwt", Utc::now()).await;
        assert!(matches!(result, Err(AuthError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn token_without_kid_is_rejected_before_any_fetch() {
        let verifier = JwksVerifier::new(
            "https://provider.example/jwks",
            "https://provider.example",
            "client-id",
        )
        .unwrap();

        // A structurally valid JWT signed with HMAC and no kid header
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &serde_json::json!({"sub": "x", "exp": 0}),
            &jsonwebtoken::EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let result = verifier.verify(&token, Utc::now()).await;
        assert!(matches!(result, Err(AuthError::InvalidSignature(_))));
    }
}
