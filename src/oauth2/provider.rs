//! OIDC provider client
//!
//! Wraps the `oauth2` crate's typed client with the two things this app
//! needs from a provider: building the authorization redirect and
//! exchanging an authorization code (plus PKCE verifier) for tokens.
//! Endpoints come either from OIDC discovery on the issuer URL or from
//! manual configuration; the defaults are Google's endpoints.

use anyhow::Context;
use oauth2::{
    basic::{BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse, BasicTokenType},
    AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, ExtraTokenFields, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl,
    RequestTokenError, Scope, StandardRevocableToken, StandardTokenResponse, TokenResponse,
    TokenUrl,
};
use openidconnect::{core::CoreProviderMetadata, IssuerUrl};
use serde::{Deserialize, Serialize};

use super::http::{provider_client, send_request};
use super::types::{AuthError, LoginAttempt, TokenSet};

/// Extra token-response fields: OIDC providers return the ID token next to
/// the plain OAuth2 fields.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IdTokenFields {
    /// Compact signed ID token
    pub id_token: Option<String>,
}

impl ExtraTokenFields for IdTokenFields {}

/// Token response carrying an ID token.
pub type OidcTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;

// Client with auth and token endpoints set
type ConfiguredClient = Client<
    BasicErrorResponse,
    OidcTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,    // HasAuthUrl
    EndpointNotSet, // HasDeviceAuthUrl
    EndpointNotSet, // HasIntrospectionUrl
    EndpointNotSet, // HasRevocationUrl
    EndpointSet,    // HasTokenUrl
>;

/// Resolved provider endpoints, whether discovered or configured manually.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    /// Authorization endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
    /// JWKS endpoint for ID token signature verification
    pub jwks_url: String,
    /// Issuer the ID token's `iss` claim must match
    pub issuer: String,
}

/// OIDC provider client.
pub struct OidcProvider {
    client: ConfiguredClient,
    endpoints: ProviderEndpoints,
    http: reqwest::Client,
}

impl OidcProvider {
    /// Build a provider from manually configured endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if any endpoint or the redirect URI is not a valid
    /// URL.
    pub fn new(
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
        endpoints: ProviderEndpoints,
    ) -> anyhow::Result<Self> {
        let client = Client::new(ClientId::new(client_id.to_owned()))
            .set_client_secret(ClientSecret::new(client_secret.to_owned()))
            .set_auth_uri(
                AuthUrl::new(endpoints.auth_url.clone()).context("invalid auth URL")?,
            )
            .set_token_uri(
                TokenUrl::new(endpoints.token_url.clone()).context("invalid token URL")?,
            )
            .set_redirect_uri(
                RedirectUrl::new(redirect_uri.to_owned()).context("invalid redirect URI")?,
            );

        let http = provider_client().context("failed to build provider HTTP client")?;

        Ok(Self {
            client,
            endpoints,
            http,
        })
    }

    /// Build a provider by running OIDC discovery against an issuer URL.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails or the provider metadata is
    /// missing a token endpoint.
    pub async fn discover(
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
        issuer: &str,
    ) -> anyhow::Result<Self> {
        let issuer_url = IssuerUrl::new(issuer.to_owned()).context("invalid issuer URL")?;

        let http = provider_client().context("failed to build provider HTTP client")?;
        let metadata = CoreProviderMetadata::discover_async(issuer_url, &move |request| {
            let http = http.clone();
            async move { send_request(http, request).await }
        })
        .await
        .context("OIDC discovery failed")?;

        let endpoints = ProviderEndpoints {
            auth_url: metadata.authorization_endpoint().to_string(),
            token_url: metadata
                .token_endpoint()
                .context("provider metadata has no token endpoint")?
                .to_string(),
            jwks_url: metadata.jwks_uri().to_string(),
            issuer: metadata.issuer().to_string(),
        };

        Self::new(client_id, client_secret, redirect_uri, endpoints)
    }

    /// Resolved endpoints for this provider.
    #[must_use]
    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    /// Build the authorization URL for one login attempt.
    ///
    /// Carries the attempt's state token and PKCE S256 challenge, the
    /// requested scopes, and `hd=<domain>` when domain enforcement is on so
    /// the provider pre-filters its account chooser. `access_type=offline`
    /// and `prompt=consent` match what the consent screen of a lab setup
    /// expects.
    #[must_use]
    pub fn authorization_url(
        &self,
        attempt: &LoginAttempt,
        scopes: &[String],
        hosted_domain: Option<&str>,
    ) -> String {
        let challenge = PkceCodeChallenge::from_code_verifier_sha256(&PkceCodeVerifier::new(
            attempt.code_verifier.clone(),
        ));
        let state = CsrfToken::new(attempt.state.clone());

        let mut request = self
            .client
            .authorize_url(|| state)
            .set_pkce_challenge(challenge)
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent");

        for scope in scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        if let Some(domain) = hosted_domain {
            request = request.add_extra_param("hd", domain);
        }

        let (url, _state) = request.url();
        url.to_string()
    }

    /// Exchange an authorization code (plus the attempt's PKCE verifier)
    /// for a [`TokenSet`].
    ///
    /// Applies one retry on a connection-level failure; provider-side
    /// rejections (`invalid_grant`, expired code, wrong redirect URI) fail
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ExchangeFailed`] on any non-success outcome,
    /// including a response with no ID token.
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<TokenSet, AuthError> {
        let response = match self.try_exchange(code, pkce_verifier).await {
            Err(RequestTokenError::Request(e)) => {
                tracing::warn!(error = %e, "token exchange request failed, retrying once");
                self.try_exchange(code, pkce_verifier)
                    .await
                    .map_err(|e| AuthError::ExchangeFailed(e.to_string()))?
            }
            Err(e) => return Err(AuthError::ExchangeFailed(e.to_string())),
            Ok(response) => response,
        };

        let id_token = response
            .extra_fields()
            .id_token
            .clone()
            .ok_or_else(|| {
                AuthError::ExchangeFailed("provider response contained no ID token".to_string())
            })?;

        Ok(TokenSet {
            id_token,
            access_token: response.access_token().secret().clone(),
            expires_in: response.expires_in(),
        })
    }

    async fn try_exchange(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<
        OidcTokenResponse,
        RequestTokenError<reqwest::Error, BasicErrorResponse>,
    > {
        let http = self.http.clone();
        self.client
            .exchange_code(AuthorizationCode::new(code.to_owned()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_owned()))
            .request_async(&move |request| {
                let http = http.clone();
                async move { send_request(http, request).await }
            })
            .await
    }
}

impl ProviderEndpoints {
    /// Google's endpoints, the defaults for this lab.
    #[must_use]
    pub fn google() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            jwks_url: "https://www.googleapis.com/oauth2/v3/certs".to_string(),
            issuer: "https://accounts.google.com".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider() -> OidcProvider {
        OidcProvider::new(
            "test-client-id",
            "test-client-secret",
            "http://localhost:8000/callback",
            ProviderEndpoints {
                auth_url: "https://provider.example/authorize".to_string(),
                token_url: "https://provider.example/token".to_string(),
                jwks_url: "https://provider.example/jwks".to_string(),
                issuer: "https://provider.example".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn authorization_url_carries_attempt_and_pkce() {
        let provider = test_provider();
        let attempt = LoginAttempt::generate();
        let scopes = vec!["openid".to_string(), "email".to_string()];

        let url = provider.authorization_url(&attempt, &scopes, None);

        assert!(url.starts_with("https://provider.example/authorize"));
        assert!(url.contains("client_id=test-client-id"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains(&format!("state={}", attempt.state)));
        assert!(url.contains(&format!("code_challenge={}", attempt.code_challenge)));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("scope=openid+email"));
        assert!(!url.contains("hd="));
    }

    #[test]
    fn authorization_url_includes_hosted_domain_when_enforced() {
        let provider = test_provider();
        let attempt = LoginAttempt::generate();

        let url = provider.authorization_url(&attempt, &["openid".to_string()], Some("example.com"));

        assert!(url.contains("hd=example.com"));
    }

    #[test]
    fn google_defaults_point_at_google() {
        let endpoints = ProviderEndpoints::google();
        assert!(endpoints.auth_url.starts_with("https://accounts.google.com"));
        assert_eq!(endpoints.issuer, "https://accounts.google.com");
    }
}
