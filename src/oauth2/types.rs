//! Core login-flow types and the flow-wide error taxonomy

use chrono::{DateTime, Utc};
use oauth2::PkceCodeChallenge;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One in-flight login attempt.
///
/// Created when the browser is redirected to the provider, consumed when the
/// provider redirects back. The whole struct lives inside the browser's own
/// signed session cookie, so attempts are isolated per browser and a
/// successful callback overwrites (consumes) the attempt in the same write
/// that establishes the authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginAttempt {
    /// Anti-CSRF state token, unique per attempt
    pub state: String,
    /// PKCE code verifier (kept server-side, never sent to the provider
    /// until the code exchange)
    pub code_verifier: String,
    /// PKCE S256 code challenge derived from the verifier (transmitted in
    /// the authorization request)
    pub code_challenge: String,
    /// When the attempt was created
    pub created_at: DateTime<Utc>,
}

impl LoginAttempt {
    /// Generate a fresh attempt with a random state token and PKCE pair.
    ///
    /// The state token is 32 random bytes hex-encoded; the PKCE pair comes
    /// from the `oauth2` crate's S256 generator.
    #[must_use]
    pub fn generate() -> Self {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        let state = hex::encode(random_bytes);

        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();

        Self {
            state,
            code_verifier: verifier.secret().clone(),
            code_challenge: challenge.as_str().to_owned(),
            created_at: Utc::now(),
        }
    }
}

/// Result of a successful authorization-code exchange.
///
/// Request-scoped: handed straight to the token verifier and dropped.
#[derive(Debug, Clone)]
pub struct TokenSet {
    /// Compact signed ID token asserting the user's identity
    pub id_token: String,
    /// Opaque access token (unused beyond completeness; this app reads
    /// identity from the ID token, not the userinfo endpoint)
    pub access_token: String,
    /// Lifetime of the access token, when the provider reports one
    pub expires_in: Option<std::time::Duration>,
}

/// Everything that can go wrong between `/login` and a session cookie.
///
/// Each component of the flow fails fast with a specific kind; the callback
/// handler is the sole place these are turned into a user-facing page.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Callback `state` does not match the stored attempt (or no attempt is
    /// pending). Potential CSRF or replay.
    #[error("login state mismatch")]
    StateMismatch,

    /// Authorization-code exchange failed: network error, `invalid_grant`,
    /// expired code, wrong redirect URI, or a provider error callback.
    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),

    /// ID token signature could not be verified against the provider JWKS.
    #[error("ID token signature verification failed: {0}")]
    InvalidSignature(String),

    /// ID token `iss` claim does not match the configured issuer.
    #[error("issuer mismatch: expected {expected}, token has {found}")]
    IssuerMismatch {
        /// Issuer this app was configured to trust
        expected: String,
        /// Issuer the token actually carries
        found: String,
    },

    /// ID token `aud` claim does not match this client ID.
    #[error("audience mismatch: expected {expected}, token has {found}")]
    AudienceMismatch {
        /// Expected audience (the client ID)
        expected: String,
        /// Audience the token actually carries
        found: String,
    },

    /// ID token `exp` is in the past.
    #[error("ID token has expired")]
    TokenExpired,

    /// ID token `iat` is materially in the future. Usually a skewed local
    /// clock; resolved by correcting it.
    #[error("ID token used too early; check the local clock")]
    TokenNotYetValid,

    /// Verified claims belong to a domain outside the enforced one.
    #[error("accounts outside {0} are not allowed")]
    DomainNotAllowed(String),

    /// Signing or serializing the session cookie failed. Infrastructure
    /// fault; surfaced as a generic server error.
    #[error("failed to write session: {0}")]
    SessionWrite(String),
}
