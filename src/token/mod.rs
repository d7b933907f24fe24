//! ID token verification
//!
//! Splits verification into two halves so each is testable on its own:
//! signature checking (delegated to `jsonwebtoken` against the provider's
//! JWKS, see [`JwksVerifier`]) and pure claim validation
//! ([`Claims::validate`]) covering issuer, audience, expiry, and the
//! used-too-early clock guard.
//!
//! The concrete verifier hides behind the [`IdTokenVerifier`] capability
//! trait so the cryptographic backend is swappable; tests substitute a stub
//! that returns canned claims.

mod jwks;

pub use jwks::JwksVerifier;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::oauth2::AuthError;

/// Leeway applied to the `iat` clock-skew guard.
pub const IAT_LEEWAY_SECS: i64 = 60;

/// Verified (or to-be-verified) ID token claims.
///
/// Only trusted after [`Claims::validate`] has passed on a
/// signature-checked token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the provider's stable user identifier
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Audience (the client ID the token was minted for)
    pub aud: String,
    /// Issued-at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    /// Email address
    pub email: Option<String>,
    /// Whether the provider has verified the email address
    #[serde(default)]
    pub email_verified: bool,
    /// Display name
    pub name: Option<String>,
    /// Avatar URL
    pub picture: Option<String>,
    /// Hosted domain (organizational accounts only)
    pub hd: Option<String>,
}

impl Claims {
    /// Validate issuer, audience, expiry, and the not-used-too-early guard
    /// against the expected values at `now`.
    ///
    /// Pure over its inputs; signature validity is a precondition checked
    /// separately, so a bad expiry fails here the same way whether or not
    /// the signature would have passed.
    ///
    /// # Errors
    ///
    /// Returns the first failing check: [`AuthError::IssuerMismatch`],
    /// [`AuthError::AudienceMismatch`], [`AuthError::TokenExpired`], or
    /// [`AuthError::TokenNotYetValid`].
    pub fn validate(
        &self,
        expected_issuer: &str,
        expected_audience: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        if self.iss != expected_issuer {
            return Err(AuthError::IssuerMismatch {
                expected: expected_issuer.to_owned(),
                found: self.iss.clone(),
            });
        }

        if self.aud != expected_audience {
            return Err(AuthError::AudienceMismatch {
                expected: expected_audience.to_owned(),
                found: self.aud.clone(),
            });
        }

        let now = now.timestamp();
        if now >= self.exp {
            return Err(AuthError::TokenExpired);
        }
        if self.iat - IAT_LEEWAY_SECS > now {
            return Err(AuthError::TokenNotYetValid);
        }

        Ok(())
    }
}

/// Capability interface for ID token verification.
///
/// `verify` takes the compact token and the current time and returns parsed
/// claims only when the signature and every claim check pass.
#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    /// Verify `id_token` as of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidSignature`] when the signature cannot be
    /// verified, or the specific claim-check failure otherwise.
    async fn verify(&self, id_token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ISSUER: &str = "https://accounts.google.com";
    const CLIENT_ID: &str = "lab-client-id";

    fn claims_at(iat: i64, exp: i64) -> Claims {
        Claims {
            sub: "subject-1".to_string(),
            iss: ISSUER.to_string(),
            aud: CLIENT_ID.to_string(),
            iat,
            exp,
            email: Some("a@example.com".to_string()),
            email_verified: true,
            name: None,
            picture: None,
            hd: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn valid_claims_pass() {
        let t = now().timestamp();
        let claims = claims_at(t - 10, t + 3600);
        assert!(claims.validate(ISSUER, CLIENT_ID, now()).is_ok());
    }

    #[test]
    fn expired_token_fails_regardless_of_other_claims() {
        let t = now().timestamp();
        let claims = claims_at(t - 7200, t - 3600);
        assert!(matches!(
            claims.validate(ISSUER, CLIENT_ID, now()),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn token_issued_in_future_fails_as_not_yet_valid() {
        let t = now().timestamp();
        let claims = claims_at(t + 300, t + 3900);
        assert!(matches!(
            claims.validate(ISSUER, CLIENT_ID, now()),
            Err(AuthError::TokenNotYetValid)
        ));
    }

    #[test]
    fn small_clock_skew_on_iat_is_tolerated() {
        let t = now().timestamp();
        let claims = claims_at(t + IAT_LEEWAY_SECS - 1, t + 3600);
        assert!(claims.validate(ISSUER, CLIENT_ID, now()).is_ok());
    }

    #[test]
    fn wrong_issuer_fails() {
        let t = now().timestamp();
        let mut claims = claims_at(t - 10, t + 3600);
        claims.iss = "https://evil.example".to_string();
        assert!(matches!(
            claims.validate(ISSUER, CLIENT_ID, now()),
            Err(AuthError::IssuerMismatch { .. })
        ));
    }

    #[test]
    fn wrong_audience_fails() {
        let t = now().timestamp();
        let mut claims = claims_at(t - 10, t + 3600);
        claims.aud = "some-other-client".to_string();
        assert!(matches!(
            claims.validate(ISSUER, CLIENT_ID, now()),
            Err(AuthError::AudienceMismatch { .. })
        ));
    }

    #[test]
    fn issuer_checked_before_time_claims() {
        // An expired token from the wrong issuer reports the issuer first
        let t = now().timestamp();
        let mut claims = claims_at(t - 7200, t - 3600);
        claims.iss = "https://evil.example".to_string();
        assert!(matches!(
            claims.validate(ISSUER, CLIENT_ID, now()),
            Err(AuthError::IssuerMismatch { .. })
        ));
    }
}
