//! Signed-cookie session store
//!
//! The login flow's state machine is an explicit tagged type,
//! [`SessionState`], serialized into a single HS256-signed cookie. One
//! cookie holding the whole state means a successful callback consumes the
//! pending login attempt in the same write that establishes the
//! authenticated session; there is no separate record to leak or replay.
//!
//! Tampered, expired, or absent cookies all decode to
//! [`SessionState::Anonymous`].

use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponseParts, ResponseParts};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::access::Role;
use crate::oauth2::{AuthError, LoginAttempt};
use crate::token::Claims;

/// Lifetime of a pending login attempt's cookie.
const PENDING_MAX_AGE_SECS: i64 = 600;

/// Where the browser is in the login flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "phase", content = "data", rename_all = "snake_case")]
pub enum SessionState {
    /// No session
    Anonymous,
    /// Redirected to the provider, waiting for the callback
    PendingLogin(LoginAttempt),
    /// Verified and gate-approved identity
    Authenticated(SessionUser),
}

impl SessionState {
    /// The authenticated user, if this session has one.
    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Minimal claim subset persisted for an authenticated browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    /// Provider's stable subject identifier
    pub subject: String,
    /// Email address
    pub email: String,
    /// Display name
    pub name: Option<String>,
    /// Avatar URL
    pub picture: Option<String>,
    /// Hosted domain claim, when present
    pub hosted_domain: Option<String>,
    /// Granted role
    pub role: Role,
}

impl SessionUser {
    /// Build the persisted subset from verified claims and the granted
    /// role.
    #[must_use]
    pub fn from_claims(claims: &Claims, role: Role) -> Self {
        Self {
            subject: claims.sub.clone(),
            email: claims.email.clone().unwrap_or_default(),
            name: claims.name.clone(),
            picture: claims.picture.clone(),
            hosted_domain: claims.hd.clone(),
            role,
        }
    }

    /// Whether this user holds the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Cookie attributes for the session cookie.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// Cookie name
    pub name: String,
    /// Max-Age for authenticated sessions, in seconds
    pub max_age_secs: i64,
    /// Whether to set the `Secure` attribute
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: "oidc_session".to_string(),
            max_age_secs: 86400, // 24 hours
            secure: !cfg!(debug_assertions),
        }
    }
}

// Signed payload: the state plus standard time claims
#[derive(Debug, Serialize, Deserialize)]
struct CookieClaims {
    exp: i64,
    iat: i64,
    #[serde(flatten)]
    state: SessionState,
}

/// Signs and verifies session cookies with the process secret.
#[derive(Clone)]
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    settings: std::sync::Arc<CookieSettings>,
}

impl SessionCodec {
    /// Create a codec from the process session secret.
    #[must_use]
    pub fn new(secret: &str, settings: CookieSettings) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            settings: std::sync::Arc::new(settings),
        }
    }

    /// Cookie name this codec reads and writes.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.settings.name
    }

    /// Produce the `Set-Cookie` for a new session state.
    ///
    /// `Anonymous` clears the cookie; the other states are signed with a
    /// TTL appropriate to the phase (pending logins are short-lived).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionWrite`] if signing fails.
    pub fn issue(&self, state: SessionState) -> Result<SessionCookie, AuthError> {
        let max_age = match &state {
            SessionState::Anonymous => {
                return Ok(self.clear_cookie());
            }
            SessionState::PendingLogin(_) => PENDING_MAX_AGE_SECS,
            SessionState::Authenticated(_) => self.settings.max_age_secs,
        };

        let now = Utc::now().timestamp();
        let payload = CookieClaims {
            exp: now + max_age,
            iat: now,
            state,
        };

        let token = jsonwebtoken::encode(&Header::default(), &payload, &self.encoding)
            .map_err(|e| AuthError::SessionWrite(e.to_string()))?;

        Ok(SessionCookie {
            header_value: self.format_cookie(&token, max_age),
        })
    }

    /// `Set-Cookie` that removes the session cookie.
    #[must_use]
    pub fn clear_cookie(&self) -> SessionCookie {
        SessionCookie {
            header_value: self.format_cookie("", 0),
        }
    }

    /// Decode a cookie value into a session state.
    ///
    /// Any failure (bad signature, expired, malformed) yields `Anonymous`;
    /// a broken cookie is indistinguishable from no cookie.
    #[must_use]
    pub fn decode(&self, cookie_value: &str) -> SessionState {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        match jsonwebtoken::decode::<CookieClaims>(cookie_value, &self.decoding, &validation) {
            Ok(data) => data.claims.state,
            Err(e) => {
                tracing::debug!(error = %e, "discarding undecodable session cookie");
                SessionState::Anonymous
            }
        }
    }

    fn format_cookie(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={value}; Path=/; Max-Age={max_age}; SameSite=Lax; HttpOnly",
            self.settings.name
        );
        if self.settings.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// A staged `Set-Cookie` header carrying a session state change.
///
/// Returned from handlers alongside the response body; axum merges it into
/// the response headers.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    header_value: String,
}

impl SessionCookie {
    /// The raw `Set-Cookie` header value.
    #[must_use]
    pub fn header_value(&self) -> &str {
        &self.header_value
    }
}

impl IntoResponseParts for SessionCookie {
    type Error = std::convert::Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if let Ok(value) = self.header_value.parse() {
            res.headers_mut().append(SET_COOKIE, value);
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> SessionCodec {
        SessionCodec::new("a-long-test-session-secret", CookieSettings::default())
    }

    fn user() -> SessionUser {
        SessionUser {
            subject: "subject-1".to_string(),
            email: "a@example.com".to_string(),
            name: Some("A".to_string()),
            picture: None,
            hosted_domain: None,
            role: Role::User,
        }
    }

    fn token_of(cookie: &SessionCookie, name: &str) -> String {
        let value = cookie.header_value();
        let rest = value.strip_prefix(&format!("{name}=")).unwrap();
        rest.split(';').next().unwrap().to_string()
    }

    #[test]
    fn authenticated_state_round_trips() {
        let codec = codec();
        let cookie = codec.issue(SessionState::Authenticated(user())).unwrap();
        let token = token_of(&cookie, codec.cookie_name());

        match codec.decode(&token) {
            SessionState::Authenticated(u) => {
                assert_eq!(u.email, "a@example.com");
                assert_eq!(u.role, Role::User);
            }
            other => panic!("expected Authenticated, got {other:?}"),
        }
    }

    #[test]
    fn pending_login_round_trips_with_attempt_intact() {
        let codec = codec();
        let attempt = LoginAttempt::generate();
        let state = attempt.state.clone();
        let verifier = attempt.code_verifier.clone();

        let cookie = codec.issue(SessionState::PendingLogin(attempt)).unwrap();
        let token = token_of(&cookie, codec.cookie_name());

        match codec.decode(&token) {
            SessionState::PendingLogin(a) => {
                assert_eq!(a.state, state);
                assert_eq!(a.code_verifier, verifier);
            }
            other => panic!("expected PendingLogin, got {other:?}"),
        }
    }

    #[test]
    fn tampered_cookie_decodes_to_anonymous() {
        let codec = codec();
        let cookie = codec.issue(SessionState::Authenticated(user())).unwrap();
        let mut token = token_of(&cookie, codec.cookie_name());
        token.push('x');

        assert!(matches!(codec.decode(&token), SessionState::Anonymous));
    }

    #[test]
    fn cookie_signed_with_other_secret_decodes_to_anonymous() {
        let codec_a = codec();
        let codec_b = SessionCodec::new("another-secret-entirely", CookieSettings::default());

        let cookie = codec_a.issue(SessionState::Authenticated(user())).unwrap();
        let token = token_of(&cookie, codec_a.cookie_name());

        assert!(matches!(codec_b.decode(&token), SessionState::Anonymous));
    }

    #[test]
    fn garbage_decodes_to_anonymous() {
        assert!(matches!(codec().decode("garbage"), SessionState::Anonymous));
    }

    #[test]
    fn anonymous_issue_clears_the_cookie() {
        let codec = codec();
        let cookie = codec.issue(SessionState::Anonymous).unwrap();
        assert!(cookie.header_value().contains("Max-Age=0"));
        assert!(cookie
            .header_value()
            .starts_with(&format!("{}=;", codec.cookie_name())));
    }

    #[test]
    fn cookie_is_http_only_and_lax() {
        let codec = codec();
        let cookie = codec.issue(SessionState::Authenticated(user())).unwrap();
        assert!(cookie.header_value().contains("HttpOnly"));
        assert!(cookie.header_value().contains("SameSite=Lax"));
        assert!(cookie.header_value().contains("Path=/"));
    }
}
