//! Session extractors for axum handlers
//!
//! The session middleware decodes the cookie and stashes a
//! [`SessionState`] in the request extensions; these extractors read it
//! back out.
//!
//! # Examples
//!
//! ```rust,no_run
//! use oidc_lab::auth::{Authenticated, SessionUser};
//!
//! async fn protected_handler(Authenticated(user): Authenticated) -> String {
//!     format!("Hello, {}!", user.email)
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};

use super::{SessionState, SessionUser};

/// The full session state for the current browser.
///
/// Always succeeds; browsers with no (or an undecodable) cookie get
/// [`SessionState::Anonymous`].
pub struct CurrentSession(pub SessionState);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<SessionState>()
            .cloned()
            .unwrap_or(SessionState::Anonymous);
        Ok(Self(session))
    }
}

/// Authenticated user extractor for protected routes.
///
/// Rejects anonymous (and pending-login) browsers with a redirect to the
/// home page.
pub struct Authenticated(pub SessionUser);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = NotAuthenticated;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionState>()
            .and_then(SessionState::user)
            .cloned()
            .map(Self)
            .ok_or(NotAuthenticated)
    }
}

/// Optional authentication extractor.
///
/// Returns `Some(user)` for authenticated browsers, `None` otherwise;
/// never rejects.
pub struct OptionalAuth(pub Option<SessionUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<SessionState>()
            .and_then(SessionState::user)
            .cloned();
        Ok(Self(user))
    }
}

/// Rejection for [`Authenticated`]: back to the home page.
#[derive(Debug)]
pub struct NotAuthenticated;

impl IntoResponse for NotAuthenticated {
    fn into_response(self) -> Response {
        Redirect::to("/").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use axum::http::Request;

    fn user() -> SessionUser {
        SessionUser {
            subject: "subject-1".to_string(),
            email: "a@example.com".to_string(),
            name: None,
            picture: None,
            hosted_domain: None,
            role: Role::Admin,
        }
    }

    fn parts_with(state: Option<SessionState>) -> Parts {
        let mut request = Request::builder().uri("/").body(()).unwrap();
        if let Some(state) = state {
            request.extensions_mut().insert(state);
        }
        request.into_parts().0
    }

    #[tokio::test]
    async fn authenticated_extracts_user() {
        let mut parts = parts_with(Some(SessionState::Authenticated(user())));
        let Authenticated(user) = Authenticated::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(user.email, "a@example.com");
        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn authenticated_rejects_anonymous() {
        let mut parts = parts_with(Some(SessionState::Anonymous));
        assert!(Authenticated::from_request_parts(&mut parts, &())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn authenticated_rejects_pending_login() {
        let attempt = crate::oauth2::LoginAttempt::generate();
        let mut parts = parts_with(Some(SessionState::PendingLogin(attempt)));
        assert!(Authenticated::from_request_parts(&mut parts, &())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn optional_auth_is_none_without_extension() {
        let mut parts = parts_with(None);
        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn current_session_defaults_to_anonymous() {
        let mut parts = parts_with(None);
        let CurrentSession(state) = CurrentSession::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(matches!(state, SessionState::Anonymous));
    }
}
