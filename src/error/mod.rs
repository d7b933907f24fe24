//! Error types and user-facing error rendering
//!
//! The callback handler is the single aggregation point: every failure in
//! the login flow arrives here as an [`AuthError`] kind and leaves as a
//! rendered error page. Internal detail (provider error bodies, signature
//! library messages) goes to the logs, never to the browser.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::oauth2::AuthError;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Login flow failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Malformed request (missing callback parameters and the like)
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server fault
    #[error("server error: {0}")]
    Server(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(AuthError::StateMismatch | AuthError::DomainNotAllowed(_)) => {
                StatusCode::FORBIDDEN
            }
            Self::Auth(AuthError::SessionWrite(_)) | Self::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Short title for the error page.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Auth(err) => match err {
                AuthError::StateMismatch => "State mismatch",
                AuthError::ExchangeFailed(_) => "Token exchange failed",
                AuthError::InvalidSignature(_) => "ID token verification failed",
                AuthError::IssuerMismatch { .. } => "Issuer mismatch",
                AuthError::AudienceMismatch { .. } => "Audience mismatch",
                AuthError::TokenExpired => "Token expired",
                AuthError::TokenNotYetValid => "Token used too early",
                AuthError::DomainNotAllowed(_) => "Access denied",
                AuthError::SessionWrite(_) => "Server error",
            },
            Self::BadRequest(_) => "Bad request",
            Self::Server(_) => "Server error",
        }
    }

    /// Message shown to the browser. Infrastructure faults get a generic
    /// line; recoverable kinds get an actionable one.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(err) => match err {
                AuthError::StateMismatch => {
                    "The login response did not match this browser's login attempt. \
                     Start the login again."
                        .to_string()
                }
                AuthError::ExchangeFailed(_) => {
                    "The identity provider rejected the sign-in. Start the login again."
                        .to_string()
                }
                AuthError::InvalidSignature(_) => {
                    "The identity token could not be verified.".to_string()
                }
                AuthError::TokenNotYetValid => {
                    "The identity token was used before it became valid. \
                     Check that this machine's clock is correct."
                        .to_string()
                }
                AuthError::DomainNotAllowed(domain) => {
                    format!("Only {domain} accounts are allowed.")
                }
                AuthError::SessionWrite(_) => "Something went wrong on our side.".to_string(),
                other => other.to_string(),
            },
            Self::BadRequest(msg) => msg.clone(),
            Self::Server(_) => "Something went wrong on our side.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorPage {
    title: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Full detail stays in the logs
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "login flow failed");
        }

        let page = ErrorPage {
            title: self.title(),
            message: self.user_message(),
        };

        match page.render() {
            Ok(body) => (status, Html(body)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "error page failed to render");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_mismatch_is_forbidden() {
        let err = AppError::from(AuthError::StateMismatch);
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn domain_denial_is_forbidden_and_names_the_domain() {
        let err = AppError::from(AuthError::DomainNotAllowed("example.com".to_string()));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert!(err.user_message().contains("example.com"));
    }

    #[test]
    fn session_write_is_a_generic_500() {
        let err = AppError::from(AuthError::SessionWrite("disk on fire".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.user_message().contains("disk on fire"));
    }

    #[test]
    fn exchange_detail_is_not_shown_to_the_browser() {
        let err = AppError::from(AuthError::ExchangeFailed(
            "invalid_grant: provider internals".to_string(),
        ));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(!err.user_message().contains("provider internals"));
    }

    #[test]
    fn token_expiry_is_a_bad_request() {
        let err = AppError::from(AuthError::TokenExpired);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
