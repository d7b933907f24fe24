//! HTTP handlers for the login flow
//!
//! Route map:
//!
//! - `GET /` — home page (login link, signed-in summary, or setup hint)
//! - `GET /login` — create a login attempt and redirect to the provider
//! - `GET /callback` — complete the flow: state check, code exchange,
//!   ID token verification, access gate, session establishment
//! - `GET /success` — protected page rendering the session claims
//! - `GET /admin` — protected page gated on the admin role
//! - `GET /logout` — clear the session

use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::{Authenticated, CurrentSession, OptionalAuth, SessionState, SessionUser};
use crate::error::AppError;
use crate::oauth2::{AuthError, LoginAttempt};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "home.html")]
struct HomePage {
    user: Option<SessionUser>,
    enforce_domain: Option<String>,
    setup_hint: Option<String>,
}

#[derive(Template)]
#[template(path = "success.html")]
struct SuccessPage {
    user: SessionUser,
}

#[derive(Template)]
#[template(path = "admin.html")]
struct AdminPage {
    user: SessionUser,
    allowed: bool,
}

fn render<T: Template>(page: &T) -> Result<Html<String>, AppError> {
    page.render()
        .map(Html)
        .map_err(|e| AppError::Server(format!("template render failed: {e}")))
}

/// Home page.
pub async fn home(
    State(app): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Html<String>, AppError> {
    render(&HomePage {
        user,
        enforce_domain: app.policy().enforced_domain().map(str::to_owned),
        setup_hint: app.config().setup_hint(),
    })
}

/// Start a login: generate an attempt, remember it in the session, and
/// redirect to the provider's authorization endpoint.
pub async fn login(State(app): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let attempt = LoginAttempt::generate();

    let url = app.provider().authorization_url(
        &attempt,
        &app.config().provider.scopes,
        app.policy().enforced_domain(),
    );

    tracing::debug!(state = %attempt.state, "created login attempt");

    let cookie = app
        .sessions()
        .issue(SessionState::PendingLogin(attempt))?;

    Ok((cookie, Redirect::to(&url)))
}

/// Callback query parameters from the identity provider.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    /// Authorization code
    pub code: Option<String>,
    /// State token echoed back by the provider
    pub state: Option<String>,
    /// Error code, when the provider refused to authorize
    pub error: Option<String>,
    /// Human-readable error detail
    pub error_description: Option<String>,
}

/// Complete the login flow.
///
/// This is the sole aggregation point for the flow's error taxonomy: any
/// failure renders an error page (with internal detail kept to the logs)
/// and clears the pending login state.
pub async fn callback(
    State(app): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(params): Query<CallbackParams>,
) -> Response {
    match run_callback(&app, session, params).await {
        Ok(response) => response,
        // Failed attempts leave no partial session behind
        Err(err) => (app.sessions().clear_cookie(), err).into_response(),
    }
}

async fn run_callback(
    app: &AppState,
    session: SessionState,
    params: CallbackParams,
) -> Result<Response, AppError> {
    if let Some(error) = params.error {
        tracing::warn!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or_default(),
            "provider returned an error callback"
        );
        return Err(AuthError::ExchangeFailed(format!("provider returned {error}")).into());
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("missing code parameter".to_string()))?;
    let returned_state = params
        .state
        .ok_or_else(|| AppError::BadRequest("missing state parameter".to_string()))?;

    // The attempt lives in this browser's signed cookie; a callback with
    // no pending attempt has nothing to match against.
    let SessionState::PendingLogin(attempt) = session else {
        tracing::warn!("callback without a pending login attempt");
        return Err(AuthError::StateMismatch.into());
    };

    if returned_state != attempt.state {
        tracing::warn!(
            expected = %attempt.state,
            received = %returned_state,
            "state mismatch (potential CSRF)"
        );
        return Err(AuthError::StateMismatch.into());
    }

    let tokens = app
        .provider()
        .exchange_code(&code, &attempt.code_verifier)
        .await?;

    let claims = app.verifier().verify(&tokens.id_token, Utc::now()).await?;

    let role = app.policy().evaluate(&claims)?;

    let user = SessionUser::from_claims(&claims, role);
    tracing::info!(email = %user.email, role = role.as_str(), "user authenticated");

    // One write consumes the attempt and establishes the session
    let cookie = app.sessions().issue(SessionState::Authenticated(user))?;

    Ok((cookie, Redirect::to("/success")).into_response())
}

/// Protected page: the verified session claims.
pub async fn success(Authenticated(user): Authenticated) -> Result<Html<String>, AppError> {
    render(&SuccessPage { user })
}

/// Protected page: admin panel, rendered as denied for non-admins.
pub async fn admin(Authenticated(user): Authenticated) -> Result<Html<String>, AppError> {
    render(&AdminPage {
        allowed: user.is_admin(),
        user,
    })
}

/// Clear the session and return home.
pub async fn logout(State(app): State<AppState>) -> impl IntoResponse {
    (app.sessions().clear_cookie(), Redirect::to("/"))
}
