//! oidc-lab: a minimal OpenID Connect login application
//!
//! Demonstrates the moving parts of an OIDC login flow with nothing hidden:
//!
//! - **Authorization Code flow with PKCE** against an OIDC identity provider
//!   (Google-shaped by default, any provider via discovery or manual
//!   endpoint configuration)
//! - **Server-side ID token verification** against the provider's JWKS
//! - **Role/domain access control** over the verified claims
//! - **Signed session cookie** carrying the login state machine
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use oidc_lab::{config::AppConfig, state::AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     oidc_lab::observability::init()?;
//!
//!     let config = AppConfig::load()?;
//!     let state = AppState::from_config(config).await?;
//!     let app = oidc_lab::router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Login state machine
//!
//! `Anonymous → (redirect) → PendingLogin → (callback) → Authenticated`,
//! with every failure collapsing back to `Anonymous` plus a rendered error
//! page. The state is an explicit tagged type ([`auth::SessionState`])
//! stored in one signed cookie, so a successful callback consumes the
//! pending login attempt atomically.

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod oauth2;
pub mod observability;
pub mod state;
pub mod token;

use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::middleware::SessionLayer;
use crate::state::AppState;

/// Build the application router with all routes and middleware attached.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/login", get(handlers::login))
        .route("/callback", get(handlers::callback))
        .route("/success", get(handlers::success))
        .route("/admin", get(handlers::admin))
        .route("/logout", get(handlers::logout))
        .layer(SessionLayer::new(&state))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .with_state(state)
}

pub mod prelude {
    //! Convenience re-exports for common types

    pub use crate::access::{AccessPolicy, Role};
    pub use crate::auth::{Authenticated, OptionalAuth, SessionState, SessionUser};
    pub use crate::config::AppConfig;
    pub use crate::error::AppError;
    pub use crate::oauth2::{AuthError, LoginAttempt, OidcProvider, TokenSet};
    pub use crate::state::AppState;
    pub use crate::token::{Claims, IdTokenVerifier};
}
