//! Session middleware
//!
//! Decodes the signed session cookie on every request and inserts the
//! resulting [`SessionState`] into the request extensions, where the
//! extractors in [`crate::auth`] pick it up. Handlers that change the
//! session return a [`crate::auth::SessionCookie`] themselves; this
//! middleware is read-only.

use axum::{
    body::Body,
    extract::Request,
    http::header::COOKIE,
    response::Response,
};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::auth::{SessionCodec, SessionState};
use crate::state::AppState;

/// Layer attaching [`SessionMiddleware`] with the app's session codec.
#[derive(Clone)]
pub struct SessionLayer {
    codec: Arc<SessionCodec>,
}

impl SessionLayer {
    /// Create the layer from application state.
    #[must_use]
    pub fn new(state: &AppState) -> Self {
        Self {
            codec: state.sessions_arc(),
        }
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionMiddleware {
            inner,
            codec: self.codec.clone(),
        }
    }
}

/// Middleware that resolves the session cookie into a [`SessionState`].
#[derive(Clone)]
pub struct SessionMiddleware<S> {
    inner: S,
    codec: Arc<SessionCodec>,
}

impl<S> Service<Request> for SessionMiddleware<S>
where
    S: Service<Request, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let session = extract_cookie(&req, self.codec.cookie_name())
            .map_or(SessionState::Anonymous, |value| self.codec.decode(&value));

        req.extensions_mut().insert(session);

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await })
    }
}

/// Pull the session cookie value out of the request's Cookie header.
fn extract_cookie(req: &Request, cookie_name: &str) -> Option<String> {
    let cookie_header = req.headers().get(COOKIE)?;
    let cookie_str = cookie_header.to_str().ok()?;

    for cookie in cookie_str.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=') {
            if name.trim() == cookie_name {
                return Some(value.trim().to_string());
            }
        }
    }

    None
}
