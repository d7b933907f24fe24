//! OAuth 2.0 Authorization Code flow with PKCE
//!
//! Provides the pieces of the outbound half of the login flow: the
//! per-attempt [`LoginAttempt`] (state token + PKCE pair), the provider
//! client [`OidcProvider`] that builds authorization URLs and exchanges
//! authorization codes, and the [`AuthError`] taxonomy shared by the whole
//! flow.

mod http;
mod provider;
mod types;

pub(crate) use http::PROVIDER_TIMEOUT;
pub use provider::{OidcProvider, ProviderEndpoints};
pub use types::{AuthError, LoginAttempt, TokenSet};
