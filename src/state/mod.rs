//! Application state
//!
//! Everything a request handler needs, constructed once at startup and
//! shared read-only across requests: the configuration, the access policy,
//! the provider client, the ID token verifier, and the session codec.

use std::sync::Arc;

use crate::access::AccessPolicy;
use crate::auth::SessionCodec;
use crate::config::AppConfig;
use crate::oauth2::OidcProvider;
use crate::token::{IdTokenVerifier, JwksVerifier};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    policy: Arc<AccessPolicy>,
    provider: Arc<OidcProvider>,
    verifier: Arc<dyn IdTokenVerifier>,
    sessions: Arc<SessionCodec>,
}

impl AppState {
    /// Build state from configuration: provider endpoints via discovery or
    /// manual settings, and a JWKS-backed verifier.
    ///
    /// # Errors
    ///
    /// Returns an error if provider construction or discovery fails.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let redirect_uri = config.redirect_uri();

        let provider = if config.provider.discover {
            OidcProvider::discover(
                &config.provider.client_id,
                &config.provider.client_secret,
                &redirect_uri,
                &config.provider.issuer,
            )
            .await?
        } else {
            OidcProvider::new(
                &config.provider.client_id,
                &config.provider.client_secret,
                &redirect_uri,
                config.provider.endpoints(),
            )?
        };

        let verifier = JwksVerifier::new(
            provider.endpoints().jwks_url.clone(),
            provider.endpoints().issuer.clone(),
            config.provider.client_id.clone(),
        )?;

        Ok(Self::with_verifier(config, provider, Arc::new(verifier)))
    }

    /// Build state with an injected verifier (used by tests to substitute
    /// the cryptographic backend).
    #[must_use]
    pub fn with_verifier(
        config: AppConfig,
        provider: OidcProvider,
        verifier: Arc<dyn IdTokenVerifier>,
    ) -> Self {
        let policy = config.policy();
        let sessions = SessionCodec::new(
            &config.session.secret,
            config.session.cookie_settings(),
        );

        Self {
            config: Arc::new(config),
            policy: Arc::new(policy),
            provider: Arc::new(provider),
            verifier,
            sessions: Arc::new(sessions),
        }
    }

    /// Configuration handle.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Access policy handle.
    #[must_use]
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Provider client handle.
    #[must_use]
    pub fn provider(&self) -> &OidcProvider {
        &self.provider
    }

    /// ID token verifier handle.
    #[must_use]
    pub fn verifier(&self) -> &dyn IdTokenVerifier {
        self.verifier.as_ref()
    }

    /// Session codec handle.
    #[must_use]
    pub fn sessions(&self) -> &SessionCodec {
        &self.sessions
    }

    /// Shared session codec for the middleware layer.
    #[must_use]
    pub(crate) fn sessions_arc(&self) -> Arc<SessionCodec> {
        self.sessions.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloned_state_shares_config() {
        let config = AppConfig::default();
        let provider = OidcProvider::new(
            &config.provider.client_id,
            &config.provider.client_secret,
            &config.redirect_uri(),
            config.provider.endpoints(),
        )
        .unwrap();
        let verifier = JwksVerifier::new(
            config.provider.jwks_url.clone(),
            config.provider.issuer.clone(),
            config.provider.client_id.clone(),
        )
        .unwrap();

        let state = AppState::with_verifier(config, provider, Arc::new(verifier));
        let cloned = state.clone();
        assert!(Arc::ptr_eq(&state.config, &cloned.config));
    }
}
