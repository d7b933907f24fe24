//! Configuration
//!
//! All process configuration is loaded once at startup into an immutable
//! [`AppConfig`] and passed by handle into request handlers; there is no
//! ambient global state. Precedence:
//!
//! 1. Environment variables (highest priority, `OIDC_` prefix, `__` for
//!    nesting: `OIDC_PROVIDER__CLIENT_ID`)
//! 2. `./config.toml`
//! 3. Hardcoded defaults (Google endpoints, localhost server)
//!
//! # Example configuration
//!
//! ```toml
//! # config.toml
//! [server]
//! base_url = "http://localhost:8000"
//!
//! [provider]
//! client_id = "...apps.googleusercontent.com"
//! client_secret = "..."
//!
//! [session]
//! secret = "a long random string"
//!
//! [access]
//! admin_emails = ["admin@example.com"]
//! enforce_domain = "example.com"
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::access::AccessPolicy;
use crate::auth::CookieSettings;
use crate::oauth2::ProviderEndpoints;

const PLACEHOLDER_CLIENT_ID: &str = "ENTER_YOUR_CLIENT_ID_HERE";
const PLACEHOLDER_CLIENT_SECRET: &str = "ENTER_YOUR_CLIENT_SECRET_HERE";
const PLACEHOLDER_SESSION_SECRET: &str = "ENTER_A_LONG_RANDOM_STRING_HERE";

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Externally visible base URL; the redirect URI is `{base_url}/callback`
    pub base_url: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

/// Identity provider settings. Defaults point at Google.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// OAuth2 client ID
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Scopes requested at authorization time
    pub scopes: Vec<String>,
    /// Issuer the ID token must be minted by
    pub issuer: String,
    /// Resolve endpoints via OIDC discovery on `issuer` instead of using
    /// the endpoint fields below
    pub discover: bool,
    /// Authorization endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
    /// JWKS endpoint
    pub jwks_url: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        let google = ProviderEndpoints::google();
        Self {
            client_id: PLACEHOLDER_CLIENT_ID.to_string(),
            client_secret: PLACEHOLDER_CLIENT_SECRET.to_string(),
            scopes: vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
            ],
            issuer: google.issuer,
            discover: false,
            auth_url: google.auth_url,
            token_url: google.token_url,
            jwks_url: google.jwks_url,
        }
    }
}

impl ProviderSettings {
    /// Manually configured endpoints from these settings.
    #[must_use]
    pub fn endpoints(&self) -> ProviderEndpoints {
        ProviderEndpoints {
            auth_url: self.auth_url.clone(),
            token_url: self.token_url.clone(),
            jwks_url: self.jwks_url.clone(),
            issuer: self.issuer.clone(),
        }
    }
}

/// Session cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Secret the session cookie is signed with
    pub secret: String,
    /// Cookie name
    pub cookie_name: String,
    /// Authenticated session lifetime in seconds
    pub max_age_secs: i64,
    /// Set the `Secure` cookie attribute
    pub secure: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let defaults = CookieSettings::default();
        Self {
            secret: PLACEHOLDER_SESSION_SECRET.to_string(),
            cookie_name: defaults.name,
            max_age_secs: defaults.max_age_secs,
            secure: defaults.secure,
        }
    }
}

impl SessionSettings {
    /// Cookie attributes derived from these settings.
    #[must_use]
    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            name: self.cookie_name.clone(),
            max_age_secs: self.max_age_secs,
            secure: self.secure,
        }
    }
}

/// Access control settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AccessSettings {
    /// Emails granted the admin role
    pub admin_emails: Vec<String>,
    /// Restrict logins to this domain; empty disables the restriction
    pub enforce_domain: String,
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerSettings,
    /// Identity provider settings
    pub provider: ProviderSettings,
    /// Session cookie settings
    pub session: SessionSettings,
    /// Access control settings
    pub access: AccessSettings,
}

impl AppConfig {
    /// Load configuration with the defaults → `config.toml` → `OIDC_*` env
    /// precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or a value fails type
    /// conversion.
    pub fn load() -> anyhow::Result<Self> {
        let config = Figment::new()
            .merge(Toml::string(&toml::to_string(&Self::default())?))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("OIDC_").split("__").lowercase(true))
            .extract()?;

        Ok(config)
    }

    /// The redirect URI registered with the provider.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}/callback", self.server.base_url.trim_end_matches('/'))
    }

    /// Build the immutable access policy.
    #[must_use]
    pub fn policy(&self) -> AccessPolicy {
        AccessPolicy::new(
            &self.access.admin_emails,
            Some(self.access.enforce_domain.as_str()),
        )
    }

    /// A human-readable setup hint when configuration still carries
    /// placeholder credentials, `None` once the app is configured.
    #[must_use]
    pub fn setup_hint(&self) -> Option<String> {
        if self.provider.client_id.is_empty()
            || self.provider.client_id.contains(PLACEHOLDER_CLIENT_ID)
        {
            return Some(
                "Missing provider.client_id — edit config.toml (or set OIDC_PROVIDER__CLIENT_ID) and restart.".to_string(),
            );
        }
        if self.provider.client_secret.is_empty()
            || self.provider.client_secret == PLACEHOLDER_CLIENT_SECRET
        {
            return Some(
                "Missing provider.client_secret — edit config.toml (or set OIDC_PROVIDER__CLIENT_SECRET) and restart.".to_string(),
            );
        }
        if self.session.secret.is_empty() || self.session.secret == PLACEHOLDER_SESSION_SECRET {
            return Some(
                "Missing session.secret — set it to a long random string and restart.".to_string(),
            );
        }
        None
    }
}
