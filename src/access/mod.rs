//! Access control gate
//!
//! A pure decision over verified claims and the process-wide
//! [`AccessPolicy`]: first the optional hosted-domain restriction, then the
//! admin allowlist, otherwise plain `user` access. Unlisted accounts that
//! pass the domain check are granted `user` rather than denied.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::oauth2::AuthError;
use crate::token::Claims;

/// Role granted to an authenticated browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Listed in the admin allowlist
    Admin,
    /// Any other allowed account
    User,
}

impl Role {
    /// Role name as a lowercase string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

/// Immutable access policy, built once at startup from configuration.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    admin_emails: HashSet<String>,
    enforce_domain: Option<String>,
}

impl AccessPolicy {
    /// Build a policy from raw configuration values.
    ///
    /// Emails and the domain are trimmed and lowercased; an empty domain
    /// string means no domain restriction.
    #[must_use]
    pub fn new<I, S>(admin_emails: I, enforce_domain: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let admin_emails = admin_emails
            .into_iter()
            .map(|e| e.as_ref().trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        let enforce_domain = enforce_domain
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty());

        Self {
            admin_emails,
            enforce_domain,
        }
    }

    /// Domain this policy restricts logins to, if any.
    #[must_use]
    pub fn enforced_domain(&self) -> Option<&str> {
        self.enforce_domain.as_deref()
    }

    /// Decide whether `claims` may log in, and with which role.
    ///
    /// Order matters: the domain restriction is applied before the admin
    /// allowlist, so an admin email outside the enforced domain is still
    /// denied.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DomainNotAllowed`] when a domain is enforced
    /// and neither the `hd` claim nor the email suffix matches it.
    pub fn evaluate(&self, claims: &Claims) -> Result<Role, AuthError> {
        let email = claims
            .email
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();

        if let Some(domain) = &self.enforce_domain {
            let hd = claims.hd.as_deref().map(str::to_lowercase);
            let hd_matches = hd.as_deref() == Some(domain.as_str());
            let email_matches = email.ends_with(&format!("@{domain}"));

            if !(hd_matches || email_matches) {
                return Err(AuthError::DomainNotAllowed(domain.clone()));
            }
        }

        if !email.is_empty() && self.admin_emails.contains(&email) {
            return Ok(Role::Admin);
        }

        Ok(Role::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(email: &str, hd: Option<&str>) -> Claims {
        Claims {
            sub: "subject-1".to_string(),
            iss: "https://accounts.google.com".to_string(),
            aud: "client-id".to_string(),
            iat: 0,
            exp: i64::MAX,
            email: Some(email.to_string()),
            email_verified: true,
            name: None,
            picture: None,
            hd: hd.map(str::to_string),
        }
    }

    #[test]
    fn domain_match_grants_user() {
        let policy = AccessPolicy::new(Vec::<&str>::new(), Some("example.com"));
        let role = policy.evaluate(&claims("a@example.com", None)).unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn domain_mismatch_is_denied() {
        let policy = AccessPolicy::new(Vec::<&str>::new(), Some("example.com"));
        let result = policy.evaluate(&claims("a@other.com", None));
        assert!(matches!(result, Err(AuthError::DomainNotAllowed(_))));
    }

    #[test]
    fn admin_email_grants_admin_without_domain_check() {
        let policy = AccessPolicy::new(["admin@example.com"], None);
        let role = policy.evaluate(&claims("admin@example.com", None)).unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn open_policy_grants_user_to_anyone() {
        let policy = AccessPolicy::new(Vec::<&str>::new(), Some(""));
        let role = policy.evaluate(&claims("anyone@x.com", None)).unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn hosted_domain_claim_satisfies_domain_check() {
        // hd claim matches even when the email is on a vanity domain
        let policy = AccessPolicy::new(Vec::<&str>::new(), Some("example.com"));
        let role = policy
            .evaluate(&claims("a@mail.example.org", Some("example.com")))
            .unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn admin_outside_enforced_domain_is_still_denied() {
        let policy = AccessPolicy::new(["admin@other.com"], Some("example.com"));
        let result = policy.evaluate(&claims("admin@other.com", None));
        assert!(matches!(result, Err(AuthError::DomainNotAllowed(_))));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let policy = AccessPolicy::new(["Admin@Example.com "], Some(" Example.COM"));
        let role = policy.evaluate(&claims("ADMIN@EXAMPLE.COM", None)).unwrap();
        assert_eq!(role, Role::Admin);
    }
}
