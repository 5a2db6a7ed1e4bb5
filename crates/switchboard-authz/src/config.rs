//! Authorization configuration.

/// Configuration for token validation and sign-in.
#[derive(Debug, Clone)]
pub struct AuthzConfig {
    /// Shared secret for HS256 tokens. Takes precedence over the
    /// public key when both are set.
    pub jwt_secret: Option<String>,
    /// PEM-encoded Ed25519 public key for EdDSA tokens.
    pub jwt_public_key_pem: Option<String>,
    /// Expected `iss` claim.
    pub jwt_issuer: String,
    /// Expected `aud` claim. `None` skips the audience check.
    pub jwt_audience: Option<String>,
    /// Clock skew tolerated on `exp`, in seconds.
    pub leeway_secs: u64,
    /// Emails (lower-case) promoted to platform admin on sign-in.
    pub bootstrap_admin_emails: Vec<String>,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_public_key_pem: None,
            jwt_issuer: "switchboard".into(),
            jwt_audience: None,
            leeway_secs: 30,
            bootstrap_admin_emails: Vec::new(),
        }
    }
}

impl AuthzConfig {
    pub fn is_bootstrap_admin(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.bootstrap_admin_emails.iter().any(|e| *e == email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_admin_match_ignores_case() {
        let config = AuthzConfig {
            bootstrap_admin_emails: vec!["root@example.com".into()],
            ..Default::default()
        };
        assert!(config.is_bootstrap_admin("Root@Example.com "));
        assert!(!config.is_bootstrap_admin("alice@example.com"));
    }
}
