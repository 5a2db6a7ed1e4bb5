//! Server configuration, read from `SWITCHBOARD_*` environment variables.

use std::net::SocketAddr;

use switchboard_authz::AuthzConfig;
use switchboard_db::DbConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("set SWITCHBOARD_JWT_SECRET or SWITCHBOARD_JWT_PUBLIC_KEY_PEM")]
    MissingJwtKey,
}

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db: DbConfig,
    pub authz: AuthzConfig,
}

impl ServerConfig {
    /// Build from the process environment. A `.env` file, if present,
    /// should be loaded with `dotenvy` before calling this.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind_addr = match get("SWITCHBOARD_BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                var: "SWITCHBOARD_BIND_ADDR",
                reason: format!("{e}"),
            })?,
            None => SocketAddr::from(([127, 0, 0, 1], 8080)),
        };

        let db_defaults = DbConfig::default();
        let db = DbConfig {
            url: get("SWITCHBOARD_DB_URL").unwrap_or(db_defaults.url),
            namespace: get("SWITCHBOARD_DB_NAMESPACE").unwrap_or(db_defaults.namespace),
            database: get("SWITCHBOARD_DB_DATABASE").unwrap_or(db_defaults.database),
            username: get("SWITCHBOARD_DB_USERNAME"),
            password: get("SWITCHBOARD_DB_PASSWORD"),
        };

        let jwt_secret = get("SWITCHBOARD_JWT_SECRET");
        // PEM keys are often passed on one line with literal "\n".
        let jwt_public_key_pem =
            get("SWITCHBOARD_JWT_PUBLIC_KEY_PEM").map(|pem| pem.replace("\\n", "\n"));
        if jwt_secret.is_none() && jwt_public_key_pem.is_none() {
            return Err(ConfigError::MissingJwtKey);
        }

        let authz_defaults = AuthzConfig::default();
        let authz = AuthzConfig {
            jwt_secret,
            jwt_public_key_pem,
            jwt_issuer: get("SWITCHBOARD_JWT_ISSUER").unwrap_or(authz_defaults.jwt_issuer),
            jwt_audience: get("SWITCHBOARD_JWT_AUDIENCE"),
            leeway_secs: authz_defaults.leeway_secs,
            bootstrap_admin_emails: get("SWITCHBOARD_BOOTSTRAP_ADMINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|e| e.trim().to_lowercase())
                        .filter(|e| !e.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        };

        Ok(Self {
            bind_addr,
            db,
            authz,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config_from(&[("SWITCHBOARD_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.db.url, "ws://127.0.0.1:8000");
        assert_eq!(config.db.namespace, "switchboard");
        assert_eq!(config.db.database, "main");
        assert!(config.db.username.is_none());
        assert_eq!(config.authz.jwt_issuer, "switchboard");
        assert!(config.authz.jwt_audience.is_none());
        assert!(config.authz.bootstrap_admin_emails.is_empty());
    }

    #[test]
    fn a_verification_key_is_required() {
        assert!(matches!(config_from(&[]), Err(ConfigError::MissingJwtKey)));
    }

    #[test]
    fn overrides_are_read() {
        let config = config_from(&[
            ("SWITCHBOARD_BIND_ADDR", "0.0.0.0:9000"),
            ("SWITCHBOARD_DB_URL", "mem://"),
            ("SWITCHBOARD_JWT_PUBLIC_KEY_PEM", "-----BEGIN PUBLIC KEY-----\\nabc"),
            ("SWITCHBOARD_JWT_AUDIENCE", "switchboard-api"),
            ("SWITCHBOARD_BOOTSTRAP_ADMINS", " Root@Example.com, ,ops@example.com"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.db.url, "mem://");
        assert_eq!(
            config.authz.jwt_public_key_pem.as_deref(),
            Some("-----BEGIN PUBLIC KEY-----\nabc")
        );
        assert_eq!(config.authz.jwt_audience.as_deref(), Some("switchboard-api"));
        assert_eq!(
            config.authz.bootstrap_admin_emails,
            ["root@example.com", "ops@example.com"]
        );
    }

    #[test]
    fn bad_bind_addr_is_rejected() {
        let err = config_from(&[
            ("SWITCHBOARD_JWT_SECRET", "s3cret"),
            ("SWITCHBOARD_BIND_ADDR", "not-an-address"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SWITCHBOARD_BIND_ADDR", .. }));
    }
}
