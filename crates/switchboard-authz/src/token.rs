//! Bearer token verification.
//!
//! Tokens are issued by the external identity provider; this crate only
//! verifies them. HS256 with a shared secret and EdDSA with an Ed25519
//! public key are supported.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthzConfig;
use crate::error::AuthzError;

/// Claims Switchboard reads from an identity-provider token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user's `external_id`.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub iss: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Validated JWT claims, a newtype proving the token was verified.
#[derive(Debug, Clone)]
pub struct ValidatedClaims(pub TokenClaims);

fn decoding_key(config: &AuthzConfig) -> Result<(DecodingKey, Algorithm), AuthzError> {
    if let Some(secret) = &config.jwt_secret {
        return Ok((DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256));
    }
    if let Some(pem) = &config.jwt_public_key_pem {
        let key = DecodingKey::from_ed_pem(pem.as_bytes())
            .map_err(|e| AuthzError::BadKey(e.to_string()))?;
        return Ok((key, Algorithm::EdDSA));
    }
    Err(AuthzError::KeyNotConfigured)
}

/// Validate a bearer token (signature, expiry, issuer and, when
/// configured, audience) and return the verified claims.
///
/// Purely stateless: no database lookup is performed.
pub fn validate_access_token(
    token: &str,
    config: &AuthzConfig,
) -> Result<ValidatedClaims, AuthzError> {
    let (key, algorithm) = decoding_key(config)?;

    let mut validation = Validation::new(algorithm);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iss"]);
    validation.leeway = config.leeway_secs;
    match &config.jwt_audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    jsonwebtoken::decode::<TokenClaims>(token, &key, &validation)
        .map(|data| ValidatedClaims(data.claims))
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthzError::TokenExpired,
            _ => AuthzError::TokenInvalid(e.to_string()),
        })
}
