//! Authorization error types.

use switchboard_core::error::SwitchboardError;
use switchboard_core::models::permission::Permission;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("token carries no email claim")]
    MissingEmail,

    #[error("unknown user; sign in first")]
    UnknownUser,

    #[error("account is inactive")]
    AccountInactive,

    #[error("no token verification key configured")]
    KeyNotConfigured,

    #[error("bad verification key: {0}")]
    BadKey(String),

    #[error("not a member of this tenant")]
    NotAMember,

    #[error("missing permission {0}")]
    PermissionDenied(Permission),

    #[error("platform administrator required")]
    PlatformAdminRequired,
}

impl From<AuthzError> for SwitchboardError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::MissingToken
            | AuthzError::TokenExpired
            | AuthzError::TokenInvalid(_)
            | AuthzError::MissingEmail
            | AuthzError::UnknownUser
            | AuthzError::AccountInactive => SwitchboardError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthzError::NotAMember
            | AuthzError::PermissionDenied(_)
            | AuthzError::PlatformAdminRequired => SwitchboardError::denied(err.to_string()),
            AuthzError::KeyNotConfigured | AuthzError::BadKey(_) => {
                SwitchboardError::Internal(err.to_string())
            }
        }
    }
}
