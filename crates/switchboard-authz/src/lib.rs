//! Switchboard Authz — bearer token validation and effective-permission
//! resolution.

pub mod config;
pub mod error;
pub mod resolver;
pub mod service;
pub mod token;

pub use config::AuthzConfig;
pub use error::AuthzError;
pub use resolver::resolve_permissions;
pub use service::AuthorizationService;
pub use token::{TokenClaims, ValidatedClaims};
