//! SurrealDB repository implementations.

mod audit;
mod entity;
mod reference;
mod role;
mod role_exception;
mod screen_asset;
mod support;
mod team;
mod tenant;
mod transaction;
mod user;

pub use audit::{SurrealAuditLogRepository, SurrealHealthCheckRepository};
pub use entity::SurrealEntityRepository;
pub use reference::SurrealReferenceRepository;
pub use role::SurrealRoleRepository;
pub use role_exception::SurrealRoleExceptionRepository;
pub use screen_asset::SurrealScreenAssetRepository;
pub use team::SurrealTeamRepository;
pub use tenant::SurrealTenantRepository;
pub use transaction::{SurrealTransactionDefinitionRepository, SurrealTransactionInstanceRepository};
pub use user::SurrealUserRepository;
