//! Shared application state.

use std::sync::Arc;

use surrealdb::engine::any::Any;
use switchboard_authz::{AuthorizationService, AuthzConfig};
use switchboard_core::models::audit::CreateLogEntry;
use switchboard_core::repository::AuditLogRepository;
use switchboard_db::DbManager;
use switchboard_db::repository::{
    SurrealAuditLogRepository, SurrealEntityRepository, SurrealHealthCheckRepository,
    SurrealReferenceRepository, SurrealRoleExceptionRepository, SurrealRoleRepository,
    SurrealScreenAssetRepository, SurrealTeamRepository, SurrealTenantRepository,
    SurrealTransactionDefinitionRepository, SurrealTransactionInstanceRepository,
    SurrealUserRepository,
};
use tracing::warn;
use uuid::Uuid;

pub type Authz = AuthorizationService<
    SurrealUserRepository<Any>,
    SurrealTenantRepository<Any>,
    SurrealRoleRepository<Any>,
    SurrealRoleExceptionRepository<Any>,
>;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub db: DbManager,
    pub authz: Authz,
    pub users: SurrealUserRepository<Any>,
    pub tenants: SurrealTenantRepository<Any>,
    pub roles: SurrealRoleRepository<Any>,
    pub role_exceptions: SurrealRoleExceptionRepository<Any>,
    pub teams: SurrealTeamRepository<Any>,
    pub entities: SurrealEntityRepository<Any>,
    pub screen_assets: SurrealScreenAssetRepository<Any>,
    pub transaction_definitions: SurrealTransactionDefinitionRepository<Any>,
    pub transaction_instances: SurrealTransactionInstanceRepository<Any>,
    pub reference: SurrealReferenceRepository<Any>,
    pub audit_log: SurrealAuditLogRepository<Any>,
    pub health_checks: SurrealHealthCheckRepository<Any>,
}

impl AppState {
    pub fn new(db: DbManager, authz_config: AuthzConfig) -> Self {
        let client = db.client().clone();
        let tenants = SurrealTenantRepository::new(client.clone());
        let roles = SurrealRoleRepository::new(client.clone());
        let authz = AuthorizationService::new(
            SurrealUserRepository::new(client.clone()),
            tenants.clone(),
            roles.clone(),
            SurrealRoleExceptionRepository::new(client.clone()),
            authz_config,
        );
        Self {
            authz,
            users: SurrealUserRepository::new(client.clone()),
            tenants,
            roles,
            role_exceptions: SurrealRoleExceptionRepository::new(client.clone()),
            teams: SurrealTeamRepository::new(client.clone()),
            entities: SurrealEntityRepository::new(client.clone()),
            screen_assets: SurrealScreenAssetRepository::new(client.clone()),
            transaction_definitions: SurrealTransactionDefinitionRepository::new(client.clone()),
            transaction_instances: SurrealTransactionInstanceRepository::new(client.clone()),
            reference: SurrealReferenceRepository::new(client.clone()),
            audit_log: SurrealAuditLogRepository::new(client.clone()),
            health_checks: SurrealHealthCheckRepository::new(client),
            db,
        }
    }

    /// Append an activity entry. A failed write is logged and otherwise
    /// ignored so that it never fails the request that caused it.
    pub async fn record_activity(&self, tenant_id: Uuid, user_id: Uuid, action: impl Into<String>) {
        let entry = CreateLogEntry::activity(tenant_id, user_id, action);
        if let Err(e) = self.audit_log.append(entry).await {
            warn!(error = %e, %tenant_id, "Failed to record activity");
        }
    }
}
