//! Authorization service: sign-in, request authentication and
//! per-tenant permission checks.

use chrono::Utc;
use switchboard_core::error::{SwitchboardError, SwitchboardResult};
use switchboard_core::models::permission::{Permission, PermissionSet};
use switchboard_core::models::tenant::Tenant;
use switchboard_core::models::user::{UpsertUser, User};
use switchboard_core::repository::{
    RoleExceptionRepository, RoleRepository, TenantRepository, UserRepository,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AuthzConfig;
use crate::error::AuthzError;
use crate::resolver::resolve_permissions;
use crate::token::{self, ValidatedClaims};

/// Authorization service.
///
/// Generic over repository implementations so that the authorization
/// layer has no dependency on the database crate. Nothing is cached:
/// every call resolves from the repositories.
pub struct AuthorizationService<U, T, R, E>
where
    U: UserRepository,
    T: TenantRepository,
    R: RoleRepository,
    E: RoleExceptionRepository,
{
    user_repo: U,
    tenant_repo: T,
    role_repo: R,
    exception_repo: E,
    config: AuthzConfig,
}

impl<U, T, R, E> AuthorizationService<U, T, R, E>
where
    U: UserRepository,
    T: TenantRepository,
    R: RoleRepository,
    E: RoleExceptionRepository,
{
    pub fn new(
        user_repo: U,
        tenant_repo: T,
        role_repo: R,
        exception_repo: E,
        config: AuthzConfig,
    ) -> Self {
        Self {
            user_repo,
            tenant_repo,
            role_repo,
            exception_repo,
            config,
        }
    }

    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    /// Create or refresh the user named by a verified token.
    ///
    /// Emails listed in `bootstrap_admin_emails` are promoted to
    /// platform admin; the flag is never lowered here.
    pub async fn sign_in(&self, bearer: &str) -> SwitchboardResult<User> {
        let ValidatedClaims(claims) = token::validate_access_token(bearer, &self.config)?;
        let email = claims.email.ok_or(AuthzError::MissingEmail)?;

        let is_platform_admin = self.config.is_bootstrap_admin(&email);
        let display_name = claims.name.unwrap_or_else(|| email.clone());

        let input = UpsertUser {
            external_id: claims.sub,
            email,
            display_name,
            is_platform_admin,
        };
        input.validate()?;

        let user = self.user_repo.upsert(input).await?;
        if !user.is_active {
            return Err(AuthzError::AccountInactive.into());
        }

        info!(user_id = %user.id, "User signed in");
        Ok(user)
    }

    /// Resolve the active user behind a bearer token. The user must
    /// have signed in before.
    pub async fn authenticate(&self, bearer: &str) -> SwitchboardResult<User> {
        let ValidatedClaims(claims) = token::validate_access_token(bearer, &self.config)?;

        let user = match self.user_repo.get_by_external_id(&claims.sub).await {
            Ok(user) => user,
            Err(SwitchboardError::NotFound { .. }) => return Err(AuthzError::UnknownUser.into()),
            Err(e) => return Err(e),
        };
        if !user.is_active {
            return Err(AuthzError::AccountInactive.into());
        }
        Ok(user)
    }

    /// Load the tenant and check that the user may act in it.
    ///
    /// Platform admins are treated as members of every tenant.
    pub async fn tenant_for(&self, user: &User, tenant_id: Uuid) -> SwitchboardResult<Tenant> {
        let tenant = self.tenant_repo.get_by_id(tenant_id).await?;
        if user.is_platform_admin || self.role_repo.is_member(tenant_id, user.id).await? {
            Ok(tenant)
        } else {
            Err(AuthzError::NotAMember.into())
        }
    }

    /// Effective permissions of a user in a tenant.
    pub async fn effective_permissions(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> SwitchboardResult<PermissionSet> {
        let user = self.user_repo.get_by_id(user_id).await?;
        self.permissions_for(&user, tenant_id).await
    }

    /// Effective permissions of an already loaded user.
    ///
    /// Inactive users and inactive tenants resolve to the empty set.
    /// Platform admins hold every permission.
    pub async fn permissions_for(
        &self,
        user: &User,
        tenant_id: Uuid,
    ) -> SwitchboardResult<PermissionSet> {
        if !user.is_active {
            return Ok(PermissionSet::new());
        }
        if user.is_platform_admin {
            return Ok(PermissionSet::all());
        }

        let tenant = self.tenant_repo.get_by_id(tenant_id).await?;
        if !tenant.is_active {
            return Ok(PermissionSet::new());
        }

        let roles = self.role_repo.get_user_roles(tenant_id, user.id).await?;
        let exceptions = self.exception_repo.list_for_user(tenant_id, user.id).await?;

        let permissions = resolve_permissions(&roles, &exceptions, Utc::now());
        debug!(
            user_id = %user.id,
            tenant_id = %tenant_id,
            roles = roles.len(),
            exceptions = exceptions.len(),
            granted = permissions.len(),
            "Permissions resolved"
        );
        Ok(permissions)
    }

    /// Fail with `AuthorizationDenied` unless the user holds
    /// `permission` in the tenant.
    pub async fn require(
        &self,
        user: &User,
        tenant_id: Uuid,
        permission: Permission,
    ) -> SwitchboardResult<()> {
        if user.is_platform_admin {
            return Ok(());
        }
        if self.permissions_for(user, tenant_id).await?.contains(permission) {
            Ok(())
        } else {
            Err(AuthzError::PermissionDenied(permission).into())
        }
    }

    /// Fail with `AuthorizationDenied` unless the user is a platform
    /// admin.
    pub fn require_platform_admin(&self, user: &User) -> SwitchboardResult<()> {
        if user.is_platform_admin {
            Ok(())
        } else {
            Err(AuthzError::PlatformAdminRequired.into())
        }
    }
}
