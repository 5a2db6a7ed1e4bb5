//! Integration tests for the authorization service.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use switchboard_authz::{AuthorizationService, AuthzConfig, TokenClaims};
use switchboard_core::error::SwitchboardError;
use switchboard_core::models::permission::{Permission, PermissionSet};
use switchboard_core::models::role::CreateRole;
use switchboard_core::models::role_exception::{CreateRoleException, ExceptionEffect};
use switchboard_core::models::tenant::{CreateTenant, UpdateTenant};
use switchboard_core::repository::{
    RoleExceptionRepository, RoleRepository, TenantRepository, UserRepository,
};
use switchboard_db::repository::{
    SurrealRoleExceptionRepository, SurrealRoleRepository, SurrealTenantRepository,
    SurrealUserRepository,
};
use uuid::Uuid;

const SECRET: &str = "integration-secret";

type Service = AuthorizationService<
    SurrealUserRepository<Db>,
    SurrealTenantRepository<Db>,
    SurrealRoleRepository<Db>,
    SurrealRoleExceptionRepository<Db>,
>;

fn test_config() -> AuthzConfig {
    AuthzConfig {
        jwt_secret: Some(SECRET.into()),
        jwt_issuer: "switchboard-test".into(),
        bootstrap_admin_emails: vec!["root@example.com".into()],
        ..Default::default()
    }
}

fn token_for(sub: &str, email: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = TokenClaims {
        sub: sub.into(),
        email: Some(email.into()),
        name: None,
        iss: "switchboard-test".into(),
        exp: now + 600,
        iat: Some(now),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn setup() -> (Service, Surreal<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    switchboard_db::run_migrations(&db).await.unwrap();

    let service = AuthorizationService::new(
        SurrealUserRepository::new(db.clone()),
        SurrealTenantRepository::new(db.clone()),
        SurrealRoleRepository::new(db.clone()),
        SurrealRoleExceptionRepository::new(db.clone()),
        test_config(),
    );
    (service, db)
}

async fn tenant_owned_by(db: &Surreal<Db>, owner_id: Uuid) -> Uuid {
    SurrealTenantRepository::new(db.clone())
        .create(
            CreateTenant {
                name: "Acme".into(),
                slug: "acme".into(),
                description: String::new(),
            },
            owner_id,
        )
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn sign_in_creates_user_and_promotes_bootstrap_admin() {
    let (service, _db) = setup().await;

    let alice = service
        .sign_in(&token_for("auth0|alice", "alice@example.com"))
        .await
        .unwrap();
    assert!(!alice.is_platform_admin);
    assert_eq!(alice.display_name, "alice@example.com");

    let root = service
        .sign_in(&token_for("auth0|root", "ROOT@example.com"))
        .await
        .unwrap();
    assert!(root.is_platform_admin);

    let again = service
        .authenticate(&token_for("auth0|alice", "alice@example.com"))
        .await
        .unwrap();
    assert_eq!(again.id, alice.id);
}

#[tokio::test]
async fn authenticate_requires_prior_sign_in() {
    let (service, _db) = setup().await;

    let err = service
        .authenticate(&token_for("auth0|ghost", "ghost@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn deactivated_user_cannot_authenticate() {
    let (service, db) = setup().await;

    let alice = service
        .sign_in(&token_for("auth0|alice", "alice@example.com"))
        .await
        .unwrap();
    SurrealUserRepository::new(db.clone())
        .deactivate(alice.id)
        .await
        .unwrap();

    let err = service
        .authenticate(&token_for("auth0|alice", "alice@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn owner_holds_every_permission() {
    let (service, db) = setup().await;

    let alice = service
        .sign_in(&token_for("auth0|alice", "alice@example.com"))
        .await
        .unwrap();
    let tenant_id = tenant_owned_by(&db, alice.id).await;

    let permissions = service.effective_permissions(alice.id, tenant_id).await.unwrap();
    assert_eq!(permissions, PermissionSet::all());
    service.tenant_for(&alice, tenant_id).await.unwrap();
}

#[tokio::test]
async fn exceptions_adjust_role_permissions() {
    let (service, db) = setup().await;

    let alice = service
        .sign_in(&token_for("auth0|alice", "alice@example.com"))
        .await
        .unwrap();
    let bob = service
        .sign_in(&token_for("auth0|bob", "bob@example.com"))
        .await
        .unwrap();
    let tenant_id = tenant_owned_by(&db, alice.id).await;

    let err = service.tenant_for(&bob, tenant_id).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::AuthorizationDenied { .. }));

    let roles = SurrealRoleRepository::new(db.clone());
    let analyst = roles
        .create(CreateRole {
            tenant_id,
            name: "Analyst".into(),
            description: String::new(),
            permissions: PermissionSet::parse(["dashboard:view", "audit:view"]).unwrap(),
            is_system: false,
        })
        .await
        .unwrap();
    roles.assign_to_user(tenant_id, bob.id, analyst.id).await.unwrap();

    let exceptions = SurrealRoleExceptionRepository::new(db.clone());
    let now = Utc::now();
    for (permission, effect, valid_to) in [
        (Permission::AuditView, ExceptionEffect::Deny, None),
        (Permission::EntitiesView, ExceptionEffect::Allow, None),
        (
            Permission::TeamsManage,
            ExceptionEffect::Allow,
            Some(now - Duration::minutes(5)),
        ),
    ] {
        exceptions
            .create(CreateRoleException {
                tenant_id,
                user_id: bob.id,
                permission,
                effect,
                reason: String::new(),
                valid_from: valid_to.map(|to| to - Duration::hours(1)),
                valid_to,
            })
            .await
            .unwrap();
    }

    let permissions = service.effective_permissions(bob.id, tenant_id).await.unwrap();
    assert!(permissions.contains(Permission::DashboardView));
    assert!(permissions.contains(Permission::EntitiesView));
    assert!(!permissions.contains(Permission::AuditView));
    assert!(!permissions.contains(Permission::TeamsManage));

    service
        .require(&bob, tenant_id, Permission::DashboardView)
        .await
        .unwrap();
    let err = service
        .require(&bob, tenant_id, Permission::AuditView)
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn inactive_tenant_grants_nothing() {
    let (service, db) = setup().await;

    let alice = service
        .sign_in(&token_for("auth0|alice", "alice@example.com"))
        .await
        .unwrap();
    let tenant_id = tenant_owned_by(&db, alice.id).await;

    SurrealTenantRepository::new(db.clone())
        .update(
            tenant_id,
            UpdateTenant {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let permissions = service.effective_permissions(alice.id, tenant_id).await.unwrap();
    assert!(permissions.is_empty());
}

#[tokio::test]
async fn platform_admin_bypasses_membership_and_permissions() {
    let (service, db) = setup().await;

    let alice = service
        .sign_in(&token_for("auth0|alice", "alice@example.com"))
        .await
        .unwrap();
    let root = service
        .sign_in(&token_for("auth0|root", "root@example.com"))
        .await
        .unwrap();
    let tenant_id = tenant_owned_by(&db, alice.id).await;

    service.tenant_for(&root, tenant_id).await.unwrap();
    service
        .require(&root, tenant_id, Permission::TenantManage)
        .await
        .unwrap();
    service.require_platform_admin(&root).unwrap();
    assert!(service.require_platform_admin(&alice).is_err());
}
