//! Integration tests for Tenant and User repositories using in-memory SurrealDB.

use switchboard_core::error::SwitchboardError;
use switchboard_core::models::permission::PermissionSet;
use switchboard_core::models::role::ADMINISTRATOR_ROLE;
use switchboard_core::models::tenant::{CreateTenant, UpdateTenant};
use switchboard_core::models::user::{UpdateUser, UpsertUser};
use switchboard_core::repository::{
    Pagination, RoleRepository, TenantRepository, UserRepository,
};
use switchboard_db::repository::{
    SurrealRoleRepository, SurrealTenantRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    switchboard_db::run_migrations(&db).await.unwrap();
    db
}

fn upsert(external_id: &str, email: &str) -> UpsertUser {
    UpsertUser {
        external_id: external_id.into(),
        email: email.into(),
        display_name: external_id.into(),
        is_platform_admin: false,
    }
}

fn acme() -> CreateTenant {
    CreateTenant {
        name: "Acme".into(),
        slug: "acme".into(),
        description: String::new(),
    }
}

#[tokio::test]
async fn tenant_creation_seeds_administrator_role_for_owner() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let tenants = SurrealTenantRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());

    let owner = users.upsert(upsert("auth0|alice", "alice@example.com")).await.unwrap();
    let tenant = tenants.create(acme(), owner.id).await.unwrap();
    assert_eq!(tenant.slug, "acme");
    assert!(tenant.is_active);

    let owner_roles = roles.get_user_roles(tenant.id, owner.id).await.unwrap();
    assert_eq!(owner_roles.len(), 1);
    assert_eq!(owner_roles[0].name, ADMINISTRATOR_ROLE);
    assert!(owner_roles[0].is_system);
    assert_eq!(owner_roles[0].permissions, PermissionSet::all());

    assert!(roles.is_member(tenant.id, owner.id).await.unwrap());
}

#[tokio::test]
async fn duplicate_slug_is_rejected() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let tenants = SurrealTenantRepository::new(db.clone());

    let owner = users.upsert(upsert("auth0|alice", "alice@example.com")).await.unwrap();
    tenants.create(acme(), owner.id).await.unwrap();

    let err = tenants.create(acme(), owner.id).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::AlreadyExists { .. }));

    let page = tenants.list(Pagination::default()).await.unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_with_one_slug_yield_one_tenant() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let tenants = SurrealTenantRepository::new(db.clone());
    let owner = users.upsert(upsert("auth0|alice", "alice@example.com")).await.unwrap();

    for round in 0..10 {
        let slug = format!("race-{round}");
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let tenants = tenants.clone();
                let input = CreateTenant {
                    name: slug.clone(),
                    slug: slug.clone(),
                    description: String::new(),
                };
                tokio::spawn(async move { tenants.create(input, owner.id).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(tenant) => {
                    assert_eq!(tenant.slug, slug);
                    created += 1;
                }
                Err(err) => {
                    assert!(matches!(err, SwitchboardError::AlreadyExists { .. }), "{err}");
                }
            }
        }
        assert_eq!(created, 1, "round {round}");
        tenants.get_by_slug(&slug).await.unwrap();
    }
}

#[tokio::test]
async fn tenant_creation_requires_existing_owner() {
    let db = setup().await;
    let tenants = SurrealTenantRepository::new(db.clone());

    let err = tenants.create(acme(), uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::NotFound { .. }));
}

#[tokio::test]
async fn tenant_update_and_lookup_by_slug() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let tenants = SurrealTenantRepository::new(db.clone());

    let owner = users.upsert(upsert("auth0|alice", "alice@example.com")).await.unwrap();
    let tenant = tenants.create(acme(), owner.id).await.unwrap();

    let updated = tenants
        .update(
            tenant.id,
            UpdateTenant {
                name: Some("Acme Holdings".into()),
                description: Some("Parent company".into()),
                is_active: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Acme Holdings");
    assert_eq!(updated.slug, "acme");

    let by_slug = tenants.get_by_slug("acme").await.unwrap();
    assert_eq!(by_slug.id, tenant.id);
    assert_eq!(by_slug.description, "Parent company");
}

#[tokio::test]
async fn list_for_user_returns_only_member_tenants() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let tenants = SurrealTenantRepository::new(db.clone());

    let alice = users.upsert(upsert("auth0|alice", "alice@example.com")).await.unwrap();
    let bob = users.upsert(upsert("auth0|bob", "bob@example.com")).await.unwrap();

    tenants.create(acme(), alice.id).await.unwrap();
    tenants
        .create(
            CreateTenant {
                name: "Globex".into(),
                slug: "globex".into(),
                description: String::new(),
            },
            bob.id,
        )
        .await
        .unwrap();

    let alice_tenants = tenants.list_for_user(alice.id).await.unwrap();
    assert_eq!(alice_tenants.len(), 1);
    assert_eq!(alice_tenants[0].slug, "acme");
}

#[tokio::test]
async fn deleting_tenant_cascades_roles_and_assignments() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let tenants = SurrealTenantRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());

    let owner = users.upsert(upsert("auth0|alice", "alice@example.com")).await.unwrap();
    let tenant = tenants.create(acme(), owner.id).await.unwrap();

    tenants.delete(tenant.id).await.unwrap();

    let err = tenants.get_by_id(tenant.id).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::NotFound { .. }));
    assert!(!roles.is_member(tenant.id, owner.id).await.unwrap());
    assert!(tenants.list_for_user(owner.id).await.unwrap().is_empty());

    // The user is global and survives.
    users.get_by_id(owner.id).await.unwrap();
}

#[tokio::test]
async fn upsert_is_idempotent_and_lowercases_email() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());

    let first = users.upsert(upsert("auth0|alice", "Alice@Example.COM")).await.unwrap();
    assert_eq!(first.email, "alice@example.com");
    assert!(first.last_login_at.is_some());

    let second = users.upsert(upsert("auth0|alice", "alice@example.com")).await.unwrap();
    assert_eq!(first.id, second.id);

    let page = users.list(Pagination::default()).await.unwrap();
    assert_eq!(page.total, 1);

    let by_email = users.get_by_email("ALICE@example.com").await.unwrap();
    assert_eq!(by_email.id, first.id);
}

#[tokio::test]
async fn upsert_never_lowers_platform_admin_flag() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());

    let mut input = upsert("auth0|root", "root@example.com");
    input.is_platform_admin = true;
    let admin = users.upsert(input).await.unwrap();
    assert!(admin.is_platform_admin);

    let again = users.upsert(upsert("auth0|root", "root@example.com")).await.unwrap();
    assert!(again.is_platform_admin);
}

#[tokio::test]
async fn update_and_deactivate_user() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());

    let user = users.upsert(upsert("auth0|alice", "alice@example.com")).await.unwrap();
    let updated = users
        .update(
            user.id,
            UpdateUser {
                email: None,
                display_name: Some("Alice A.".into()),
                role_label: Some("Analyst".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.display_name, "Alice A.");
    assert_eq!(updated.role_label, "Analyst");

    users.deactivate(user.id).await.unwrap();
    assert!(!users.get_by_id(user.id).await.unwrap().is_active);

    let err = users.deactivate(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::NotFound { .. }));
}
