//! Integration tests for Role, assignment and RoleException repositories
//! using in-memory SurrealDB.

use chrono::{Duration, Utc};
use switchboard_core::error::SwitchboardError;
use switchboard_core::models::permission::{Permission, PermissionSet};
use switchboard_core::models::role::{CreateRole, UpdateRole};
use switchboard_core::models::role_exception::{
    CreateRoleException, ExceptionEffect, UpdateRoleException,
};
use switchboard_core::models::tenant::CreateTenant;
use switchboard_core::models::user::UpsertUser;
use switchboard_core::repository::{
    Pagination, RoleExceptionRepository, RoleRepository, TenantRepository, UserRepository,
};
use switchboard_db::repository::{
    SurrealRoleExceptionRepository, SurrealRoleRepository, SurrealTenantRepository,
    SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: spin up in-memory DB, run migrations, create two tenants
/// owned by alice and a second user bob with no roles yet.
async fn setup() -> (
    Surreal<Db>,
    Uuid, // tenant_id
    Uuid, // other_tenant_id
    Uuid, // alice_id (owner)
    Uuid, // bob_id
) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    switchboard_db::run_migrations(&db).await.unwrap();

    let users = SurrealUserRepository::new(db.clone());
    let alice = users
        .upsert(UpsertUser {
            external_id: "auth0|alice".into(),
            email: "alice@example.com".into(),
            display_name: "Alice".into(),
            is_platform_admin: false,
        })
        .await
        .unwrap();
    let bob = users
        .upsert(UpsertUser {
            external_id: "auth0|bob".into(),
            email: "bob@example.com".into(),
            display_name: "Bob".into(),
            is_platform_admin: false,
        })
        .await
        .unwrap();

    let tenants = SurrealTenantRepository::new(db.clone());
    let tenant = tenants
        .create(
            CreateTenant {
                name: "Acme".into(),
                slug: "acme".into(),
                description: String::new(),
            },
            alice.id,
        )
        .await
        .unwrap();
    let other = tenants
        .create(
            CreateTenant {
                name: "Globex".into(),
                slug: "globex".into(),
                description: String::new(),
            },
            alice.id,
        )
        .await
        .unwrap();

    (db, tenant.id, other.id, alice.id, bob.id)
}

fn viewer(tenant_id: Uuid) -> CreateRole {
    CreateRole {
        tenant_id,
        name: "Viewer".into(),
        description: "Read-only".into(),
        permissions: PermissionSet::parse(["dashboard:view", "entities:view"]).unwrap(),
        is_system: false,
    }
}

#[tokio::test]
async fn create_and_list_roles() {
    let (db, tenant_id, _, _, _) = setup().await;
    let roles = SurrealRoleRepository::new(db);

    let role = roles.create(viewer(tenant_id)).await.unwrap();
    assert!(role.permissions.contains(Permission::EntitiesView));
    assert!(!role.permissions.contains(Permission::EntitiesManage));

    // Administrator + Viewer.
    let page = roles.list(tenant_id, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 2);

    let err = roles.create(viewer(tenant_id)).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::AlreadyExists { .. }));
}

#[tokio::test]
async fn role_is_invisible_from_other_tenant() {
    let (db, tenant_id, other_tenant_id, _, _) = setup().await;
    let roles = SurrealRoleRepository::new(db);

    let role = roles.create(viewer(tenant_id)).await.unwrap();

    let err = roles.get_by_id(other_tenant_id, role.id).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::NotFound { .. }));

    let err = roles
        .update(other_tenant_id, role.id, UpdateRole::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::NotFound { .. }));
}

#[tokio::test]
async fn assigned_role_cannot_be_deleted_until_unassigned() {
    let (db, tenant_id, _, _, bob_id) = setup().await;
    let roles = SurrealRoleRepository::new(db);

    let role = roles.create(viewer(tenant_id)).await.unwrap();
    let assignment = roles.assign_to_user(tenant_id, bob_id, role.id).await.unwrap();
    assert_eq!(assignment.user_id, bob_id);
    assert_eq!(assignment.role_id, role.id);
    assert_eq!(assignment.tenant_id, tenant_id);

    let err = roles.delete(tenant_id, role.id).await.unwrap_err();
    assert!(
        matches!(&err, SwitchboardError::Conflict { reason } if reason.contains("assigned to 1 user(s)")),
        "{err}"
    );

    roles.unassign_from_user(tenant_id, bob_id, role.id).await.unwrap();
    roles.delete(tenant_id, role.id).await.unwrap();

    let err = roles.get_by_id(tenant_id, role.id).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::NotFound { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_assign_and_delete_leave_no_assignment_to_a_deleted_role() {
    let (db, tenant_id, _, _, bob_id) = setup().await;
    let roles = SurrealRoleRepository::new(db);

    for round in 0..10 {
        let role = roles
            .create(CreateRole {
                name: format!("Viewer {round}"),
                ..viewer(tenant_id)
            })
            .await
            .unwrap();

        let assign = {
            let roles = roles.clone();
            tokio::spawn(async move { roles.assign_to_user(tenant_id, bob_id, role.id).await })
        };
        let delete = {
            let roles = roles.clone();
            tokio::spawn(async move { roles.delete(tenant_id, role.id).await })
        };
        let assigned = assign.await.unwrap();
        let deleted = delete.await.unwrap();

        match (&assigned, &deleted) {
            (Ok(_), Err(SwitchboardError::Conflict { .. })) => {
                roles.get_by_id(tenant_id, role.id).await.unwrap();
                roles.unassign_from_user(tenant_id, bob_id, role.id).await.unwrap();
            }
            (Err(SwitchboardError::NotFound { .. }), Ok(())) => {
                let err = roles.get_by_id(tenant_id, role.id).await.unwrap_err();
                assert!(matches!(err, SwitchboardError::NotFound { .. }));
            }
            other => panic!("round {round}: unexpected outcome {other:?}"),
        }

        // Every stored assignment still points at a live role.
        let assignments = roles
            .list_assignments(tenant_id, Pagination::default())
            .await
            .unwrap();
        for assignment in assignments.items {
            roles.get_by_id(tenant_id, assignment.role_id).await.unwrap();
        }
        assert!(!roles.is_member(tenant_id, bob_id).await.unwrap());
    }
}

#[tokio::test]
async fn duplicate_assignment_is_rejected() {
    let (db, tenant_id, _, _, bob_id) = setup().await;
    let roles = SurrealRoleRepository::new(db);

    let role = roles.create(viewer(tenant_id)).await.unwrap();
    roles.assign_to_user(tenant_id, bob_id, role.id).await.unwrap();

    let err = roles.assign_to_user(tenant_id, bob_id, role.id).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::AlreadyExists { .. }));

    let assignments = roles
        .list_assignments(tenant_id, Pagination::default())
        .await
        .unwrap();
    // Alice's administrator assignment plus Bob's.
    assert_eq!(assignments.total, 2);
}

#[tokio::test]
async fn unassigning_missing_assignment_is_not_found() {
    let (db, tenant_id, _, _, bob_id) = setup().await;
    let roles = SurrealRoleRepository::new(db);

    let role = roles.create(viewer(tenant_id)).await.unwrap();
    let err = roles
        .unassign_from_user(tenant_id, bob_id, role.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::NotFound { .. }));
}

#[tokio::test]
async fn system_role_is_protected() {
    let (db, tenant_id, _, alice_id, _) = setup().await;
    let roles = SurrealRoleRepository::new(db);

    let admin = roles.get_user_roles(tenant_id, alice_id).await.unwrap().remove(0);
    assert!(admin.is_system);

    let err = roles.delete(tenant_id, admin.id).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::Validation { .. }));

    let err = roles
        .update(
            tenant_id,
            admin.id,
            UpdateRole {
                permissions: Some(PermissionSet::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::Validation { .. }));

    // Renaming is still allowed.
    let renamed = roles
        .update(
            tenant_id,
            admin.id,
            UpdateRole {
                description: Some("Owners".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.description, "Owners");
}

#[tokio::test]
async fn membership_follows_assignments() {
    let (db, tenant_id, other_tenant_id, _, bob_id) = setup().await;
    let roles = SurrealRoleRepository::new(db);

    assert!(!roles.is_member(tenant_id, bob_id).await.unwrap());

    let role = roles.create(viewer(tenant_id)).await.unwrap();
    roles.assign_to_user(tenant_id, bob_id, role.id).await.unwrap();

    assert!(roles.is_member(tenant_id, bob_id).await.unwrap());
    assert!(!roles.is_member(other_tenant_id, bob_id).await.unwrap());
}

#[tokio::test]
async fn exception_requires_tenant_membership() {
    let (db, tenant_id, _, _, bob_id) = setup().await;
    let exceptions = SurrealRoleExceptionRepository::new(db);

    let err = exceptions
        .create(CreateRoleException {
            tenant_id,
            user_id: bob_id,
            permission: Permission::AuditView,
            effect: ExceptionEffect::Allow,
            reason: String::new(),
            valid_from: None,
            valid_to: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::Validation { .. }));
}

#[tokio::test]
async fn exception_lifecycle() {
    let (db, tenant_id, other_tenant_id, alice_id, _) = setup().await;
    let exceptions = SurrealRoleExceptionRepository::new(db);

    let now = Utc::now();
    let exception = exceptions
        .create(CreateRoleException {
            tenant_id,
            user_id: alice_id,
            permission: Permission::AuditView,
            effect: ExceptionEffect::Deny,
            reason: "Under review".into(),
            valid_from: Some(now - Duration::hours(1)),
            valid_to: Some(now + Duration::hours(1)),
        })
        .await
        .unwrap();
    assert!(exception.is_in_effect(now));

    let listed = exceptions.list_for_user(tenant_id, alice_id).await.unwrap();
    assert_eq!(listed.len(), 1);

    let err = exceptions
        .get_by_id(other_tenant_id, exception.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::NotFound { .. }));

    // Clearing the end of the window makes it open-ended.
    let updated = exceptions
        .update(
            tenant_id,
            exception.id,
            UpdateRoleException {
                valid_to: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.valid_to.is_none());
    assert!(updated.valid_from.is_some());

    // A window whose start follows its end is rejected.
    let err = exceptions
        .update(
            tenant_id,
            exception.id,
            UpdateRoleException {
                valid_to: Some(Some(now - Duration::hours(2))),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::Validation { .. }));

    exceptions.delete(tenant_id, exception.id).await.unwrap();
    let page = exceptions.list(tenant_id, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 0);
}
