//! HTTP-level tests driving the router against an in-memory database.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use switchboard_authz::{AuthzConfig, TokenClaims};
use switchboard_db::{DbConfig, DbManager};
use switchboard_server::api::build_router;
use switchboard_server::api::state::AppState;
use tower::ServiceExt;

const SECRET: &str = "api-test-secret";
const ISSUER: &str = "switchboard-test";

async fn app() -> Router {
    let db = DbManager::connect(&DbConfig::in_memory()).await.unwrap();
    let config = AuthzConfig {
        jwt_secret: Some(SECRET.into()),
        jwt_issuer: ISSUER.into(),
        bootstrap_admin_emails: vec!["admin@example.com".into()],
        ..Default::default()
    };
    build_router(Arc::new(AppState::new(db, config)))
}

fn token(sub: &str, email: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = TokenClaims {
        sub: sub.into(),
        email: Some(email.into()),
        name: None,
        iss: ISSUER.into(),
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

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Sign in and return the user id.
async fn login(app: &Router, token: &str) -> String {
    let (status, user) = send(app, Method::POST, "/api/auth/login", Some(token), None).await;
    assert_eq!(status, StatusCode::OK, "{user}");
    user["id"].as_str().unwrap().to_string()
}

async fn create_tenant(app: &Router, admin: &str, name: &str, slug: &str) -> String {
    let (status, tenant) = send(
        app,
        Method::POST,
        "/api/tenants",
        Some(admin),
        Some(json!({ "name": name, "slug": slug })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{tenant}");
    tenant["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_the_database() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let admin = token("admin-sub", "admin@example.com");
    login(&app, &admin).await;
    let (status, checks) =
        send(&app, Method::GET, "/api/health/checks", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(checks.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn requests_without_a_valid_session_are_rejected() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    // A valid token for a user that never signed in.
    let stranger = token("stranger-sub", "stranger@example.com");
    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some(&stranger), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_bootstraps_admins_and_profile_is_editable() {
    let app = app().await;
    let admin = token("admin-sub", "admin@example.com");
    let (status, user) = send(&app, Method::POST, "/api/auth/login", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["is_platform_admin"], true);

    let (status, user) = send(
        &app,
        Method::PATCH,
        "/api/auth/me",
        Some(&admin),
        Some(json!({ "display_name": "Root", "role_label": "Operator" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["display_name"], "Root");
    assert_eq!(user["role_label"], "Operator");

    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["display_name"], "Root");
}

#[tokio::test]
async fn duplicate_tenant_slug_is_a_conflict() {
    let app = app().await;
    let admin = token("admin-sub", "admin@example.com");
    login(&app, &admin).await;

    let (status, tenant) = send(
        &app,
        Method::POST,
        "/api/tenants",
        Some(&admin),
        Some(json!({ "name": "Acme", "slug": "acme" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(tenant["id"].as_str().is_some());
    assert_eq!(tenant["slug"], "acme");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/tenants",
        Some(&admin),
        Some(json!({ "name": "Acme again", "slug": "acme" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
}

#[tokio::test]
async fn only_platform_admins_create_tenants() {
    let app = app().await;
    let bob = token("bob-sub", "bob@example.com");
    login(&app, &bob).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/tenants",
        Some(&bob),
        Some(json!({ "name": "Bobco", "slug": "bobco" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn permissions_gate_tenant_routes() {
    let app = app().await;
    let admin = token("admin-sub", "admin@example.com");
    let bob = token("bob-sub", "bob@example.com");
    login(&app, &admin).await;
    let bob_id = login(&app, &bob).await;
    let acme = create_tenant(&app, &admin, "Acme", "acme").await;
    let roles_uri = format!("/api/tenants/{acme}/roles");

    // Not a member yet.
    let (status, _) = send(&app, Method::GET, &roles_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, viewer) = send(
        &app,
        Method::POST,
        &roles_uri,
        Some(&admin),
        Some(json!({ "name": "Viewer", "permissions": ["roles:view"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{viewer}");
    let viewer_id = viewer["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/tenants/{acme}/users/{bob_id}/roles"),
        Some(&admin),
        Some(json!({ "role_id": viewer_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, roles) = send(&app, Method::GET, &roles_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roles["total"], 2);

    let (status, body) = send(
        &app,
        Method::POST,
        &roles_uri,
        Some(&bob),
        Some(json!({ "name": "Sneaky", "permissions": ["roles:manage"] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("roles:manage"));

    let (status, mine) = send(
        &app,
        Method::GET,
        &format!("/api/tenants/{acme}/permissions/me"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["permissions"], json!(["roles:view"]));

    // Members see the tenant in their listing.
    let (status, tenants) = send(&app, Method::GET, "/api/tenants", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tenants["total"], 1);
}

#[tokio::test]
async fn deny_exception_overrides_role_grant() {
    let app = app().await;
    let admin = token("admin-sub", "admin@example.com");
    let bob = token("bob-sub", "bob@example.com");
    login(&app, &admin).await;
    let bob_id = login(&app, &bob).await;
    let acme = create_tenant(&app, &admin, "Acme", "acme").await;

    let (_, viewer) = send(
        &app,
        Method::POST,
        &format!("/api/tenants/{acme}/roles"),
        Some(&admin),
        Some(json!({ "name": "Viewer", "permissions": ["roles:view", "teams:view"] })),
    )
    .await;
    send(
        &app,
        Method::POST,
        &format!("/api/tenants/{acme}/users/{bob_id}/roles"),
        Some(&admin),
        Some(json!({ "role_id": viewer["id"] })),
    )
    .await;

    let (status, exception) = send(
        &app,
        Method::POST,
        &format!("/api/tenants/{acme}/role-exceptions"),
        Some(&admin),
        Some(json!({
            "user_id": bob_id,
            "permission": "teams:view",
            "effect": "deny",
            "reason": "temporary lock"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{exception}");

    let (status, effective) = send(
        &app,
        Method::GET,
        &format!("/api/tenants/{acme}/users/{bob_id}/permissions"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(effective["permissions"], json!(["roles:view"]));

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/tenants/{acme}/teams"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn assigned_role_cannot_be_deleted() {
    let app = app().await;
    let admin = token("admin-sub", "admin@example.com");
    let bob = token("bob-sub", "bob@example.com");
    login(&app, &admin).await;
    let bob_id = login(&app, &bob).await;
    let acme = create_tenant(&app, &admin, "Acme", "acme").await;

    let (_, role) = send(
        &app,
        Method::POST,
        &format!("/api/tenants/{acme}/roles"),
        Some(&admin),
        Some(json!({ "name": "Editor", "permissions": ["entities:manage"] })),
    )
    .await;
    let role_id = role["id"].as_str().unwrap();
    let role_uri = format!("/api/tenants/{acme}/roles/{role_id}");

    send(
        &app,
        Method::POST,
        &format!("/api/tenants/{acme}/users/{bob_id}/roles"),
        Some(&admin),
        Some(json!({ "role_id": role_id })),
    )
    .await;

    let (status, _) = send(&app, Method::DELETE, &role_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/tenants/{acme}/users/{bob_id}/roles/{role_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::DELETE, &role_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &role_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn records_of_another_tenant_are_not_found() {
    let app = app().await;
    let admin = token("admin-sub", "admin@example.com");
    login(&app, &admin).await;
    let acme = create_tenant(&app, &admin, "Acme", "acme").await;
    let globex = create_tenant(&app, &admin, "Globex", "globex").await;

    let (_, entity) = send(
        &app,
        Method::POST,
        &format!("/api/tenants/{globex}/entities"),
        Some(&admin),
        Some(json!({ "name": "Invoice" })),
    )
    .await;
    let entity_id = entity["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/tenants/{globex}/entities/{entity_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/tenants/{acme}/entities/{entity_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn malformed_requests_are_bad_requests() {
    let app = app().await;
    let admin = token("admin-sub", "admin@example.com");
    login(&app, &admin).await;
    let acme = create_tenant(&app, &admin, "Acme", "acme").await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/tenants/{acme}/roles"),
        Some(&admin),
        Some(json!({ "name": "Bad", "permissions": ["no:such"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/tenants/not-a-uuid/roles",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/tenants",
        Some(&admin),
        Some(json!({ "name": "Bad Slug", "slug": "Not A Slug" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn team_membership_survives_removal() {
    let app = app().await;
    let admin = token("admin-sub", "admin@example.com");
    let admin_id = login(&app, &admin).await;
    let acme = create_tenant(&app, &admin, "Acme", "acme").await;

    let (status, team) = send(
        &app,
        Method::POST,
        &format!("/api/tenants/{acme}/teams"),
        Some(&admin),
        Some(json!({ "name": "Ops" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let team_id = team["id"].as_str().unwrap();
    let members_uri = format!("/api/tenants/{acme}/teams/{team_id}/members");

    let (status, membership) = send(
        &app,
        Method::POST,
        &members_uri,
        Some(&admin),
        Some(json!({ "user_id": admin_id, "role": "lead" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{membership}");
    let membership_id = membership["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("{members_uri}/{admin_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, members) = send(&app, Method::GET, &members_uri, Some(&admin), None).await;
    assert!(members.as_array().unwrap().is_empty());

    let (status, kept) = send(
        &app,
        Method::GET,
        &format!("/api/tenants/{acme}/teams/{team_id}/memberships/{membership_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(kept["is_active"], false);
}

#[tokio::test]
async fn activity_and_access_are_audited() {
    let app = app().await;
    let admin = token("admin-sub", "admin@example.com");
    login(&app, &admin).await;
    let acme = create_tenant(&app, &admin, "Acme", "acme").await;
    send(
        &app,
        Method::GET,
        &format!("/api/tenants/{acme}"),
        Some(&admin),
        None,
    )
    .await;

    let (status, activity) = send(
        &app,
        Method::GET,
        &format!("/api/tenants/{acme}/audit-logs?category=activity"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(activity["items"][0]["action"], "tenant.create acme");

    let (_, access) = send(
        &app,
        Method::GET,
        &format!("/api/tenants/{acme}/audit-logs?category=access"),
        Some(&admin),
        None,
    )
    .await;
    let paths: Vec<&str> = access["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["path"].as_str())
        .collect();
    assert!(paths.contains(&format!("/api/tenants/{acme}").as_str()));
}

#[tokio::test]
async fn reference_data_is_admin_managed() {
    let app = app().await;
    let admin = token("admin-sub", "admin@example.com");
    let bob = token("bob-sub", "bob@example.com");
    login(&app, &admin).await;
    login(&app, &bob).await;

    let (status, country) = send(
        &app,
        Method::POST,
        "/api/countries",
        Some(&admin),
        Some(json!({ "code": "de", "name": "Germany" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{country}");
    assert_eq!(country["code"], "DE");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/cities",
        Some(&admin),
        Some(json!({ "code": "BER", "name": "Berlin", "parent_code": "de" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, cities) =
        send(&app, Method::GET, "/api/cities?country=DE", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cities["total"], 1);

    let (status, found) =
        send(&app, Method::GET, "/api/countries/by-code/de", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["name"], "Germany");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/currencies",
        Some(&bob),
        Some(json!({ "code": "eur", "name": "Euro", "symbol": "€" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let country_id = country["id"].as_str().unwrap();
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/countries/{country_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
