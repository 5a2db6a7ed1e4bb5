//! Teams and team memberships.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use switchboard_core::error::SwitchboardError;
use switchboard_core::models::permission::Permission;
use switchboard_core::models::team::{CreateTeam, Team, TeamMembership, TeamRole, UpdateTeam};
use switchboard_core::repository::{PaginatedResult, TeamRepository, UserRepository};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery, PageQuery, TenantContext};
use crate::api::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/tenants/:tenant_id/teams", get(list_teams).post(create_team))
        .route(
            "/tenants/:tenant_id/teams/:team_id",
            get(get_team).put(update_team).delete(delete_team),
        )
        .route(
            "/tenants/:tenant_id/teams/:team_id/members",
            get(list_members).post(add_member),
        )
        .route(
            "/tenants/:tenant_id/teams/:team_id/members/:user_id",
            delete(remove_member),
        )
        .route(
            "/tenants/:tenant_id/teams/:team_id/memberships/:membership_id",
            get(get_membership),
        )
        .route("/tenants/:tenant_id/users/:user_id/teams", get(user_teams))
}

#[derive(Debug, Deserialize)]
struct CreateTeamRequest {
    name: String,
    #[serde(default)]
    description: String,
    manager_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct AddMemberRequest {
    user_id: Uuid,
    #[serde(default)]
    role: TeamRole,
}

async fn list_teams(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<PaginatedResult<Team>>> {
    ctx.require(&state, Permission::TeamsView).await?;
    Ok(Json(
        state.teams.list(ctx.tenant_id(), query.pagination()).await?,
    ))
}

async fn create_team(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiJson(body): ApiJson<CreateTeamRequest>,
) -> ApiResult<Json<Team>> {
    ctx.require(&state, Permission::TeamsManage).await?;
    let input = CreateTeam {
        tenant_id: ctx.tenant_id(),
        name: body.name,
        description: body.description,
        manager_id: body.manager_id,
    };
    input.validate()?;
    let team = state.teams.create(input).await?;
    state
        .record_activity(ctx.tenant.id, ctx.user.id, format!("team.create {}", team.name))
        .await;
    Ok(Json(team))
}

async fn get_team(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, team_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Team>> {
    ctx.require(&state, Permission::TeamsView).await?;
    Ok(Json(state.teams.get_by_id(ctx.tenant_id(), team_id).await?))
}

async fn update_team(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, team_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(input): ApiJson<UpdateTeam>,
) -> ApiResult<Json<Team>> {
    ctx.require(&state, Permission::TeamsManage).await?;
    input.validate()?;
    let team = state.teams.update(ctx.tenant_id(), team_id, input).await?;
    state
        .record_activity(ctx.tenant.id, ctx.user.id, format!("team.update {}", team.name))
        .await;
    Ok(Json(team))
}

async fn delete_team(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, team_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    ctx.require(&state, Permission::TeamsManage).await?;
    state.teams.delete(ctx.tenant_id(), team_id).await?;
    state
        .record_activity(ctx.tenant.id, ctx.user.id, format!("team.delete {team_id}"))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_members(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, team_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Vec<TeamMembership>>> {
    ctx.require(&state, Permission::TeamsView).await?;
    Ok(Json(
        state
            .teams
            .get_team_members(ctx.tenant_id(), team_id)
            .await?,
    ))
}

async fn add_member(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, team_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(body): ApiJson<AddMemberRequest>,
) -> ApiResult<Json<TeamMembership>> {
    ctx.require(&state, Permission::TeamsManage).await?;
    state.users.get_by_id(body.user_id).await?;
    let membership = state
        .teams
        .add_member(ctx.tenant_id(), team_id, body.user_id, body.role)
        .await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("team.add_member {team_id} {}", body.user_id),
        )
        .await;
    Ok(Json(membership))
}

async fn remove_member(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, team_id, user_id)): ApiPath<(Uuid, Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    ctx.require(&state, Permission::TeamsManage).await?;
    state
        .teams
        .remove_member(ctx.tenant_id(), team_id, user_id)
        .await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("team.remove_member {team_id} {user_id}"),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// Memberships stay readable after removal.
async fn get_membership(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, team_id, membership_id)): ApiPath<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Json<TeamMembership>> {
    ctx.require(&state, Permission::TeamsView).await?;
    let membership = state
        .teams
        .get_membership(ctx.tenant_id(), membership_id)
        .await?;
    if membership.team_id != team_id {
        return Err(SwitchboardError::not_found("team_membership", membership_id).into());
    }
    Ok(Json(membership))
}

async fn user_teams(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Vec<Team>>> {
    ctx.require(&state, Permission::TeamsView).await?;
    Ok(Json(
        state.teams.get_user_teams(ctx.tenant_id(), user_id).await?,
    ))
}
