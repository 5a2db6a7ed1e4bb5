//! SurrealDB implementation of [`TeamRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use switchboard_core::error::{SwitchboardError, SwitchboardResult};
use switchboard_core::models::team::{CreateTeam, Team, TeamMembership, TeamRole, UpdateTeam};
use switchboard_core::repository::{PaginatedResult, Pagination, TeamRepository};
use tracing::info;
use uuid::Uuid;

use super::support::{CountRow, first, is_tenant_member, parse_opt_uuid, parse_uuid, total};
use crate::error::{CheckStatements, DbError};

#[derive(Debug, SurrealValue)]
struct TeamRow {
    record_id: String,
    tenant_id: String,
    name: String,
    description: String,
    manager_id: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TeamRow {
    fn try_into_team(self) -> Result<Team, DbError> {
        Ok(Team {
            id: parse_uuid("team", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            name: self.name,
            description: self.description,
            manager_id: parse_opt_uuid("manager", self.manager_id)?,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct MembershipRow {
    record_id: String,
    tenant_id: String,
    team_id: String,
    user_id: String,
    role: String,
    is_active: bool,
    joined_at: DateTime<Utc>,
    left_at: Option<DateTime<Utc>>,
}

fn parse_team_role(s: &str) -> Result<TeamRole, DbError> {
    match s {
        "member" => Ok(TeamRole::Member),
        "lead" => Ok(TeamRole::Lead),
        "admin" => Ok(TeamRole::Admin),
        other => Err(DbError::Decode(format!("unknown team role: {other}"))),
    }
}

fn team_role_to_string(role: TeamRole) -> String {
    match role {
        TeamRole::Member => "member".into(),
        TeamRole::Lead => "lead".into(),
        TeamRole::Admin => "admin".into(),
    }
}

impl MembershipRow {
    fn try_into_membership(self) -> Result<TeamMembership, DbError> {
        Ok(TeamMembership {
            id: parse_uuid("team_membership", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            team_id: parse_uuid("team", &self.team_id)?,
            user_id: parse_uuid("user", &self.user_id)?,
            role: parse_team_role(&self.role)?,
            is_active: self.is_active,
            joined_at: self.joined_at,
            left_at: self.left_at,
        })
    }
}

/// SurrealDB implementation of the Team repository.
#[derive(Clone)]
pub struct SurrealTeamRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTeamRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn require_member(&self, tenant_id: Uuid, user_id: Uuid) -> SwitchboardResult<()> {
        if is_tenant_member(&self.db, tenant_id, user_id).await? {
            Ok(())
        } else {
            Err(SwitchboardError::validation(format!(
                "user {user_id} is not a member of this tenant"
            )))
        }
    }

    /// The membership row for (team, user), active or not.
    async fn find_membership(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MembershipRow>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM team_membership \
                 WHERE team_id = $team_id AND user_id = $user_id",
            )
            .bind(("team_id", team_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await?;
        let rows: Vec<MembershipRow> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn load_membership(&self, id: &str) -> Result<TeamMembership, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('team_membership', $id)",
            )
            .bind(("id", id.to_string()))
            .await?;
        let rows: Vec<MembershipRow> = result.take(0)?;
        first(rows, "team_membership", id)?.try_into_membership()
    }
}

impl<C: Connection> TeamRepository for SurrealTeamRepository<C> {
    async fn create(&self, input: CreateTeam) -> SwitchboardResult<Team> {
        if let Some(manager_id) = input.manager_id {
            self.require_member(input.tenant_id, manager_id).await?;
        }

        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('team', $id) SET \
                 tenant_id = $tenant_id, \
                 name = $name, description = $description, \
                 manager_id = $manager_id; \
                 SELECT meta::id(id) AS record_id, * FROM type::record('team', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("manager_id", input.manager_id.map(|m| m.to_string())))
            .await
            .map_err(DbError::from)?
            .check_statements("team")?;

        let rows: Vec<TeamRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "team", id)?.try_into_team()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<Team> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM type::record('team', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TeamRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows, "team", id)?.try_into_team()?)
    }

    async fn update(&self, tenant_id: Uuid, id: Uuid, input: UpdateTeam) -> SwitchboardResult<Team> {
        self.get_by_id(tenant_id, id).await?;
        if let Some(Some(manager_id)) = input.manager_id {
            self.require_member(tenant_id, manager_id).await?;
        }

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        match input.manager_id {
            Some(Some(_)) => sets.push("manager_id = $manager_id"),
            Some(None) => sets.push("manager_id = NONE"),
            None => {}
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('team', $id) SET {} \
             WHERE tenant_id = $tenant_id; \
             SELECT meta::id(id) AS record_id, * FROM type::record('team', $id) \
             WHERE tenant_id = $tenant_id;",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(Some(manager_id)) = input.manager_id {
            builder = builder.bind(("manager_id", manager_id.to_string()));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check_statements("team")?;

        let rows: Vec<TeamRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "team", id)?.try_into_team()?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<()> {
        self.get_by_id(tenant_id, id).await?;

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE type::record('team', $id) SET \
                 is_active = false, updated_at = time::now() \
                 WHERE tenant_id = $tenant_id; \
                 UPDATE team_membership SET \
                 is_active = false, left_at = time::now() \
                 WHERE team_id = $id AND is_active = true; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check_statements("team")?;

        info!(tenant_id = %tenant_id, team_id = %id, "Team deactivated");
        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> SwitchboardResult<PaginatedResult<Team>> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM team \
                 WHERE tenant_id = $tenant_id GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM team \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<TeamRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(TeamRow::try_into_team)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: total(count_rows),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn add_member(
        &self,
        tenant_id: Uuid,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
    ) -> SwitchboardResult<TeamMembership> {
        let team = self.get_by_id(tenant_id, team_id).await?;
        if !team.is_active {
            return Err(SwitchboardError::validation(
                "cannot add members to an inactive team",
            ));
        }
        self.require_member(tenant_id, user_id).await?;

        let membership_id = match self.find_membership(team_id, user_id).await? {
            Some(row) if row.is_active => {
                return Err(SwitchboardError::AlreadyExists {
                    entity: "team_membership".into(),
                });
            }
            Some(row) => {
                // Re-joining reuses the historical row.
                self.db
                    .query(
                        "UPDATE type::record('team_membership', $id) SET \
                         role = $role, is_active = true, \
                         joined_at = time::now(), left_at = NONE",
                    )
                    .bind(("id", row.record_id.clone()))
                    .bind(("role", team_role_to_string(role)))
                    .await
                    .map_err(DbError::from)?
                    .check_statements("team_membership")?;
                row.record_id
            }
            None => {
                let id = Uuid::new_v4().to_string();
                self.db
                    .query(
                        "CREATE type::record('team_membership', $id) SET \
                         tenant_id = $tenant_id, team_id = $team_id, \
                         user_id = $user_id, role = $role",
                    )
                    .bind(("id", id.clone()))
                    .bind(("tenant_id", tenant_id.to_string()))
                    .bind(("team_id", team_id.to_string()))
                    .bind(("user_id", user_id.to_string()))
                    .bind(("role", team_role_to_string(role)))
                    .await
                    .map_err(DbError::from)?
                    .check_statements("team_membership")?;
                id
            }
        };

        info!(
            tenant_id = %tenant_id,
            team_id = %team_id,
            user_id = %user_id,
            "Team member added"
        );
        Ok(self.load_membership(&membership_id).await?)
    }

    async fn remove_member(
        &self,
        tenant_id: Uuid,
        team_id: Uuid,
        user_id: Uuid,
    ) -> SwitchboardResult<()> {
        self.get_by_id(tenant_id, team_id).await?;

        let row = self
            .find_membership(team_id, user_id)
            .await?
            .filter(|row| row.is_active)
            .ok_or_else(|| {
                SwitchboardError::not_found(
                    "team_membership",
                    format!("team={team_id},user={user_id}"),
                )
            })?;

        self.db
            .query(
                "UPDATE type::record('team_membership', $id) SET \
                 is_active = false, left_at = time::now()",
            )
            .bind(("id", row.record_id))
            .await
            .map_err(DbError::from)?
            .check_statements("team_membership")?;

        info!(
            tenant_id = %tenant_id,
            team_id = %team_id,
            user_id = %user_id,
            "Team member removed"
        );
        Ok(())
    }

    async fn get_team_members(
        &self,
        tenant_id: Uuid,
        team_id: Uuid,
    ) -> SwitchboardResult<Vec<TeamMembership>> {
        self.get_by_id(tenant_id, team_id).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM team_membership \
                 WHERE tenant_id = $tenant_id AND team_id = $team_id \
                 AND is_active = true \
                 ORDER BY joined_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("team_id", team_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(MembershipRow::try_into_membership)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn get_membership(
        &self,
        tenant_id: Uuid,
        membership_id: Uuid,
    ) -> SwitchboardResult<TeamMembership> {
        let membership = self.load_membership(&membership_id.to_string()).await?;
        if membership.tenant_id != tenant_id {
            return Err(SwitchboardError::not_found("team_membership", membership_id));
        }
        Ok(membership)
    }

    async fn get_user_teams(&self, tenant_id: Uuid, user_id: Uuid) -> SwitchboardResult<Vec<Team>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM team \
                 WHERE tenant_id = $tenant_id AND is_active = true \
                 AND meta::id(id) IN (\
                     SELECT VALUE team_id FROM team_membership \
                     WHERE tenant_id = $tenant_id AND user_id = $user_id \
                     AND is_active = true\
                 ) \
                 ORDER BY name ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TeamRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(TeamRow::try_into_team)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
