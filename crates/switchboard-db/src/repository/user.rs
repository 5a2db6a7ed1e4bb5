//! SurrealDB implementation of [`UserRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use switchboard_core::error::{SwitchboardError, SwitchboardResult};
use switchboard_core::models::user::{UpdateUser, UpsertUser, User};
use switchboard_core::repository::{PaginatedResult, Pagination, UserRepository};
use tracing::info;
use uuid::Uuid;

use super::support::{CountRow, first, parse_uuid, total};
use crate::error::{CheckStatements, DbError};

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    external_id: String,
    email: String,
    display_name: String,
    role_label: String,
    is_platform_admin: bool,
    is_active: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid("user", &self.record_id)?,
            external_id: self.external_id,
            email: self.email,
            display_name: self.display_name,
            role_label: self.role_label,
            is_platform_admin: self.is_platform_admin,
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_one(&self, field: &'static str, value: String) -> SwitchboardResult<User> {
        let query = format!("SELECT meta::id(id) AS record_id, * FROM user WHERE {field} = $value");
        let mut result = self
            .db
            .query(query)
            .bind(("value", value.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows, "user", format!("{field}={value}"))?.try_into_user()?)
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn upsert(&self, input: UpsertUser) -> SwitchboardResult<User> {
        let email = input.email.trim().to_lowercase();

        let existing = match self.get_by_external_id(&input.external_id).await {
            Ok(user) => Some(user),
            Err(SwitchboardError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        let id = match existing {
            Some(user) => {
                // The admin flag is only ever raised on sign-in.
                self.db
                    .query(
                        "UPDATE type::record('user', $id) SET \
                         email = $email, display_name = $display_name, \
                         is_platform_admin = is_platform_admin OR $is_platform_admin, \
                         last_login_at = time::now(), updated_at = time::now()",
                    )
                    .bind(("id", user.id.to_string()))
                    .bind(("email", email))
                    .bind(("display_name", input.display_name))
                    .bind(("is_platform_admin", input.is_platform_admin))
                    .await
                    .map_err(DbError::from)?
                    .check_statements("user")?;
                user.id
            }
            None => {
                let id = Uuid::new_v4();
                self.db
                    .query(
                        "CREATE type::record('user', $id) SET \
                         external_id = $external_id, email = $email, \
                         display_name = $display_name, \
                         is_platform_admin = $is_platform_admin, \
                         last_login_at = time::now()",
                    )
                    .bind(("id", id.to_string()))
                    .bind(("external_id", input.external_id))
                    .bind(("email", email))
                    .bind(("display_name", input.display_name))
                    .bind(("is_platform_admin", input.is_platform_admin))
                    .await
                    .map_err(DbError::from)?
                    .check_statements("user")?;
                info!(user_id = %id, "User created on first sign-in");
                id
            }
        };

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> SwitchboardResult<User> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('user', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows, "user", id)?.try_into_user()?)
    }

    async fn get_by_external_id(&self, external_id: &str) -> SwitchboardResult<User> {
        self.find_one("external_id", external_id.to_string()).await
    }

    async fn get_by_email(&self, email: &str) -> SwitchboardResult<User> {
        self.find_one("email", email.trim().to_lowercase()).await
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> SwitchboardResult<User> {
        let mut sets = Vec::new();
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.display_name.is_some() {
            sets.push("display_name = $display_name");
        }
        if input.role_label.is_some() {
            sets.push("role_label = $role_label");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * FROM type::record('user', $id);",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));

        if let Some(email) = input.email {
            builder = builder.bind(("email", email.trim().to_lowercase()));
        }
        if let Some(display_name) = input.display_name {
            builder = builder.bind(("display_name", display_name));
        }
        if let Some(role_label) = input.role_label {
            builder = builder.bind(("role_label", role_label));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check_statements("user")?;

        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "user", id)?.try_into_user()?)
    }

    async fn deactivate(&self, id: Uuid) -> SwitchboardResult<()> {
        self.get_by_id(id).await?;

        self.db
            .query(
                "UPDATE type::record('user', $id) SET \
                 is_active = false, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check_statements("user")?;

        info!(user_id = %id, "User deactivated");
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> SwitchboardResult<PaginatedResult<User>> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM user GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM user \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset;",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: total(count_rows),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
