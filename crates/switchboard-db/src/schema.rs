//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (global scope)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD slug ON TABLE tenant TYPE string;
DEFINE FIELD description ON TABLE tenant TYPE string DEFAULT '';
DEFINE FIELD is_active ON TABLE tenant TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_slug ON TABLE tenant COLUMNS slug UNIQUE;

-- =======================================================================
-- Users (global scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD external_id ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD display_name ON TABLE user TYPE string;
DEFINE FIELD role_label ON TABLE user TYPE string DEFAULT '';
DEFINE FIELD is_platform_admin ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD last_login_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_external_id ON TABLE user \
    COLUMNS external_id UNIQUE;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Roles (tenant scope)
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE role TYPE string;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string;
DEFINE FIELD permissions ON TABLE role TYPE array<string> DEFAULT [];
DEFINE FIELD is_system ON TABLE role TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_tenant_name ON TABLE role \
    COLUMNS tenant_id, name UNIQUE;

-- =======================================================================
-- Role exceptions (tenant scope)
-- =======================================================================
DEFINE TABLE role_exception SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE role_exception TYPE string;
DEFINE FIELD user_id ON TABLE role_exception TYPE string;
DEFINE FIELD permission ON TABLE role_exception TYPE string;
DEFINE FIELD effect ON TABLE role_exception TYPE string \
    ASSERT $value IN ['allow', 'deny'];
DEFINE FIELD reason ON TABLE role_exception TYPE string DEFAULT '';
DEFINE FIELD valid_from ON TABLE role_exception TYPE option<datetime>;
DEFINE FIELD valid_to ON TABLE role_exception TYPE option<datetime>;
DEFINE FIELD is_active ON TABLE role_exception TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE role_exception TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role_exception TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_exception_user ON TABLE role_exception \
    COLUMNS tenant_id, user_id;

-- =======================================================================
-- Teams (tenant scope)
-- =======================================================================
DEFINE TABLE team SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE team TYPE string;
DEFINE FIELD name ON TABLE team TYPE string;
DEFINE FIELD description ON TABLE team TYPE string DEFAULT '';
DEFINE FIELD manager_id ON TABLE team TYPE option<string>;
DEFINE FIELD is_active ON TABLE team TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE team TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE team TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_team_tenant_name ON TABLE team \
    COLUMNS tenant_id, name UNIQUE;

DEFINE TABLE team_membership SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE team_membership TYPE string;
DEFINE FIELD team_id ON TABLE team_membership TYPE string;
DEFINE FIELD user_id ON TABLE team_membership TYPE string;
DEFINE FIELD role ON TABLE team_membership TYPE string \
    ASSERT $value IN ['member', 'lead', 'admin'];
DEFINE FIELD is_active ON TABLE team_membership TYPE bool DEFAULT true;
DEFINE FIELD joined_at ON TABLE team_membership TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD left_at ON TABLE team_membership TYPE option<datetime>;
DEFINE INDEX idx_membership_team_user ON TABLE team_membership \
    COLUMNS team_id, user_id UNIQUE;

-- =======================================================================
-- Entities (tenant scope, hierarchical)
-- =======================================================================
DEFINE TABLE entity SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE entity TYPE string;
DEFINE FIELD name ON TABLE entity TYPE string;
DEFINE FIELD description ON TABLE entity TYPE string DEFAULT '';
DEFINE FIELD parent_entity_id ON TABLE entity TYPE option<string>;
DEFINE FIELD field_schema ON TABLE entity TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD record_count ON TABLE entity TYPE int DEFAULT 0;
DEFINE FIELD last_modified ON TABLE entity TYPE option<datetime>;
DEFINE FIELD is_active ON TABLE entity TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE entity TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE entity TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_entity_tenant_name ON TABLE entity \
    COLUMNS tenant_id, name UNIQUE;
DEFINE INDEX idx_entity_parent ON TABLE entity \
    COLUMNS tenant_id, parent_entity_id;

-- =======================================================================
-- Screen assets (tenant scope)
-- =======================================================================
DEFINE TABLE screen_asset SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE screen_asset TYPE string;
DEFINE FIELD name ON TABLE screen_asset TYPE string;
DEFINE FIELD asset_type ON TABLE screen_asset TYPE string \
    ASSERT $value IN ['screen', 'form', 'report', 'dashboard'];
DEFINE FIELD entity_id ON TABLE screen_asset TYPE option<string>;
DEFINE FIELD configuration ON TABLE screen_asset TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD is_active ON TABLE screen_asset TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE screen_asset TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE screen_asset TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Transactions (tenant scope)
-- =======================================================================
DEFINE TABLE transaction_definition SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE transaction_definition TYPE string;
DEFINE FIELD name ON TABLE transaction_definition TYPE string;
DEFINE FIELD description ON TABLE transaction_definition TYPE string \
    DEFAULT '';
DEFINE FIELD source_entity_id ON TABLE transaction_definition \
    TYPE string;
DEFINE FIELD target_entity_id ON TABLE transaction_definition \
    TYPE string;
DEFINE FIELD workflow ON TABLE transaction_definition \
    TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD is_active ON TABLE transaction_definition TYPE bool \
    DEFAULT true;
DEFINE FIELD created_at ON TABLE transaction_definition TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE transaction_definition TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_txdef_tenant_name ON TABLE transaction_definition \
    COLUMNS tenant_id, name UNIQUE;

DEFINE TABLE transaction_instance SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE transaction_instance TYPE string;
DEFINE FIELD definition_id ON TABLE transaction_instance TYPE string;
DEFINE FIELD status ON TABLE transaction_instance TYPE string \
    ASSERT $value IN ['pending', 'processing', 'completed', 'failed'];
DEFINE FIELD payload ON TABLE transaction_instance TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD error_message ON TABLE transaction_instance \
    TYPE option<string>;
DEFINE FIELD started_at ON TABLE transaction_instance \
    TYPE option<datetime>;
DEFINE FIELD completed_at ON TABLE transaction_instance \
    TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE transaction_instance TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE transaction_instance TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_txinst_definition ON TABLE transaction_instance \
    COLUMNS tenant_id, definition_id;

-- =======================================================================
-- Reference data (global scope)
-- =======================================================================
DEFINE TABLE reference_item SCHEMAFULL;
DEFINE FIELD kind ON TABLE reference_item TYPE string \
    ASSERT $value IN ['country', 'currency', 'language', 'city'];
DEFINE FIELD code ON TABLE reference_item TYPE string;
DEFINE FIELD name ON TABLE reference_item TYPE string;
DEFINE FIELD parent_code ON TABLE reference_item TYPE option<string>;
DEFINE FIELD symbol ON TABLE reference_item TYPE option<string>;
DEFINE FIELD is_active ON TABLE reference_item TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE reference_item TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE reference_item TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_reference_kind_code ON TABLE reference_item \
    COLUMNS kind, code UNIQUE;

-- =======================================================================
-- Audit log (append-only)
-- =======================================================================
DEFINE TABLE log_entry SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD tenant_id ON TABLE log_entry TYPE option<string>;
DEFINE FIELD user_id ON TABLE log_entry TYPE option<string>;
DEFINE FIELD category ON TABLE log_entry TYPE string \
    ASSERT $value IN ['access', 'error', 'exception', 'activity'];
DEFINE FIELD action ON TABLE log_entry TYPE string;
DEFINE FIELD method ON TABLE log_entry TYPE option<string>;
DEFINE FIELD path ON TABLE log_entry TYPE option<string>;
DEFINE FIELD status ON TABLE log_entry TYPE option<int>;
DEFINE FIELD duration_ms ON TABLE log_entry TYPE option<int>;
DEFINE FIELD message ON TABLE log_entry TYPE string;
DEFINE FIELD metadata ON TABLE log_entry TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD timestamp ON TABLE log_entry TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_log_tenant_time ON TABLE log_entry \
    COLUMNS tenant_id, timestamp;
DEFINE INDEX idx_log_category ON TABLE log_entry \
    COLUMNS category, timestamp;

-- =======================================================================
-- Health checks (append-only)
-- =======================================================================
DEFINE TABLE health_check SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD component ON TABLE health_check TYPE string;
DEFINE FIELD status ON TABLE health_check TYPE string \
    ASSERT $value IN ['healthy', 'degraded', 'unhealthy'];
DEFINE FIELD latency_ms ON TABLE health_check TYPE int;
DEFINE FIELD detail ON TABLE health_check TYPE option<string>;
DEFINE FIELD checked_at ON TABLE health_check TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Graph edge tables (relations)
-- =======================================================================

-- User -> Role assignment within the role's tenant
DEFINE TABLE has_role TYPE RELATION IN user OUT role SCHEMAFULL;
DEFINE FIELD assignment_id ON TABLE has_role TYPE string;
DEFINE FIELD tenant_id ON TABLE has_role TYPE string;
DEFINE FIELD created_at ON TABLE has_role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_has_role_pair ON TABLE has_role COLUMNS in, out UNIQUE;
DEFINE INDEX idx_has_role_tenant ON TABLE has_role COLUMNS tenant_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
