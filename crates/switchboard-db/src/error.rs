//! Database-specific error types and conversions.

use surrealdb::IndexedResults;
use switchboard_core::error::SwitchboardError;

/// Prefixes for guard failures raised with `THROW` inside a query.
pub(crate) const THROWN_CONFLICT: &str = "[conflict] ";
pub(crate) const THROWN_INVALID: &str = "[invalid] ";
/// Followed by `<entity> <id>`.
pub(crate) const THROWN_MISSING: &str = "[missing] ";

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate {entity}")]
    Duplicate { entity: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rejected: {0}")]
    Invalid(String),
}

impl DbError {
    /// Classify the failed statements of one query. Inside a transaction
    /// only the statement that failed carries the cause; the others report
    /// that the transaction was cancelled, so every message is inspected.
    /// SurrealDB reports unique index violations as
    /// "Database index `…` already contains …".
    pub(crate) fn statements(entity: &str, messages: &[String]) -> Self {
        for message in messages {
            if let Some(err) = Self::thrown(message) {
                return err;
            }
        }
        if messages.iter().any(|m| m.contains("already contains")) {
            return DbError::Duplicate {
                entity: entity.into(),
            };
        }
        let cause = messages
            .iter()
            .find(|m| !m.contains("not executed due to a failed transaction"))
            .or(messages.first());
        DbError::Query(cause.cloned().unwrap_or_default())
    }

    fn thrown(message: &str) -> Option<Self> {
        if let Some(at) = message.find(THROWN_CONFLICT) {
            return Some(DbError::Conflict(message[at + THROWN_CONFLICT.len()..].into()));
        }
        if let Some(at) = message.find(THROWN_INVALID) {
            return Some(DbError::Invalid(message[at + THROWN_INVALID.len()..].into()));
        }
        let at = message.find(THROWN_MISSING)?;
        let rest = &message[at + THROWN_MISSING.len()..];
        let (entity, id) = rest.split_once(' ').unwrap_or((rest, ""));
        Some(DbError::not_found(entity, id))
    }

    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

/// Statement-level error check for a query response.
pub(crate) trait CheckStatements: Sized {
    fn check_statements(self, entity: &str) -> Result<Self, DbError>;
}

impl CheckStatements for IndexedResults {
    fn check_statements(mut self, entity: &str) -> Result<Self, DbError> {
        let mut errors: Vec<_> = self.take_errors().into_iter().collect();
        if errors.is_empty() {
            return Ok(self);
        }
        errors.sort_by_key(|(index, _)| *index);
        let messages: Vec<String> = errors.iter().map(|(_, e)| e.to_string()).collect();
        Err(DbError::statements(entity, &messages))
    }
}

impl From<DbError> for SwitchboardError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => SwitchboardError::NotFound { entity, id },
            DbError::Duplicate { entity } => SwitchboardError::AlreadyExists { entity },
            DbError::Conflict(reason) => SwitchboardError::Conflict { reason },
            DbError::Invalid(message) => SwitchboardError::Validation { message },
            other => SwitchboardError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANCELLED: &str = "The query was not executed due to a failed transaction";

    fn classify(messages: &[&str]) -> DbError {
        let messages: Vec<String> = messages.iter().map(|m| m.to_string()).collect();
        DbError::statements("tenant", &messages)
    }

    #[test]
    fn duplicate_maps_to_already_exists() {
        let err: SwitchboardError = DbError::Duplicate {
            entity: "tenant".into(),
        }
        .into();
        assert!(matches!(err, SwitchboardError::AlreadyExists { entity } if entity == "tenant"));
    }

    #[test]
    fn not_found_is_preserved() {
        let err: SwitchboardError = DbError::not_found("role", "r1").into();
        assert!(matches!(err, SwitchboardError::NotFound { .. }));
    }

    #[test]
    fn other_errors_become_database_errors() {
        let err: SwitchboardError = DbError::Query("boom".into()).into();
        assert!(matches!(err, SwitchboardError::Database(msg) if msg.contains("boom")));
    }

    #[test]
    fn index_violation_behind_a_cancelled_statement_is_a_duplicate() {
        let err = classify(&[
            CANCELLED,
            "Database index `tenant_slug` already contains 'acme', with record `tenant:x`",
            CANCELLED,
        ]);
        assert!(matches!(err, DbError::Duplicate { entity } if entity == "tenant"));
    }

    #[test]
    fn thrown_guards_are_mapped() {
        let err: SwitchboardError =
            classify(&[CANCELLED, "An error occurred: [conflict] role 'x' is still assigned"]).into();
        assert!(matches!(err, SwitchboardError::Conflict { reason } if reason == "role 'x' is still assigned"));

        let err: SwitchboardError = classify(&["An error occurred: [invalid] cycle"]).into();
        assert!(matches!(err, SwitchboardError::Validation { message } if message == "cycle"));

        let err: SwitchboardError = classify(&["An error occurred: [missing] role r1"]).into();
        assert!(matches!(err, SwitchboardError::NotFound { entity, id } if entity == "role" && id == "r1"));
    }

    #[test]
    fn cause_is_preferred_over_cancellation_notice() {
        let err = classify(&[CANCELLED, "Found 'x' for field `kind`"]);
        assert!(matches!(err, DbError::Query(msg) if msg.starts_with("Found")));
    }
}
