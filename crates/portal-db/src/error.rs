//! Database-specific error types and conversions.

use portal_core::error::PortalError;
use surrealdb::IndexedResults;
use surrealdb_types::QueryError;

/// Marker thrown by the version guard of a lifecycle transaction.
pub(crate) const VERSION_CONFLICT: &str = "asset_version_conflict";

/// Unique index on `(asset_id, sequence)` of `asset_history`.
pub(crate) const HISTORY_SEQUENCE_INDEX: &str = "idx_history_asset_sequence";

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A unique index rejected the write.
    #[error("Duplicate {entity}: {detail}")]
    Duplicate { entity: String, detail: String },

    /// A versioned write found a newer version, or the transaction was
    /// cancelled by a conflicting writer.
    #[error("Version conflict on {entity} with id {id}")]
    VersionConflict { entity: String, id: String },

    /// A transition contradicts what is already stored for the entity.
    #[error("Inconsistent {entity} with id {id}: {detail}")]
    Inconsistent {
        entity: String,
        id: String,
        detail: String,
    },

    /// A stored value could not be mapped back into a domain model.
    #[error("Corrupt {entity} row: {detail}")]
    Corrupt { entity: String, detail: String },
}

impl DbError {
    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub(crate) fn corrupt(entity: &str, detail: impl ToString) -> Self {
        DbError::Corrupt {
            entity: entity.into(),
            detail: detail.to_string(),
        }
    }

    /// Classify an error from a write statement, recognising unique index
    /// violations.
    pub(crate) fn from_write(entity: &str, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            DbError::Duplicate {
                entity: entity.into(),
                detail: message,
            }
        } else {
            DbError::Surreal(err)
        }
    }

    /// Check the results of a `BEGIN … COMMIT` block.
    ///
    /// Once one statement fails, SurrealDB reports every other statement of
    /// the transaction as not executed, so the failure that caused the
    /// rollback is the one classified. Only the version guard and a storage
    /// level transaction conflict count as a lost race.
    pub(crate) fn check_transaction(
        entity: &str,
        id: impl ToString,
        mut response: IndexedResults,
    ) -> Result<IndexedResults, DbError> {
        let mut errors: Vec<(usize, surrealdb::Error)> =
            response.take_errors().into_iter().collect();
        if errors.is_empty() {
            return Ok(response);
        }
        errors.sort_by_key(|(index, _)| *index);
        let cause = errors
            .iter()
            .position(|(_, e)| !is_rolled_back(e))
            .unwrap_or(errors.len() - 1);
        let (_, err) = errors.swap_remove(cause);
        Err(Self::from_transaction(entity, id.to_string(), err))
    }

    fn from_transaction(entity: &str, id: String, err: surrealdb::Error) -> Self {
        let message = err.message();
        if message.contains(VERSION_CONFLICT)
            || matches!(err.query_details(), Some(QueryError::TransactionConflict))
        {
            DbError::VersionConflict {
                entity: entity.into(),
                id,
            }
        } else if message.contains("already contains") && message.contains(HISTORY_SEQUENCE_INDEX) {
            DbError::Inconsistent {
                entity: entity.into(),
                id,
                detail: format!("history sequence already taken ({message})"),
            }
        } else {
            DbError::from_write(entity, err)
        }
    }
}

/// Statements skipped because another statement of the same transaction
/// failed.
fn is_rolled_back(err: &surrealdb::Error) -> bool {
    matches!(
        err.query_details(),
        Some(QueryError::NotExecuted | QueryError::Cancelled)
    )
}

impl From<DbError> for PortalError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => PortalError::NotFound { entity, id },
            DbError::Duplicate { entity, detail } => PortalError::Conflict {
                message: format!("{entity} already exists ({detail})"),
            },
            DbError::VersionConflict { entity, id } => {
                PortalError::ConcurrentModification { entity, id }
            }
            DbError::Inconsistent { entity, id, detail } => PortalError::InvalidState {
                message: format!("{entity} {id}: {detail}"),
            },
            other => PortalError::Database(other.to_string()),
        }
    }
}
