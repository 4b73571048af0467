//! SurrealDB repository implementations.

mod asset;
mod job;
mod referral;
mod user;

pub use asset::SurrealAssetRepository;
pub use job::SurrealJobRepository;
pub use referral::SurrealReferralRepository;
pub use user::SurrealUserRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(entity: &str, field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value)
        .map_err(|e| DbError::corrupt(entity, format!("invalid {field} UUID: {e}")))
}

/// Build a `WHERE` clause from the given conditions (empty when none).
fn where_clause(conditions: &[&str]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}
