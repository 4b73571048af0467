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
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD full_name ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['Admin', 'Hr', 'HiringManager', 'Employee', \
    'InventoryManager'];
DEFINE FIELD department ON TABLE user TYPE option<string>;
DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Job postings
-- =======================================================================
DEFINE TABLE job_posting SCHEMAFULL;
DEFINE FIELD title ON TABLE job_posting TYPE string;
DEFINE FIELD department ON TABLE job_posting TYPE string;
DEFINE FIELD experience_range ON TABLE job_posting TYPE option<string>;
DEFINE FIELD required_skills ON TABLE job_posting TYPE array<string> \
    DEFAULT [];
DEFINE FIELD status ON TABLE job_posting TYPE string \
    ASSERT $value IN ['Open', 'Closed', 'OnHold'];
DEFINE FIELD employment_type ON TABLE job_posting TYPE option<string>;
DEFINE FIELD is_budgeted ON TABLE job_posting TYPE bool DEFAULT false;
DEFINE FIELD description_text ON TABLE job_posting TYPE option<string>;
DEFINE FIELD description_locator ON TABLE job_posting \
    TYPE option<string>;
DEFINE FIELD created_by ON TABLE job_posting TYPE string;
DEFINE FIELD created_at ON TABLE job_posting TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE job_posting TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_job_status ON TABLE job_posting COLUMNS status;

-- =======================================================================
-- Referrals
-- =======================================================================
DEFINE TABLE referral SCHEMAFULL;
DEFINE FIELD job_id ON TABLE referral TYPE string;
DEFINE FIELD referred_by ON TABLE referral TYPE string;
DEFINE FIELD candidate_name ON TABLE referral TYPE string;
DEFINE FIELD candidate_email ON TABLE referral TYPE string;
DEFINE FIELD candidate_phone ON TABLE referral TYPE option<string>;
DEFINE FIELD department ON TABLE referral TYPE option<string>;
DEFINE FIELD experience ON TABLE referral TYPE option<string>;
DEFINE FIELD skills ON TABLE referral TYPE array<string> DEFAULT [];
DEFINE FIELD about_candidate ON TABLE referral TYPE option<string>;
DEFINE FIELD notes ON TABLE referral TYPE option<string>;
DEFINE FIELD status ON TABLE referral TYPE string \
    ASSERT $value IN ['Submitted', 'Reviewed', 'Interviewing', 'Hired', \
    'Rejected'];
DEFINE FIELD resume_locator ON TABLE referral TYPE option<string>;
DEFINE FIELD photo_locator ON TABLE referral TYPE option<string>;
DEFINE FIELD created_at ON TABLE referral TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE referral TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_referral_job ON TABLE referral COLUMNS job_id;
DEFINE INDEX idx_referral_referrer ON TABLE referral COLUMNS referred_by;

-- =======================================================================
-- Assets
-- =======================================================================
DEFINE TABLE asset SCHEMAFULL;
DEFINE FIELD serial_number ON TABLE asset TYPE string;
DEFINE FIELD category ON TABLE asset TYPE string \
    ASSERT $value IN ['Laptop', 'Monitor', 'Desktop', 'Phone', 'Tablet', \
    'Peripheral', 'Other'];
DEFINE FIELD charger_number ON TABLE asset TYPE option<string>;
DEFINE FIELD mac_id ON TABLE asset TYPE option<string>;
DEFINE FIELD external_mouse ON TABLE asset TYPE option<string>;
DEFINE FIELD headphones ON TABLE asset TYPE option<string>;
DEFINE FIELD mouse_pad ON TABLE asset TYPE option<string>;
DEFINE FIELD status ON TABLE asset TYPE string \
    ASSERT $value IN ['Available', 'Assigned', 'Retired'];
DEFINE FIELD current_assignee_name ON TABLE asset TYPE option<string>;
DEFINE FIELD current_assignee_user_id ON TABLE asset TYPE option<string>;
DEFINE FIELD current_assignee_email ON TABLE asset TYPE option<string>;
DEFINE FIELD assigned_date ON TABLE asset TYPE option<datetime>;
DEFINE FIELD previous_assignee_name ON TABLE asset TYPE option<string>;
DEFINE FIELD previous_assignee_user_id ON TABLE asset \
    TYPE option<string>;
DEFINE FIELD previous_assignee_date ON TABLE asset TYPE option<datetime>;
DEFINE FIELD notes ON TABLE asset TYPE option<string>;
DEFINE FIELD procurement_date ON TABLE asset TYPE option<datetime>;
DEFINE FIELD warranty_expiry ON TABLE asset TYPE option<datetime>;
DEFINE FIELD assignment_count ON TABLE asset TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD version ON TABLE asset TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE asset TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE asset TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_asset_serial ON TABLE asset \
    COLUMNS serial_number UNIQUE;
DEFINE INDEX idx_asset_mac ON TABLE asset COLUMNS mac_id;
DEFINE INDEX idx_asset_status ON TABLE asset COLUMNS status;

-- =======================================================================
-- Asset assignment history (append-only)
-- =======================================================================
DEFINE TABLE asset_history SCHEMAFULL;
DEFINE FIELD asset_id ON TABLE asset_history TYPE string;
DEFINE FIELD sequence ON TABLE asset_history TYPE int ASSERT $value >= 1;
DEFINE FIELD assignee_name ON TABLE asset_history TYPE string;
DEFINE FIELD assignee_user_id ON TABLE asset_history TYPE string;
DEFINE FIELD assignee_email ON TABLE asset_history TYPE string;
DEFINE FIELD assigned_date ON TABLE asset_history TYPE datetime;
DEFINE FIELD returned_date ON TABLE asset_history TYPE option<datetime>;
DEFINE FIELD notes ON TABLE asset_history TYPE option<string>;
DEFINE FIELD created_at ON TABLE asset_history TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_history_asset_sequence ON TABLE asset_history \
    COLUMNS asset_id, sequence UNIQUE;
";

/// Run all pending migrations against the database.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn schema_defines_every_table() {
        for table in ["user", "job_posting", "referral", "asset", "asset_history"] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
                "missing table {table}"
            );
        }
    }
}
