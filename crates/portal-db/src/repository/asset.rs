//! SurrealDB implementation of [`AssetRepository`].
//!
//! Assignment slots are stored flat on the asset row
//! (`current_assignee_*`, `previous_assignee_*`). Lifecycle transitions
//! are written in a single transaction that first re-checks the asset's
//! `version`; a mismatch throws and nothing is written.

use chrono::{DateTime, Utc};
use portal_core::error::{PortalError, PortalResult};
use portal_core::lifecycle::Transition;
use portal_core::models::asset::{
    Asset, AssetCategory, AssetFilter, AssetHistory, AssetSnapshot, AssetStatus, Assignee,
    CreateAsset, CurrentAssignment, PreviousAssignment, UpdateAsset,
};
use portal_core::repository::{AssetRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::error;
use uuid::Uuid;

use super::{CountRow, parse_uuid, where_clause};
use crate::error::{DbError, VERSION_CONFLICT};

#[derive(Debug, SurrealValue)]
struct AssetRow {
    record_id: String,
    serial_number: String,
    category: String,
    charger_number: Option<String>,
    mac_id: Option<String>,
    external_mouse: Option<String>,
    headphones: Option<String>,
    mouse_pad: Option<String>,
    status: String,
    current_assignee_name: Option<String>,
    current_assignee_user_id: Option<String>,
    current_assignee_email: Option<String>,
    assigned_date: Option<DateTime<Utc>>,
    previous_assignee_name: Option<String>,
    previous_assignee_user_id: Option<String>,
    previous_assignee_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    procurement_date: Option<DateTime<Utc>>,
    warranty_expiry: Option<DateTime<Utc>>,
    assignment_count: u32,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct HistoryRow {
    record_id: String,
    asset_id: String,
    sequence: u32,
    assignee_name: String,
    assignee_user_id: String,
    assignee_email: String,
    assigned_date: DateTime<Utc>,
    returned_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

/// Rows returned by a version-guarded `UPDATE`.
#[derive(Debug, SurrealValue)]
struct VersionRow {
    version: u64,
}

fn parse_status(s: &str) -> Result<AssetStatus, DbError> {
    match s {
        "Available" => Ok(AssetStatus::Available),
        "Assigned" => Ok(AssetStatus::Assigned),
        "Retired" => Ok(AssetStatus::Retired),
        other => Err(DbError::corrupt(
            "asset",
            format!("unknown asset status: {other}"),
        )),
    }
}

fn status_to_string(s: &AssetStatus) -> &'static str {
    match s {
        AssetStatus::Available => "Available",
        AssetStatus::Assigned => "Assigned",
        AssetStatus::Retired => "Retired",
    }
}

fn parse_category(s: &str) -> Result<AssetCategory, DbError> {
    match s {
        "Laptop" => Ok(AssetCategory::Laptop),
        "Monitor" => Ok(AssetCategory::Monitor),
        "Desktop" => Ok(AssetCategory::Desktop),
        "Phone" => Ok(AssetCategory::Phone),
        "Tablet" => Ok(AssetCategory::Tablet),
        "Peripheral" => Ok(AssetCategory::Peripheral),
        "Other" => Ok(AssetCategory::Other),
        other => Err(DbError::corrupt(
            "asset",
            format!("unknown asset category: {other}"),
        )),
    }
}

fn category_to_string(c: &AssetCategory) -> &'static str {
    match c {
        AssetCategory::Laptop => "Laptop",
        AssetCategory::Monitor => "Monitor",
        AssetCategory::Desktop => "Desktop",
        AssetCategory::Phone => "Phone",
        AssetCategory::Tablet => "Tablet",
        AssetCategory::Peripheral => "Peripheral",
        AssetCategory::Other => "Other",
    }
}

impl AssetRow {
    fn try_into_asset(self) -> Result<Asset, DbError> {
        let current = match (
            self.current_assignee_name,
            self.current_assignee_user_id,
            self.current_assignee_email,
            self.assigned_date,
        ) {
            (Some(name), Some(user_id), Some(email), Some(assigned_date)) => {
                Some(CurrentAssignment {
                    assignee: Assignee {
                        name,
                        user_id,
                        email,
                    },
                    assigned_date,
                })
            }
            (None, None, None, None) => None,
            _ => {
                return Err(DbError::corrupt(
                    "asset",
                    format!("partial current assignment on {}", self.record_id),
                ));
            }
        };
        let previous = match (
            self.previous_assignee_name,
            self.previous_assignee_user_id,
            self.previous_assignee_date,
        ) {
            (Some(name), Some(user_id), Some(date)) => Some(PreviousAssignment {
                name,
                user_id,
                date,
            }),
            _ => None,
        };

        Ok(Asset {
            id: parse_uuid("asset", "record", &self.record_id)?,
            serial_number: self.serial_number,
            category: parse_category(&self.category)?,
            charger_number: self.charger_number,
            mac_id: self.mac_id,
            external_mouse: self.external_mouse,
            headphones: self.headphones,
            mouse_pad: self.mouse_pad,
            status: parse_status(&self.status)?,
            current,
            previous,
            notes: self.notes,
            procurement_date: self.procurement_date,
            warranty_expiry: self.warranty_expiry,
            assignment_count: self.assignment_count,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl HistoryRow {
    fn try_into_history(self) -> Result<AssetHistory, DbError> {
        Ok(AssetHistory {
            id: parse_uuid("asset_history", "record", &self.record_id)?,
            asset_id: parse_uuid("asset_history", "asset", &self.asset_id)?,
            sequence: self.sequence,
            assignee: Assignee {
                name: self.assignee_name,
                user_id: self.assignee_user_id,
                email: self.assignee_email,
            },
            assigned_date: self.assigned_date,
            returned_date: self.returned_date,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Asset repository.
#[derive(Clone)]
pub struct SurrealAssetRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAssetRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// MAC ids are optional, so uniqueness is checked here rather than by
    /// a unique index.
    async fn ensure_mac_free(&self, mac_id: &str, except: Option<Uuid>) -> PortalResult<()> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM asset \
                 WHERE mac_id = $mac_id",
            )
            .bind(("mac_id", mac_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<AssetRow> = result.take(0).map_err(DbError::from)?;
        let except = except.map(|id| id.to_string());
        if rows
            .iter()
            .any(|row| Some(&row.record_id) != except.as_ref())
        {
            return Err(PortalError::conflict(format!(
                "an asset with MAC id {mac_id} already exists"
            )));
        }
        Ok(())
    }

    async fn open_entries(&self, id: Uuid) -> PortalResult<Vec<AssetHistory>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM asset_history \
                 WHERE asset_id = $asset_id AND returned_date = NONE \
                 ORDER BY sequence ASC",
            )
            .bind(("asset_id", id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<HistoryRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_history())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}

impl<C: Connection> AssetRepository for SurrealAssetRepository<C> {
    async fn create(&self, input: CreateAsset) -> PortalResult<Asset> {
        if let Some(mac_id) = input.mac_id.as_deref() {
            self.ensure_mac_free(mac_id, None).await?;
        }

        let id = Uuid::new_v4();
        self.db
            .query(
                "CREATE type::record('asset', $id) SET \
                 serial_number = $serial_number, category = $category, \
                 charger_number = $charger_number, mac_id = $mac_id, \
                 external_mouse = $external_mouse, \
                 headphones = $headphones, mouse_pad = $mouse_pad, \
                 status = 'Available', \
                 current_assignee_name = NONE, \
                 current_assignee_user_id = NONE, \
                 current_assignee_email = NONE, assigned_date = NONE, \
                 previous_assignee_name = NONE, \
                 previous_assignee_user_id = NONE, \
                 previous_assignee_date = NONE, \
                 notes = $notes, procurement_date = $procurement_date, \
                 warranty_expiry = $warranty_expiry, \
                 assignment_count = 0, version = 0",
            )
            .bind(("id", id.to_string()))
            .bind(("serial_number", input.serial_number.trim().to_string()))
            .bind(("category", category_to_string(&input.category).to_string()))
            .bind(("charger_number", input.charger_number))
            .bind(("mac_id", input.mac_id))
            .bind(("external_mouse", input.external_mouse))
            .bind(("headphones", input.headphones))
            .bind(("mouse_pad", input.mouse_pad))
            .bind(("notes", input.notes))
            .bind(("procurement_date", input.procurement_date))
            .bind(("warranty_expiry", input.warranty_expiry))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_write("asset", e))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> PortalResult<Asset> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('asset', $id)",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssetRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("asset", id))?;

        Ok(row.try_into_asset()?)
    }

    async fn list(
        &self,
        filter: AssetFilter,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<Asset>> {
        let mut conditions = Vec::new();
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        if filter.category.is_some() {
            conditions.push("category = $category");
        }
        if filter.assignee_user_id.is_some() {
            conditions.push("current_assignee_user_id = $assignee_user_id");
        }
        let filter_sql = where_clause(&conditions);

        let status = filter.status.map(|s| status_to_string(&s).to_string());
        let category = filter.category.map(|c| category_to_string(&c).to_string());
        let assignee_user_id = filter.assignee_user_id;

        let count_query = format!("SELECT count() AS total FROM asset{filter_sql} GROUP ALL");
        let mut count_result = self
            .db
            .query(&count_query)
            .bind(("status", status.clone()))
            .bind(("category", category.clone()))
            .bind(("assignee_user_id", assignee_user_id.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM asset{filter_sql} \
             ORDER BY created_at ASC \
             LIMIT $limit START $offset"
        );
        let mut result = self
            .db
            .query(&query)
            .bind(("status", status))
            .bind(("category", category))
            .bind(("assignee_user_id", assignee_user_id))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssetRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_asset())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn update_details(
        &self,
        id: Uuid,
        expected_version: u64,
        input: UpdateAsset,
    ) -> PortalResult<Asset> {
        self.get_by_id(id).await?;
        if let Some(mac_id) = input.mac_id.as_deref() {
            self.ensure_mac_free(mac_id, Some(id)).await?;
        }

        let mut sets = Vec::new();
        if input.category.is_some() {
            sets.push("category = $category");
        }
        if input.charger_number.is_some() {
            sets.push("charger_number = $charger_number");
        }
        if input.mac_id.is_some() {
            sets.push("mac_id = $mac_id");
        }
        if input.external_mouse.is_some() {
            sets.push("external_mouse = $external_mouse");
        }
        if input.headphones.is_some() {
            sets.push("headphones = $headphones");
        }
        if input.mouse_pad.is_some() {
            sets.push("mouse_pad = $mouse_pad");
        }
        if input.notes.is_some() {
            sets.push("notes = $notes");
        }
        if input.procurement_date.is_some() {
            sets.push("procurement_date = $procurement_date");
        }
        if input.warranty_expiry.is_some() {
            sets.push("warranty_expiry = $warranty_expiry");
        }
        sets.push("version = version + 1");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('asset', $id) SET {} \
             WHERE version = $expected_version",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("expected_version", expected_version));
        if let Some(ref category) = input.category {
            builder = builder.bind(("category", category_to_string(category).to_string()));
        }
        if let Some(charger_number) = input.charger_number {
            builder = builder.bind(("charger_number", charger_number));
        }
        if let Some(mac_id) = input.mac_id {
            builder = builder.bind(("mac_id", mac_id));
        }
        if let Some(external_mouse) = input.external_mouse {
            builder = builder.bind(("external_mouse", external_mouse));
        }
        if let Some(headphones) = input.headphones {
            builder = builder.bind(("headphones", headphones));
        }
        if let Some(mouse_pad) = input.mouse_pad {
            builder = builder.bind(("mouse_pad", mouse_pad));
        }
        if let Some(notes) = input.notes {
            builder = builder.bind(("notes", notes));
        }
        if let Some(procurement_date) = input.procurement_date {
            builder = builder.bind(("procurement_date", procurement_date));
        }
        if let Some(warranty_expiry) = input.warranty_expiry {
            builder = builder.bind(("warranty_expiry", warranty_expiry));
        }

        let response = builder.await.map_err(DbError::from)?;
        let mut result = DbError::check_transaction("asset", id, response)?;
        let updated: Vec<VersionRow> = result.take(0).map_err(DbError::from)?;
        if updated.is_empty() {
            return Err(DbError::VersionConflict {
                entity: "asset".into(),
                id: id.to_string(),
            }
            .into());
        }

        self.get_by_id(id).await
    }

    async fn snapshot(&self, id: Uuid) -> PortalResult<AssetSnapshot> {
        let asset = self.get_by_id(id).await?;
        let mut open = self.open_entries(id).await?;
        if open.len() > 1 {
            error!(
                asset_id = %id,
                open_entries = open.len(),
                "Asset has more than one open history entry"
            );
            return Err(PortalError::InvalidState {
                message: format!(
                    "asset {} has {} open history entries",
                    asset.serial_number,
                    open.len()
                ),
            });
        }
        Ok(AssetSnapshot {
            asset,
            open_entry: open.pop(),
        })
    }

    async fn apply_transition(&self, transition: &Transition) -> PortalResult<Asset> {
        let asset = &transition.asset;
        if let Some(mac_id) = asset.mac_id.as_deref() {
            self.ensure_mac_free(mac_id, Some(asset.id)).await?;
        }

        let mut statements = vec![
            "BEGIN TRANSACTION".to_string(),
            format!(
                "IF (SELECT VALUE version FROM type::record('asset', $id))[0] \
                 != $expected_version {{ THROW '{VERSION_CONFLICT}' }}"
            ),
            "UPDATE type::record('asset', $id) SET \
             category = $category, charger_number = $charger_number, \
             mac_id = $mac_id, external_mouse = $external_mouse, \
             headphones = $headphones, mouse_pad = $mouse_pad, \
             procurement_date = $procurement_date, \
             warranty_expiry = $warranty_expiry, \
             status = $status, notes = $notes, \
             current_assignee_name = $current_name, \
             current_assignee_user_id = $current_user_id, \
             current_assignee_email = $current_email, \
             assigned_date = $assigned_date, \
             previous_assignee_name = $previous_name, \
             previous_assignee_user_id = $previous_user_id, \
             previous_assignee_date = $previous_date, \
             assignment_count = $assignment_count, \
             version = version + 1, updated_at = time::now()"
                .to_string(),
        ];
        if transition.close.is_some() {
            statements.push(
                "UPDATE type::record('asset_history', $close_id) SET \
                 returned_date = $returned_date, notes = $close_notes \
                 WHERE returned_date = NONE"
                    .to_string(),
            );
        }
        if transition.open.is_some() {
            statements.push(
                "CREATE type::record('asset_history', $open_id) SET \
                 asset_id = $id, sequence = $sequence, \
                 assignee_name = $open_name, \
                 assignee_user_id = $open_user_id, \
                 assignee_email = $open_email, \
                 assigned_date = $open_assigned_date, \
                 returned_date = NONE, notes = NONE"
                    .to_string(),
            );
        }
        // BEGIN and COMMIT each produce a result, so the row read back
        // inside the transaction sits at its own statement index.
        let written_index = statements.len();
        statements.push(
            "SELECT meta::id(id) AS record_id, * FROM type::record('asset', $id)".to_string(),
        );
        statements.push("COMMIT TRANSACTION".to_string());
        let query = statements.join(";\n") + ";";

        let current = asset.current.as_ref();
        let previous = asset.previous.as_ref();
        let mut builder = self
            .db
            .query(&query)
            .bind(("id", asset.id.to_string()))
            .bind(("expected_version", transition.expected_version))
            .bind(("category", category_to_string(&asset.category).to_string()))
            .bind(("charger_number", asset.charger_number.clone()))
            .bind(("mac_id", asset.mac_id.clone()))
            .bind(("external_mouse", asset.external_mouse.clone()))
            .bind(("headphones", asset.headphones.clone()))
            .bind(("mouse_pad", asset.mouse_pad.clone()))
            .bind(("procurement_date", asset.procurement_date))
            .bind(("warranty_expiry", asset.warranty_expiry))
            .bind(("status", status_to_string(&asset.status).to_string()))
            .bind(("notes", asset.notes.clone()))
            .bind(("current_name", current.map(|c| c.assignee.name.clone())))
            .bind(("current_user_id", current.map(|c| c.assignee.user_id.clone())))
            .bind(("current_email", current.map(|c| c.assignee.email.clone())))
            .bind(("assigned_date", current.map(|c| c.assigned_date)))
            .bind(("previous_name", previous.map(|p| p.name.clone())))
            .bind(("previous_user_id", previous.map(|p| p.user_id.clone())))
            .bind(("previous_date", previous.map(|p| p.date)))
            .bind(("assignment_count", asset.assignment_count));
        if let Some(close) = &transition.close {
            builder = builder
                .bind(("close_id", close.entry_id.to_string()))
                .bind(("returned_date", close.returned_date))
                .bind(("close_notes", close.notes.clone()));
        }
        if let Some(open) = &transition.open {
            builder = builder
                .bind(("open_id", open.id.to_string()))
                .bind(("sequence", open.sequence))
                .bind(("open_name", open.assignee.name.clone()))
                .bind(("open_user_id", open.assignee.user_id.clone()))
                .bind(("open_email", open.assignee.email.clone()))
                .bind(("open_assigned_date", open.assigned_date));
        }

        let response = builder.await.map_err(DbError::from)?;
        let mut result = match DbError::check_transaction("asset", asset.id, response) {
            Ok(result) => result,
            Err(err @ DbError::Inconsistent { .. }) => {
                error!(
                    asset_id = %asset.id,
                    serial_number = %asset.serial_number,
                    error = %err,
                    "Asset transition contradicts stored history"
                );
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        let rows: Vec<AssetRow> = result.take(written_index).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("asset", asset.id))?;
        Ok(row.try_into_asset()?)
    }

    async fn history(&self, id: Uuid) -> PortalResult<Vec<AssetHistory>> {
        self.get_by_id(id).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM asset_history \
                 WHERE asset_id = $asset_id \
                 ORDER BY sequence ASC",
            )
            .bind(("asset_id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HistoryRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_history())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
