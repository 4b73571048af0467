//! Asset catalogue and lifecycle endpoints. Every status change goes
//! through [`AssetLifecycle`](portal_core::lifecycle::AssetLifecycle).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use portal_core::access::{Action, require};
use portal_core::error::{PortalError, PortalResult};
use portal_core::lifecycle::StatusChange;
use portal_core::models::asset::{
    Asset, AssetCategory, AssetFilter, AssetHistory, AssetStatus, Assignee, CreateAsset,
    UpdateAsset,
};
use portal_core::models::user::User;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody};
use crate::routes::{PageQuery, PageResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AssetResponse {
    pub id: Uuid,
    pub serial_number: String,
    pub category: AssetCategory,
    pub charger_number: Option<String>,
    pub mac_id: Option<String>,
    pub external_mouse: Option<String>,
    pub headphones: Option<String>,
    pub mouse_pad: Option<String>,
    pub status: AssetStatus,
    pub current_assignee_name: Option<String>,
    pub current_assignee_user_id: Option<String>,
    pub current_assignee_email: Option<String>,
    pub assigned_date: Option<DateTime<Utc>>,
    pub previous_assignee_name: Option<String>,
    pub previous_assignee_user_id: Option<String>,
    pub previous_assignee_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub procurement_date: Option<DateTime<Utc>>,
    pub warranty_expiry: Option<DateTime<Utc>>,
    pub assignment_count: u32,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Asset> for AssetResponse {
    fn from(asset: Asset) -> Self {
        let (current, assigned_date) = match asset.current {
            Some(c) => (Some(c.assignee), Some(c.assigned_date)),
            None => (None, None),
        };
        let (current_name, current_user_id, current_email) = match current {
            Some(a) => (Some(a.name), Some(a.user_id), Some(a.email)),
            None => (None, None, None),
        };
        let (previous_name, previous_user_id, previous_date) = match asset.previous {
            Some(p) => (Some(p.name), Some(p.user_id), Some(p.date)),
            None => (None, None, None),
        };
        Self {
            id: asset.id,
            serial_number: asset.serial_number,
            category: asset.category,
            charger_number: asset.charger_number,
            mac_id: asset.mac_id,
            external_mouse: asset.external_mouse,
            headphones: asset.headphones,
            mouse_pad: asset.mouse_pad,
            status: asset.status,
            current_assignee_name: current_name,
            current_assignee_user_id: current_user_id,
            current_assignee_email: current_email,
            assigned_date,
            previous_assignee_name: previous_name,
            previous_assignee_user_id: previous_user_id,
            previous_assignee_date: previous_date,
            notes: asset.notes,
            procurement_date: asset.procurement_date,
            warranty_expiry: asset.warranty_expiry,
            assignment_count: asset.assignment_count,
            version: asset.version,
            created_at: asset.created_at,
            updated_at: asset.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub sequence: u32,
    pub assignee_name: String,
    pub assignee_user_id: String,
    pub assignee_email: String,
    pub assigned_date: DateTime<Utc>,
    pub returned_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AssetHistory> for HistoryResponse {
    fn from(entry: AssetHistory) -> Self {
        Self {
            id: entry.id,
            asset_id: entry.asset_id,
            sequence: entry.sequence,
            assignee_name: entry.assignee.name,
            assignee_user_id: entry.assignee.user_id,
            assignee_email: entry.assignee.email,
            assigned_date: entry.assigned_date,
            returned_date: entry.returned_date,
            notes: entry.notes,
            created_at: entry.created_at,
        }
    }
}

/// New assets start `available`; status and assignee cannot be supplied.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAssetRequest {
    pub serial_number: String,
    #[serde(default)]
    pub category: AssetCategory,
    pub charger_number: Option<String>,
    pub mac_id: Option<String>,
    pub external_mouse: Option<String>,
    pub headphones: Option<String>,
    pub mouse_pad: Option<String>,
    pub notes: Option<String>,
    pub procurement_date: Option<DateTime<Utc>>,
    pub warranty_expiry: Option<DateTime<Utc>>,
}

impl From<CreateAssetRequest> for CreateAsset {
    fn from(body: CreateAssetRequest) -> Self {
        CreateAsset {
            serial_number: body.serial_number.trim().to_string(),
            category: body.category,
            charger_number: body.charger_number,
            mac_id: body.mac_id.map(|m| m.trim().to_string()),
            external_mouse: body.external_mouse,
            headphones: body.headphones,
            mouse_pad: body.mouse_pad,
            notes: body.notes,
            procurement_date: body.procurement_date,
            warranty_expiry: body.warranty_expiry,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub name: String,
    pub user_id: String,
    pub email: String,
    /// Defaults to now.
    pub assigned_date: Option<DateTime<Utc>>,
}

impl AssignRequest {
    fn assignee(&self) -> Assignee {
        Assignee::new(
            self.name.trim(),
            self.user_id.trim(),
            self.email.trim().to_lowercase(),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReleaseRequest {
    /// Defaults to now.
    pub returned_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RetireRequest {
    pub notes: Option<String>,
}

/// Descriptive changes plus an optional status change. The status change
/// is carried out by the matching lifecycle operation:
/// `assigned` needs `assignee`, `available` releases, `retired` retires.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAssetRequest {
    pub category: Option<AssetCategory>,
    pub charger_number: Option<String>,
    pub mac_id: Option<String>,
    pub external_mouse: Option<String>,
    pub headphones: Option<String>,
    pub mouse_pad: Option<String>,
    pub notes: Option<String>,
    pub procurement_date: Option<DateTime<Utc>>,
    pub warranty_expiry: Option<DateTime<Utc>>,

    pub status: Option<AssetStatus>,
    pub assignee: Option<AssigneeBody>,
    pub assigned_date: Option<DateTime<Utc>>,
    pub returned_date: Option<DateTime<Utc>>,
    /// Notes recorded with the status change.
    pub status_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssigneeBody {
    pub name: String,
    pub user_id: String,
    pub email: String,
}

impl UpdateAssetRequest {
    fn details(&self) -> UpdateAsset {
        UpdateAsset {
            category: self.category,
            charger_number: self.charger_number.clone(),
            mac_id: self.mac_id.as_ref().map(|m| m.trim().to_string()),
            external_mouse: self.external_mouse.clone(),
            headphones: self.headphones.clone(),
            mouse_pad: self.mouse_pad.clone(),
            notes: self.notes.clone(),
            procurement_date: self.procurement_date,
            warranty_expiry: self.warranty_expiry,
        }
    }

    fn status_change(&self, now: DateTime<Utc>) -> PortalResult<Option<StatusChange>> {
        let Some(status) = self.status else {
            if self.assignee.is_some() {
                return Err(PortalError::validation(
                    "assignee given without status \"assigned\"",
                ));
            }
            return Ok(None);
        };
        let change = match status {
            AssetStatus::Assigned => {
                let body = self.assignee.as_ref().ok_or_else(|| {
                    PortalError::validation("status \"assigned\" requires an assignee")
                })?;
                let assignee = Assignee::new(
                    body.name.trim(),
                    body.user_id.trim(),
                    body.email.trim().to_lowercase(),
                );
                assignee.validate()?;
                StatusChange::Assign(assignee, self.assigned_date.unwrap_or(now))
            }
            AssetStatus::Available => StatusChange::Release(
                self.returned_date.unwrap_or(now),
                self.status_notes.clone(),
            ),
            AssetStatus::Retired => StatusChange::Retire(self.status_notes.clone()),
        };
        Ok(Some(change))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AssetQuery {
    pub status: Option<AssetStatus>,
    pub category: Option<AssetCategory>,
    pub assignee_user_id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assets).post(create_asset))
        .route("/{id}", get(get_asset).patch(update_asset))
        .route("/{id}/assign", post(assign_asset))
        .route("/{id}/release", post(release_asset))
        .route("/{id}/retire", post(retire_asset))
        .route("/{id}/history", get(asset_history))
}

async fn list_assets(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<AssetQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<AssetResponse>>> {
    require(&caller, Action::ViewAssets)?;
    let filter = AssetFilter {
        status: query.status,
        category: query.category,
        assignee_user_id: query.assignee_user_id,
    };
    let assets = state.assets.list(filter, page.pagination()).await?;
    Ok(Json(assets.map(AssetResponse::from).into()))
}

async fn create_asset(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    JsonBody(body): JsonBody<CreateAssetRequest>,
) -> ApiResult<(StatusCode, Json<AssetResponse>)> {
    require(&caller, Action::ManageAssets)?;
    let asset = state.assets.create(body.into()).await?;
    Ok((StatusCode::CREATED, Json(asset.into())))
}

async fn get_asset(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AssetResponse>> {
    require(&caller, Action::ViewAssets)?;
    Ok(Json(state.assets.get(id).await?.into()))
}

/// A status change and the descriptive edits that come with it are
/// written together; a rejected request changes nothing.
async fn update_asset(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateAssetRequest>,
) -> ApiResult<Json<AssetResponse>> {
    require(&caller, Action::ManageAssets)?;
    let details = body.details();
    let asset = match body.status_change(Utc::now())? {
        Some(change) => apply_status_change(&state, &caller, id, change, details).await?,
        None => {
            let asset = state.assets.update_details(id, details).await?;
            info!(asset_id = %id, updated_by = %caller.id, "Asset details updated");
            asset
        }
    };
    Ok(Json(asset.into()))
}

async fn apply_status_change(
    state: &AppState,
    caller: &User,
    id: Uuid,
    change: StatusChange,
    details: UpdateAsset,
) -> PortalResult<Asset> {
    info!(asset_id = %id, requested_by = %caller.id, change = ?change, "Asset status change requested");
    state.assets.change(id, change, details).await
}

async fn assign_asset(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<AssignRequest>,
) -> ApiResult<Json<AssetResponse>> {
    require(&caller, Action::ManageAssets)?;
    let date = body.assigned_date.unwrap_or_else(Utc::now);
    let change = StatusChange::Assign(body.assignee(), date);
    let asset = apply_status_change(&state, &caller, id, change, UpdateAsset::default()).await?;
    Ok(Json(asset.into()))
}

async fn release_asset(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<ReleaseRequest>,
) -> ApiResult<Json<AssetResponse>> {
    require(&caller, Action::ManageAssets)?;
    let date = body.returned_date.unwrap_or_else(Utc::now);
    let change = StatusChange::Release(date, body.notes);
    let asset = apply_status_change(&state, &caller, id, change, UpdateAsset::default()).await?;
    Ok(Json(asset.into()))
}

async fn retire_asset(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<RetireRequest>,
) -> ApiResult<Json<AssetResponse>> {
    require(&caller, Action::ManageAssets)?;
    let change = StatusChange::Retire(body.notes);
    let asset = apply_status_change(&state, &caller, id, change, UpdateAsset::default()).await?;
    Ok(Json(asset.into()))
}

async fn asset_history(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<HistoryResponse>>> {
    require(&caller, Action::ViewAssets)?;
    let history = state.assets.history(id).await?;
    Ok(Json(history.into_iter().map(HistoryResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn no_status_means_no_change() {
        let body = UpdateAssetRequest {
            notes: Some("dent on lid".into()),
            ..Default::default()
        };
        assert_eq!(body.status_change(now()).unwrap(), None);
        assert!(!body.details().is_empty());
    }

    #[test]
    fn assigned_requires_assignee() {
        let body = UpdateAssetRequest {
            status: Some(AssetStatus::Assigned),
            ..Default::default()
        };
        assert!(matches!(
            body.status_change(now()),
            Err(PortalError::Validation { .. })
        ));
    }

    #[test]
    fn assignee_without_status_rejected() {
        let body: UpdateAssetRequest = serde_json::from_str(
            r#"{"assignee":{"name":"Jane","user_id":"42","email":"jane@company.com"}}"#,
        )
        .unwrap();
        assert!(body.status_change(now()).is_err());
    }

    #[test]
    fn assigned_maps_to_assign_with_default_date() {
        let body: UpdateAssetRequest = serde_json::from_str(
            r#"{"status":"assigned","assignee":{"name":" Jane ","user_id":"42","email":"Jane@Company.com"}}"#,
        )
        .unwrap();
        assert_eq!(
            body.status_change(now()).unwrap(),
            Some(StatusChange::Assign(
                Assignee::new("Jane", "42", "jane@company.com"),
                now()
            ))
        );
    }

    #[test]
    fn available_and_retired_map_to_release_and_retire() {
        let release: UpdateAssetRequest =
            serde_json::from_str(r#"{"status":"available","status_notes":"returned"}"#).unwrap();
        assert_eq!(
            release.status_change(now()).unwrap(),
            Some(StatusChange::Release(now(), Some("returned".into())))
        );

        let retire: UpdateAssetRequest = serde_json::from_str(r#"{"status":"retired"}"#).unwrap();
        assert_eq!(
            retire.status_change(now()).unwrap(),
            Some(StatusChange::Retire(None))
        );
    }

    #[test]
    fn create_rejects_status_field() {
        let err = serde_json::from_str::<CreateAssetRequest>(
            r#"{"serial_number":"LPT-1","status":"assigned"}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn response_flattens_assignment_slots() {
        let asset = Asset {
            id: Uuid::new_v4(),
            serial_number: "LPT-2024-099".into(),
            category: AssetCategory::Laptop,
            charger_number: None,
            mac_id: None,
            external_mouse: None,
            headphones: None,
            mouse_pad: None,
            status: AssetStatus::Assigned,
            current: Some(portal_core::models::asset::CurrentAssignment {
                assignee: Assignee::new("Jane", "42", "jane@company.com"),
                assigned_date: now(),
            }),
            previous: None,
            notes: None,
            procurement_date: None,
            warranty_expiry: None,
            assignment_count: 1,
            version: 1,
            created_at: now(),
            updated_at: now(),
        };
        let response = AssetResponse::from(asset);
        assert_eq!(response.current_assignee_name.as_deref(), Some("Jane"));
        assert_eq!(response.current_assignee_user_id.as_deref(), Some("42"));
        assert_eq!(response.assigned_date, Some(now()));
        assert_eq!(response.previous_assignee_name, None);
    }
}
