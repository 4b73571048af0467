//! IT asset and assignment history domain models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PortalError, PortalResult};
use crate::models::validate_email;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    #[default]
    Available,
    Assigned,
    /// Terminal.
    Retired,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Available => "available",
            AssetStatus::Assigned => "assigned",
            AssetStatus::Retired => "retired",
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    #[default]
    Laptop,
    Monitor,
    Desktop,
    Phone,
    Tablet,
    Peripheral,
    Other,
}

impl AssetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Laptop => "laptop",
            AssetCategory::Monitor => "monitor",
            AssetCategory::Desktop => "desktop",
            AssetCategory::Phone => "phone",
            AssetCategory::Tablet => "tablet",
            AssetCategory::Peripheral => "peripheral",
            AssetCategory::Other => "other",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The person an asset is handed to. `user_id` is an external identifier
/// (for example an HR system id), not a portal user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignee {
    pub name: String,
    pub user_id: String,
    pub email: String,
}

impl Assignee {
    pub fn new(
        name: impl Into<String>,
        user_id: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            user_id: user_id.into(),
            email: email.into(),
        }
    }

    pub fn validate(&self) -> PortalResult<()> {
        if self.name.trim().is_empty() {
            return Err(PortalError::validation("assignee name must not be blank"));
        }
        if self.user_id.trim().is_empty() {
            return Err(PortalError::validation("assignee user id must not be blank"));
        }
        validate_email(&self.email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentAssignment {
    pub assignee: Assignee,
    pub assigned_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreviousAssignment {
    pub name: String,
    pub user_id: String,
    /// When the previous assignment ended.
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    pub id: Uuid,
    pub serial_number: String,
    pub category: AssetCategory,
    pub charger_number: Option<String>,
    pub mac_id: Option<String>,
    pub external_mouse: Option<String>,
    pub headphones: Option<String>,
    pub mouse_pad: Option<String>,
    pub status: AssetStatus,
    pub current: Option<CurrentAssignment>,
    pub previous: Option<PreviousAssignment>,
    pub notes: Option<String>,
    pub procurement_date: Option<DateTime<Utc>>,
    pub warranty_expiry: Option<DateTime<Utc>>,
    /// Number of assignments ever opened; the next history entry gets
    /// `assignment_count + 1` as its sequence.
    pub assignment_count: u32,
    /// Optimistic-lock counter, bumped by every write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateAsset {
    pub serial_number: String,
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

impl CreateAsset {
    pub fn validate(&self) -> PortalResult<()> {
        if self.serial_number.trim().is_empty() {
            return Err(PortalError::validation("serial number must not be blank"));
        }
        check_warranty(self.procurement_date, self.warranty_expiry)
    }
}

/// Descriptive fields only. Status and assignment slots change exclusively
/// through the lifecycle operations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateAsset {
    pub category: Option<AssetCategory>,
    pub charger_number: Option<String>,
    pub mac_id: Option<String>,
    pub external_mouse: Option<String>,
    pub headphones: Option<String>,
    pub mouse_pad: Option<String>,
    pub notes: Option<String>,
    pub procurement_date: Option<DateTime<Utc>>,
    pub warranty_expiry: Option<DateTime<Utc>>,
}

impl UpdateAsset {
    /// Check this update against the asset's current values.
    ///
    /// Procurement and warranty dates may be filled in once; replacing a
    /// value that is already set is a conflict.
    pub fn validate_against(&self, asset: &Asset) -> PortalResult<()> {
        immutable_once_set(
            "procurement_date",
            asset.procurement_date,
            self.procurement_date,
        )?;
        immutable_once_set("warranty_expiry", asset.warranty_expiry, self.warranty_expiry)?;
        check_warranty(
            self.procurement_date.or(asset.procurement_date),
            self.warranty_expiry.or(asset.warranty_expiry),
        )
    }

    /// Copy every supplied field onto `asset`. Call
    /// [`validate_against`](Self::validate_against) first.
    pub fn apply_to(&self, asset: &mut Asset) {
        if let Some(category) = self.category {
            asset.category = category;
        }
        if let Some(charger_number) = &self.charger_number {
            asset.charger_number = Some(charger_number.clone());
        }
        if let Some(mac_id) = &self.mac_id {
            asset.mac_id = Some(mac_id.clone());
        }
        if let Some(external_mouse) = &self.external_mouse {
            asset.external_mouse = Some(external_mouse.clone());
        }
        if let Some(headphones) = &self.headphones {
            asset.headphones = Some(headphones.clone());
        }
        if let Some(mouse_pad) = &self.mouse_pad {
            asset.mouse_pad = Some(mouse_pad.clone());
        }
        if let Some(notes) = &self.notes {
            asset.notes = Some(notes.clone());
        }
        if self.procurement_date.is_some() {
            asset.procurement_date = self.procurement_date;
        }
        if self.warranty_expiry.is_some() {
            asset.warranty_expiry = self.warranty_expiry;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.charger_number.is_none()
            && self.mac_id.is_none()
            && self.external_mouse.is_none()
            && self.headphones.is_none()
            && self.mouse_pad.is_none()
            && self.notes.is_none()
            && self.procurement_date.is_none()
            && self.warranty_expiry.is_none()
    }
}

fn immutable_once_set(
    field: &str,
    current: Option<DateTime<Utc>>,
    requested: Option<DateTime<Utc>>,
) -> PortalResult<()> {
    match (current, requested) {
        (Some(existing), Some(new)) if existing != new => Err(PortalError::conflict(format!(
            "{field} is already set to {} and cannot be changed",
            existing.to_rfc3339()
        ))),
        _ => Ok(()),
    }
}

fn check_warranty(
    procurement: Option<DateTime<Utc>>,
    warranty: Option<DateTime<Utc>>,
) -> PortalResult<()> {
    match (procurement, warranty) {
        (Some(p), Some(w)) if w < p => Err(PortalError::validation(
            "warranty_expiry must not precede procurement_date",
        )),
        _ => Ok(()),
    }
}

/// Optional constraints for asset listings. `None` fields match anything.
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    pub status: Option<AssetStatus>,
    pub category: Option<AssetCategory>,
    /// External user id of the current assignee.
    pub assignee_user_id: Option<String>,
}

/// One assignment period of an asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetHistory {
    pub id: Uuid,
    pub asset_id: Uuid,
    /// 1-based position in the asset's history.
    pub sequence: u32,
    pub assignee: Assignee,
    pub assigned_date: DateTime<Utc>,
    /// `None` while the assignment is still active.
    pub returned_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AssetHistory {
    pub fn is_open(&self) -> bool {
        self.returned_date.is_none()
    }
}

/// An asset read with intent to update, together with its open history
/// entry (if any). `asset.version` guards the subsequent write.
#[derive(Debug, Clone)]
pub struct AssetSnapshot {
    pub asset: Asset,
    pub open_entry: Option<AssetHistory>,
}
