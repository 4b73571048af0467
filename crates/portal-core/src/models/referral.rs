//! Referral domain model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    #[default]
    Submitted,
    Reviewed,
    Interviewing,
    Hired,
    Rejected,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Submitted => "submitted",
            ReferralStatus::Reviewed => "reviewed",
            ReferralStatus::Interviewing => "interviewing",
            ReferralStatus::Hired => "hired",
            ReferralStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referral {
    pub id: Uuid,
    pub job_id: Uuid,
    pub referred_by: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub candidate_phone: Option<String>,
    pub department: Option<String>,
    pub experience: Option<String>,
    pub skills: Vec<String>,
    pub about_candidate: Option<String>,
    pub notes: Option<String>,
    pub status: ReferralStatus,
    pub resume_locator: Option<String>,
    pub photo_locator: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReferral {
    pub job_id: Uuid,
    pub referred_by: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub candidate_phone: Option<String>,
    pub department: Option<String>,
    pub experience: Option<String>,
    pub skills: Vec<String>,
    pub about_candidate: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateReferral {
    pub status: Option<ReferralStatus>,
    pub notes: Option<String>,
    pub resume_locator: Option<String>,
    pub photo_locator: Option<String>,
}

/// Optional constraints for referral listings. `None` fields match anything.
#[derive(Debug, Clone, Default)]
pub struct ReferralFilter {
    pub job_id: Option<Uuid>,
    pub referred_by: Option<Uuid>,
    pub status: Option<ReferralStatus>,
}
