//! Job posting domain model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Open,
    Closed,
    OnHold,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Closed => "closed",
            JobStatus::OnHold => "on_hold",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub department: String,
    /// Free-form range such as "5-7" or "10+".
    pub experience_range: Option<String>,
    pub required_skills: Vec<String>,
    pub status: JobStatus,
    /// Employment type, e.g. "FTE" or "Flex".
    pub employment_type: Option<String>,
    pub is_budgeted: bool,
    pub description_text: Option<String>,
    /// File intake locator of an uploaded description document.
    pub description_locator: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobPosting {
    pub title: String,
    pub department: String,
    pub experience_range: Option<String>,
    pub required_skills: Vec<String>,
    pub status: JobStatus,
    pub employment_type: Option<String>,
    pub is_budgeted: bool,
    pub description_text: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateJobPosting {
    pub title: Option<String>,
    pub department: Option<String>,
    pub experience_range: Option<String>,
    pub required_skills: Option<Vec<String>>,
    pub status: Option<JobStatus>,
    pub employment_type: Option<String>,
    pub is_budgeted: Option<bool>,
    pub description_text: Option<String>,
    pub description_locator: Option<String>,
}
