//! SurrealDB implementation of [`ReferralRepository`].

use chrono::{DateTime, Utc};
use portal_core::error::PortalResult;
use portal_core::models::referral::{
    CreateReferral, Referral, ReferralFilter, ReferralStatus, UpdateReferral,
};
use portal_core::repository::{PaginatedResult, Pagination, ReferralRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid, where_clause};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ReferralRow {
    record_id: String,
    job_id: String,
    referred_by: String,
    candidate_name: String,
    candidate_email: String,
    candidate_phone: Option<String>,
    department: Option<String>,
    experience: Option<String>,
    skills: Vec<String>,
    about_candidate: Option<String>,
    notes: Option<String>,
    status: String,
    resume_locator: Option<String>,
    photo_locator: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<ReferralStatus, DbError> {
    match s {
        "Submitted" => Ok(ReferralStatus::Submitted),
        "Reviewed" => Ok(ReferralStatus::Reviewed),
        "Interviewing" => Ok(ReferralStatus::Interviewing),
        "Hired" => Ok(ReferralStatus::Hired),
        "Rejected" => Ok(ReferralStatus::Rejected),
        other => Err(DbError::corrupt(
            "referral",
            format!("unknown referral status: {other}"),
        )),
    }
}

fn status_to_string(s: &ReferralStatus) -> &'static str {
    match s {
        ReferralStatus::Submitted => "Submitted",
        ReferralStatus::Reviewed => "Reviewed",
        ReferralStatus::Interviewing => "Interviewing",
        ReferralStatus::Hired => "Hired",
        ReferralStatus::Rejected => "Rejected",
    }
}

impl ReferralRow {
    fn try_into_referral(self) -> Result<Referral, DbError> {
        Ok(Referral {
            id: parse_uuid("referral", "record", &self.record_id)?,
            job_id: parse_uuid("referral", "job", &self.job_id)?,
            referred_by: parse_uuid("referral", "referrer", &self.referred_by)?,
            candidate_name: self.candidate_name,
            candidate_email: self.candidate_email,
            candidate_phone: self.candidate_phone,
            department: self.department,
            experience: self.experience,
            skills: self.skills,
            about_candidate: self.about_candidate,
            notes: self.notes,
            status: parse_status(&self.status)?,
            resume_locator: self.resume_locator,
            photo_locator: self.photo_locator,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Referral repository.
#[derive(Clone)]
pub struct SurrealReferralRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealReferralRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ReferralRepository for SurrealReferralRepository<C> {
    async fn create(&self, input: CreateReferral) -> PortalResult<Referral> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('referral', $id) SET \
                 job_id = $job_id, referred_by = $referred_by, \
                 candidate_name = $candidate_name, \
                 candidate_email = $candidate_email, \
                 candidate_phone = $candidate_phone, \
                 department = $department, experience = $experience, \
                 skills = $skills, about_candidate = $about_candidate, \
                 notes = NONE, status = 'Submitted', \
                 resume_locator = NONE, photo_locator = NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("job_id", input.job_id.to_string()))
            .bind(("referred_by", input.referred_by.to_string()))
            .bind(("candidate_name", input.candidate_name))
            .bind(("candidate_email", input.candidate_email))
            .bind(("candidate_phone", input.candidate_phone))
            .bind(("department", input.department))
            .bind(("experience", input.experience))
            .bind(("skills", input.skills))
            .bind(("about_candidate", input.about_candidate))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_write("referral", e))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> PortalResult<Referral> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('referral', $id)",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReferralRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("referral", id))?;

        Ok(row.try_into_referral()?)
    }

    async fn update(&self, id: Uuid, input: UpdateReferral) -> PortalResult<Referral> {
        self.get_by_id(id).await?;

        let mut sets = Vec::new();
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.notes.is_some() {
            sets.push("notes = $notes");
        }
        if input.resume_locator.is_some() {
            sets.push("resume_locator = $resume_locator");
        }
        if input.photo_locator.is_some() {
            sets.push("photo_locator = $photo_locator");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('referral', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(ref status) = input.status {
            builder = builder.bind(("status", status_to_string(status).to_string()));
        }
        if let Some(notes) = input.notes {
            builder = builder.bind(("notes", notes));
        }
        if let Some(resume_locator) = input.resume_locator {
            builder = builder.bind(("resume_locator", resume_locator));
        }
        if let Some(photo_locator) = input.photo_locator {
            builder = builder.bind(("photo_locator", photo_locator));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_write("referral", e))?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> PortalResult<()> {
        self.get_by_id(id).await?;

        self.db
            .query("DELETE type::record('referral', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(
        &self,
        filter: ReferralFilter,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<Referral>> {
        let mut conditions = Vec::new();
        if filter.job_id.is_some() {
            conditions.push("job_id = $job_id");
        }
        if filter.referred_by.is_some() {
            conditions.push("referred_by = $referred_by");
        }
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        let filter_sql = where_clause(&conditions);

        let job_id = filter.job_id.map(|id| id.to_string());
        let referred_by = filter.referred_by.map(|id| id.to_string());
        let status = filter.status.map(|s| status_to_string(&s).to_string());

        let count_query = format!("SELECT count() AS total FROM referral{filter_sql} GROUP ALL");
        let mut count_result = self
            .db
            .query(&count_query)
            .bind(("job_id", job_id.clone()))
            .bind(("referred_by", referred_by.clone()))
            .bind(("status", status.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM referral{filter_sql} \
             ORDER BY created_at DESC \
             LIMIT $limit START $offset"
        );
        let mut result = self
            .db
            .query(&query)
            .bind(("job_id", job_id))
            .bind(("referred_by", referred_by))
            .bind(("status", status))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReferralRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_referral())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn count_by_job(&self, job_id: Uuid) -> PortalResult<u64> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM referral WHERE job_id = $job_id GROUP ALL")
            .bind(("job_id", job_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
