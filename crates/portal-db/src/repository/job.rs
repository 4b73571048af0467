//! SurrealDB implementation of [`JobRepository`].

use chrono::{DateTime, Utc};
use portal_core::error::{PortalError, PortalResult};
use portal_core::models::job::{CreateJobPosting, JobPosting, JobStatus, UpdateJobPosting};
use portal_core::repository::{JobRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid, where_clause};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct JobRow {
    record_id: String,
    title: String,
    department: String,
    experience_range: Option<String>,
    required_skills: Vec<String>,
    status: String,
    employment_type: Option<String>,
    is_budgeted: bool,
    description_text: Option<String>,
    description_locator: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<JobStatus, DbError> {
    match s {
        "Open" => Ok(JobStatus::Open),
        "Closed" => Ok(JobStatus::Closed),
        "OnHold" => Ok(JobStatus::OnHold),
        other => Err(DbError::corrupt(
            "job_posting",
            format!("unknown job status: {other}"),
        )),
    }
}

fn status_to_string(s: &JobStatus) -> &'static str {
    match s {
        JobStatus::Open => "Open",
        JobStatus::Closed => "Closed",
        JobStatus::OnHold => "OnHold",
    }
}

impl JobRow {
    fn try_into_job(self) -> Result<JobPosting, DbError> {
        Ok(JobPosting {
            id: parse_uuid("job_posting", "record", &self.record_id)?,
            title: self.title,
            department: self.department,
            experience_range: self.experience_range,
            required_skills: self.required_skills,
            status: parse_status(&self.status)?,
            employment_type: self.employment_type,
            is_budgeted: self.is_budgeted,
            description_text: self.description_text,
            description_locator: self.description_locator,
            created_by: parse_uuid("job_posting", "creator", &self.created_by)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the JobPosting repository.
#[derive(Clone)]
pub struct SurrealJobRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealJobRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> JobRepository for SurrealJobRepository<C> {
    async fn create(&self, input: CreateJobPosting) -> PortalResult<JobPosting> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('job_posting', $id) SET \
                 title = $title, department = $department, \
                 experience_range = $experience_range, \
                 required_skills = $required_skills, status = $status, \
                 employment_type = $employment_type, \
                 is_budgeted = $is_budgeted, \
                 description_text = $description_text, \
                 description_locator = NONE, created_by = $created_by",
            )
            .bind(("id", id.to_string()))
            .bind(("title", input.title))
            .bind(("department", input.department))
            .bind(("experience_range", input.experience_range))
            .bind(("required_skills", input.required_skills))
            .bind(("status", status_to_string(&input.status).to_string()))
            .bind(("employment_type", input.employment_type))
            .bind(("is_budgeted", input.is_budgeted))
            .bind(("description_text", input.description_text))
            .bind(("created_by", input.created_by.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_write("job_posting", e))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> PortalResult<JobPosting> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('job_posting', $id)",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<JobRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("job_posting", id))?;

        Ok(row.try_into_job()?)
    }

    async fn update(&self, id: Uuid, input: UpdateJobPosting) -> PortalResult<JobPosting> {
        self.get_by_id(id).await?;

        let mut sets = Vec::new();
        if input.title.is_some() {
            sets.push("title = $title");
        }
        if input.department.is_some() {
            sets.push("department = $department");
        }
        if input.experience_range.is_some() {
            sets.push("experience_range = $experience_range");
        }
        if input.required_skills.is_some() {
            sets.push("required_skills = $required_skills");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.employment_type.is_some() {
            sets.push("employment_type = $employment_type");
        }
        if input.is_budgeted.is_some() {
            sets.push("is_budgeted = $is_budgeted");
        }
        if input.description_text.is_some() {
            sets.push("description_text = $description_text");
        }
        if input.description_locator.is_some() {
            sets.push("description_locator = $description_locator");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('job_posting', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(title) = input.title {
            builder = builder.bind(("title", title));
        }
        if let Some(department) = input.department {
            builder = builder.bind(("department", department));
        }
        if let Some(experience_range) = input.experience_range {
            builder = builder.bind(("experience_range", experience_range));
        }
        if let Some(required_skills) = input.required_skills {
            builder = builder.bind(("required_skills", required_skills));
        }
        if let Some(ref status) = input.status {
            builder = builder.bind(("status", status_to_string(status).to_string()));
        }
        if let Some(employment_type) = input.employment_type {
            builder = builder.bind(("employment_type", employment_type));
        }
        if let Some(is_budgeted) = input.is_budgeted {
            builder = builder.bind(("is_budgeted", is_budgeted));
        }
        if let Some(description_text) = input.description_text {
            builder = builder.bind(("description_text", description_text));
        }
        if let Some(description_locator) = input.description_locator {
            builder = builder.bind(("description_locator", description_locator));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_write("job_posting", e))?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> PortalResult<()> {
        self.get_by_id(id).await?;

        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM referral WHERE job_id = $id GROUP ALL")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let referrals = count_rows.first().map(|r| r.total).unwrap_or(0);
        if referrals > 0 {
            return Err(PortalError::conflict(format!(
                "job posting {id} still has {referrals} referral(s)"
            )));
        }

        self.db
            .query("DELETE type::record('job_posting', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(
        &self,
        status: Option<JobStatus>,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<JobPosting>> {
        let filter = match status {
            Some(_) => where_clause(&["status = $status"]),
            None => String::new(),
        };
        let status = status.map(|s| status_to_string(&s).to_string());

        let count_query = format!("SELECT count() AS total FROM job_posting{filter} GROUP ALL");
        let mut count_result = self
            .db
            .query(&count_query)
            .bind(("status", status.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM job_posting{filter} \
             ORDER BY created_at DESC \
             LIMIT $limit START $offset"
        );
        let mut result = self
            .db
            .query(&query)
            .bind(("status", status))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<JobRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_job())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
