use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use portal_core::access::{Action, require};
use portal_core::error::{PortalError, PortalResult};
use portal_core::models::job::{CreateJobPosting, JobPosting, JobStatus, UpdateJobPosting};
use portal_core::repository::{JobRepository, ReferralRepository};
use portal_files::FileCategory;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody};
use crate::routes::files::store_upload;
use crate::routes::{PageQuery, PageResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub title: String,
    pub department: String,
    pub experience_range: Option<String>,
    pub required_skills: Vec<String>,
    pub status: JobStatus,
    pub employment_type: Option<String>,
    pub is_budgeted: bool,
    pub description_text: Option<String>,
    pub description_locator: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub referral_count: u64,
}

impl JobResponse {
    fn new(job: JobPosting, referral_count: u64) -> Self {
        Self {
            id: job.id,
            title: job.title,
            department: job.department,
            experience_range: job.experience_range,
            required_skills: job.required_skills,
            status: job.status,
            employment_type: job.employment_type,
            is_budgeted: job.is_budgeted,
            description_text: job.description_text,
            description_locator: job.description_locator,
            created_by: job.created_by,
            created_at: job.created_at,
            updated_at: job.updated_at,
            referral_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub department: String,
    pub experience_range: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub status: JobStatus,
    pub employment_type: Option<String>,
    #[serde(default)]
    pub is_budgeted: bool,
    pub description_text: Option<String>,
}

impl CreateJobRequest {
    fn validate(&self) -> PortalResult<()> {
        not_blank("title", &self.title)?;
        not_blank("department", &self.department)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub department: Option<String>,
    pub experience_range: Option<String>,
    pub required_skills: Option<Vec<String>>,
    pub status: Option<JobStatus>,
    pub employment_type: Option<String>,
    pub is_budgeted: Option<bool>,
    pub description_text: Option<String>,
}

impl UpdateJobRequest {
    fn validate(&self) -> PortalResult<()> {
        if let Some(title) = &self.title {
            not_blank("title", title)?;
        }
        if let Some(department) = &self.department {
            not_blank("department", department)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct JobQuery {
    pub status: Option<JobStatus>,
}

fn not_blank(field: &str, value: &str) -> PortalResult<()> {
    if value.trim().is_empty() {
        return Err(PortalError::validation(format!("{field} must not be blank")));
    }
    Ok(())
}

fn clean_skills(skills: Vec<String>) -> Vec<String> {
    skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_jobs).post(create_job))
        .route("/{id}", get(get_job).patch(update_job).delete(delete_job))
        .route("/{id}/description", post(upload_description))
}

async fn view(state: &AppState, job: JobPosting) -> PortalResult<JobResponse> {
    let count = state.referrals.count_by_job(job.id).await?;
    Ok(JobResponse::new(job, count))
}

async fn list_jobs(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(filter): Query<JobQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<JobResponse>>> {
    require(&caller, Action::ViewJobs)?;
    let jobs = state.jobs.list(filter.status, page.pagination()).await?;

    let mut items = Vec::with_capacity(jobs.items.len());
    for job in jobs.items {
        items.push(view(&state, job).await?);
    }
    Ok(Json(PageResponse {
        items,
        total: jobs.total,
        offset: jobs.offset,
        limit: jobs.limit,
    }))
}

async fn create_job(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    JsonBody(body): JsonBody<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<JobResponse>)> {
    require(&caller, Action::ManageJobs)?;
    body.validate()?;

    let job = state
        .jobs
        .create(CreateJobPosting {
            title: body.title.trim().to_string(),
            department: body.department.trim().to_string(),
            experience_range: body.experience_range,
            required_skills: clean_skills(body.required_skills),
            status: body.status,
            employment_type: body.employment_type,
            is_budgeted: body.is_budgeted,
            description_text: body.description_text,
            created_by: caller.id,
        })
        .await?;
    info!(job_id = %job.id, created_by = %caller.id, "Job posting created");
    Ok((StatusCode::CREATED, Json(JobResponse::new(job, 0))))
}

async fn get_job(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobResponse>> {
    require(&caller, Action::ViewJobs)?;
    let job = state.jobs.get_by_id(id).await?;
    Ok(Json(view(&state, job).await?))
}

async fn update_job(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateJobRequest>,
) -> ApiResult<Json<JobResponse>> {
    require(&caller, Action::ManageJobs)?;
    body.validate()?;

    let job = state
        .jobs
        .update(
            id,
            UpdateJobPosting {
                title: body.title.map(|t| t.trim().to_string()),
                department: body.department.map(|d| d.trim().to_string()),
                experience_range: body.experience_range,
                required_skills: body.required_skills.map(clean_skills),
                status: body.status,
                employment_type: body.employment_type,
                is_budgeted: body.is_budgeted,
                description_text: body.description_text,
                description_locator: None,
            },
        )
        .await?;
    info!(job_id = %job.id, updated_by = %caller.id, "Job posting updated");
    Ok(Json(view(&state, job).await?))
}

async fn delete_job(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require(&caller, Action::ManageJobs)?;
    state.jobs.delete(id).await?;
    info!(job_id = %id, deleted_by = %caller.id, "Job posting deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_description(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<JobResponse>> {
    require(&caller, Action::ManageJobs)?;
    state.jobs.get_by_id(id).await?;

    let locator = store_upload(&state.files, FileCategory::JobDescription, multipart).await?;
    let job = state
        .jobs
        .update(
            id,
            UpdateJobPosting {
                description_locator: Some(locator),
                ..Default::default()
            },
        )
        .await?;
    info!(job_id = %job.id, "Job description uploaded");
    Ok(Json(view(&state, job).await?))
}
