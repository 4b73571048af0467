use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use portal_core::access::{Action, require};
use portal_core::error::{PortalError, PortalResult};
use portal_core::models::job::JobStatus;
use portal_core::models::referral::{
    CreateReferral, Referral, ReferralFilter, ReferralStatus, UpdateReferral,
};
use portal_core::models::user::User;
use portal_core::models::validate_email;
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
pub struct ReferralResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    /// `None` only if the job could not be loaded.
    pub job_title: Option<String>,
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

impl ReferralResponse {
    fn new(referral: Referral, job_title: Option<String>) -> Self {
        Self {
            id: referral.id,
            job_id: referral.job_id,
            job_title,
            referred_by: referral.referred_by,
            candidate_name: referral.candidate_name,
            candidate_email: referral.candidate_email,
            candidate_phone: referral.candidate_phone,
            department: referral.department,
            experience: referral.experience,
            skills: referral.skills,
            about_candidate: referral.about_candidate,
            notes: referral.notes,
            status: referral.status,
            resume_locator: referral.resume_locator,
            photo_locator: referral.photo_locator,
            created_at: referral.created_at,
            updated_at: referral.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateReferralRequest {
    pub job_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub candidate_phone: Option<String>,
    pub department: Option<String>,
    pub experience: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub about_candidate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateReferralRequest {
    pub status: Option<ReferralStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReferralQuery {
    pub job_id: Option<Uuid>,
    pub status: Option<ReferralStatus>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_referrals).post(create_referral))
        .route("/my-referrals", get(my_referrals))
        .route(
            "/{id}",
            get(get_referral)
                .patch(update_referral)
                .delete(delete_referral),
        )
        .route("/{id}/resume", post(upload_resume))
        .route("/{id}/photo", post(upload_photo))
}

async fn view(state: &AppState, referral: Referral) -> PortalResult<ReferralResponse> {
    let title = match state.jobs.get_by_id(referral.job_id).await {
        Ok(job) => Some(job.title),
        Err(PortalError::NotFound { .. }) => None,
        Err(e) => return Err(e),
    };
    Ok(ReferralResponse::new(referral, title))
}

async fn page_view(
    state: &AppState,
    filter: ReferralFilter,
    page: PageQuery,
) -> PortalResult<PageResponse<ReferralResponse>> {
    let referrals = state.referrals.list(filter, page.pagination()).await?;
    let mut items = Vec::with_capacity(referrals.items.len());
    for referral in referrals.items {
        items.push(view(state, referral).await?);
    }
    Ok(PageResponse {
        items,
        total: referrals.total,
        offset: referrals.offset,
        limit: referrals.limit,
    })
}

/// Owners may see and attach files to their own referrals; reviewers may
/// touch any.
fn require_owner_or_reviewer(caller: &User, referral: &Referral) -> PortalResult<()> {
    if referral.referred_by == caller.id {
        return require(caller, Action::SubmitReferral);
    }
    require(caller, Action::ReviewReferrals)
}

/// Reviewers list everything (optionally filtered); everyone else only
/// sees their own submissions.
async fn list_referrals(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<ReferralQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<ReferralResponse>>> {
    require(&caller, Action::SubmitReferral)?;
    let referred_by = (!caller.role.permits(Action::ReviewReferrals)).then_some(caller.id);
    let filter = ReferralFilter {
        job_id: query.job_id,
        referred_by,
        status: query.status,
    };
    Ok(Json(page_view(&state, filter, page).await?))
}

async fn my_referrals(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<ReferralResponse>>> {
    require(&caller, Action::SubmitReferral)?;
    let filter = ReferralFilter {
        referred_by: Some(caller.id),
        ..Default::default()
    };
    Ok(Json(page_view(&state, filter, page).await?))
}

async fn create_referral(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    JsonBody(body): JsonBody<CreateReferralRequest>,
) -> ApiResult<(StatusCode, Json<ReferralResponse>)> {
    require(&caller, Action::SubmitReferral)?;
    if body.candidate_name.trim().is_empty() {
        return Err(PortalError::validation("candidate name must not be blank").into());
    }
    let candidate_email = body.candidate_email.trim().to_lowercase();
    validate_email(&candidate_email)?;

    let job = state.jobs.get_by_id(body.job_id).await?;
    if job.status != JobStatus::Open {
        return Err(PortalError::conflict(format!(
            "job {} is {} and does not accept referrals",
            job.id, job.status
        ))
        .into());
    }

    let referral = state
        .referrals
        .create(CreateReferral {
            job_id: job.id,
            referred_by: caller.id,
            candidate_name: body.candidate_name.trim().to_string(),
            candidate_email,
            candidate_phone: body.candidate_phone,
            department: body.department,
            experience: body.experience,
            skills: body.skills,
            about_candidate: body.about_candidate,
        })
        .await?;
    info!(referral_id = %referral.id, job_id = %job.id, referred_by = %caller.id, "Referral submitted");
    Ok((
        StatusCode::CREATED,
        Json(ReferralResponse::new(referral, Some(job.title))),
    ))
}

async fn get_referral(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ReferralResponse>> {
    let referral = state.referrals.get_by_id(id).await?;
    require_owner_or_reviewer(&caller, &referral)?;
    Ok(Json(view(&state, referral).await?))
}

async fn update_referral(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateReferralRequest>,
) -> ApiResult<Json<ReferralResponse>> {
    require(&caller, Action::ReviewReferrals)?;
    let referral = state
        .referrals
        .update(
            id,
            UpdateReferral {
                status: body.status,
                notes: body.notes,
                ..Default::default()
            },
        )
        .await?;
    info!(referral_id = %referral.id, status = %referral.status, reviewer = %caller.id, "Referral updated");
    Ok(Json(view(&state, referral).await?))
}

async fn delete_referral(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require(&caller, Action::DeleteReferrals)?;
    state.referrals.delete(id).await?;
    info!(referral_id = %id, deleted_by = %caller.id, "Referral deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn attach(
    state: AppState,
    caller: User,
    id: Uuid,
    category: FileCategory,
    multipart: Multipart,
) -> ApiResult<Json<ReferralResponse>> {
    let referral = state.referrals.get_by_id(id).await?;
    require_owner_or_reviewer(&caller, &referral)?;

    let locator = store_upload(&state.files, category, multipart).await?;
    let update = match category {
        FileCategory::Photo => UpdateReferral {
            photo_locator: Some(locator),
            ..Default::default()
        },
        _ => UpdateReferral {
            resume_locator: Some(locator),
            ..Default::default()
        },
    };
    let referral = state.referrals.update(id, update).await?;
    info!(referral_id = %referral.id, category = %category, "Referral attachment stored");
    Ok(Json(view(&state, referral).await?))
}

async fn upload_resume(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<ReferralResponse>> {
    attach(state, caller, id, FileCategory::Resume, multipart).await
}

async fn upload_photo(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<ReferralResponse>> {
    attach(state, caller, id, FileCategory::Photo, multipart).await
}
