//! Multipart uploads into the file intake, and downloads by locator.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Multipart, Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use portal_core::access::{Action, require};
use portal_core::error::{PortalError, PortalResult};
use portal_files::{FileCategory, FileIntake, StoredFile};
use tokio::task;

use crate::error::ApiResult;
use crate::extract::AuthUser;
use crate::state::AppState;

/// Name of the multipart field that carries the file.
pub const FILE_FIELD: &str = "file";

pub fn router() -> Router<AppState> {
    Router::new().route("/{category}/{name}", get(download))
}

/// Read the `file` field of a multipart body and store it under
/// `category`. Returns the new locator.
pub async fn store_upload(
    files: &Arc<dyn FileIntake>,
    category: FileCategory,
    mut multipart: Multipart,
) -> PortalResult<String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PortalError::validation(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| PortalError::validation("the file part has no file name"))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| PortalError::validation(format!("could not read upload: {e}")))?;

        let files = Arc::clone(files);
        return task::spawn_blocking(move || files.store(category, &file_name, &data))
            .await
            .map_err(|e| PortalError::Internal(e.to_string()))?
            .map_err(PortalError::from);
    }
    Err(PortalError::validation(format!(
        "multipart body has no {FILE_FIELD:?} field"
    )))
}

async fn download(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path((category, name)): Path<(String, String)>,
) -> ApiResult<Response> {
    let category: FileCategory = category.parse()?;
    match category {
        FileCategory::JobDescription => require(&caller, Action::ViewJobs)?,
        FileCategory::Resume | FileCategory::Photo => require(&caller, Action::ReviewReferrals)?,
    }

    let locator = format!("{category}/{name}");
    let files = Arc::clone(&state.files);
    let StoredFile {
        content_type, data, ..
    } = task::spawn_blocking(move || files.read(&locator))
        .await
        .map_err(|e| PortalError::Internal(e.to_string()))??;

    Ok(([(CONTENT_TYPE, content_type)], data).into_response())
}
