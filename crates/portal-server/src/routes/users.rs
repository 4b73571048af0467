use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use portal_core::access::{Action, require};
use portal_core::error::PortalError;
use portal_core::models::user::{Role, UpdateUser, User};
use portal_core::repository::UserRepository;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody};
use crate::routes::{PageQuery, PageResponse};
use crate::state::AppState;

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub department: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            department: user.department,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Administrative account changes. `department: null` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub department: Option<Option<String>>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Distinguish an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/{id}", patch(update_user))
}

async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<UserResponse>>> {
    require(&caller, Action::ManageUsers)?;
    let users = state.auth.users().list(page.pagination()).await?;
    Ok(Json(users.map(UserResponse::from).into()))
}

async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    require(&caller, Action::ManageUsers)?;
    let demotes_self = body.is_active == Some(false) || body.role.is_some_and(|r| r != caller.role);
    if id == caller.id && demotes_self {
        return Err(PortalError::conflict(
            "administrators cannot deactivate or demote their own account",
        )
        .into());
    }
    if body.full_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(PortalError::validation("full name must not be blank").into());
    }

    let user = state
        .auth
        .users()
        .update(
            id,
            UpdateUser {
                full_name: body.full_name.map(|n| n.trim().to_string()),
                department: body.department,
                role: body.role,
                is_active: body.is_active,
                password: None,
            },
        )
        .await?;
    info!(user_id = %user.id, changed_by = %caller.id, "User updated");
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn department_null_and_absent_differ() {
        let absent: UpdateUserRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.department, None);

        let cleared: UpdateUserRequest = serde_json::from_str(r#"{"department":null}"#).unwrap();
        assert_eq!(cleared.department, Some(None));

        let set: UpdateUserRequest =
            serde_json::from_str(r#"{"department":"Finance"}"#).unwrap();
        assert_eq!(set.department, Some(Some("Finance".into())));
    }
}
