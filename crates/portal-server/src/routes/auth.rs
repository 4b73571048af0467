use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use portal_auth::RegisterInput;
use portal_core::access::{Action, require};
use portal_core::error::PortalError;
use portal_core::models::user::Role;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody, MaybeAuthUser};
use crate::routes::users::UserResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

/// Self-service registration creates employees. Any other role needs an
/// administrator's bearer.
async fn register(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    if body.role.is_privileged() {
        let Some(caller) = caller else {
            return Err(PortalError::AuthenticationFailed {
                reason: format!("registering a {} account requires an administrator", body.role),
            }
            .into());
        };
        require(&caller, Action::ManageUsers)?;
    }

    let user = state
        .auth
        .register(RegisterInput {
            email: body.email,
            full_name: body.full_name,
            password: body.password,
            role: body.role,
            department: body.department,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let output = state.auth.login(&body.email, &body.password).await?;
    Ok(Json(TokenResponse {
        access_token: output.access_token,
        token_type: "bearer",
        expires_in: output.expires_in,
    }))
}

async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}
