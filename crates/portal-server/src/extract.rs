//! Request extractors: bearer authentication and JSON bodies that reject
//! with the portal's error body.

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use portal_auth::AuthError;
use portal_core::error::PortalError;
use portal_core::models::user::User;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller. Rejects with 401 when the bearer is missing
/// or invalid and with 403 when the account is deactivated.
pub struct AuthUser(pub User);

/// Like [`AuthUser`], but an absent `Authorization` header yields `None`.
/// A header that is present must still be valid.
pub struct MaybeAuthUser(pub Option<User>);

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AuthError::TokenInvalid("authorization header is not ASCII".into()))?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Ok(Some(token.trim()))
        }
        _ => Err(AuthError::TokenInvalid("expected a bearer token".into()).into()),
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(&parts.headers)?.ok_or_else(|| {
            ApiError(PortalError::AuthenticationFailed {
                reason: "missing bearer token".into(),
            })
        })?;
        let user = state.auth.authenticate(token).await?;
        Ok(AuthUser(user))
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        match bearer_token(&parts.headers)? {
            Some(token) => Ok(MaybeAuthUser(Some(state.auth.authenticate(token).await?))),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}

/// `Json<T>` whose rejection is a 400 with the portal's error body.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| PortalError::validation(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}
