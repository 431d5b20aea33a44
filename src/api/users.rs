use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{AuthUser, DUPLICATE_EMAIL_MSG, DUPLICATE_USERNAME_MSG};
use super::permissions::{Action, Policy, authorize};
use super::validation::{validate_email, validate_username};
use super::{ApiError, ApiResponse, AppState, SearchQuery, UserDto};
use crate::db::{NewUser, UserPatch};
use crate::entities::users::{self, Role};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub bio: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PatchUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

fn require_actor(actor: Option<AuthUser>) -> Result<AuthUser, ApiError> {
    actor.ok_or_else(|| {
        ApiError::Unauthorized("Authentication credentials were not provided".to_string())
    })
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    authorize(Policy::AdminOnly, actor.as_ref(), Action::Read, false)?;

    let users = state.store().list_users(query.search.as_deref()).await?;
    let dtos = users.into_iter().map(UserDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), ApiError> {
    authorize(Policy::AdminOnly, actor.as_ref(), Action::Create, false)?;
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;

    let store = state.store();
    if store.get_user_by_username(&payload.username).await?.is_some() {
        return Err(ApiError::validation_field("username", DUPLICATE_USERNAME_MSG));
    }
    if store.get_user_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::validation_field("email", DUPLICATE_EMAIL_MSG));
    }

    let new_user = NewUser {
        username: payload.username,
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        bio: payload.bio,
        role: payload.role.unwrap_or_default(),
    };
    let user = store.create_user(new_user).await.map_err(|err| match err {
        crate::db::InsertError::Conflict => {
            ApiError::validation_field("username", DUPLICATE_USERNAME_MSG)
        }
        other => other.into(),
    })?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user.into()))))
}

pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let actor = require_actor(actor)?;
    let user = state
        .store()
        .get_user(actor.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", actor.username))?;
    Ok(Json(ApiResponse::success(user.into())))
}

/// PATCH /users/me/ — self-service profile edit. A submitted `role` is
/// silently discarded; the stored role survives the call unchanged.
pub async fn patch_me(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Json(mut payload): Json<PatchUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let actor = require_actor(actor)?;
    payload.role = None;

    let user = state
        .store()
        .get_user(actor.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", actor.username))?;

    let updated = apply_user_patch(&state, user, payload).await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    authorize(Policy::AdminOnly, actor.as_ref(), Action::Read, false)?;

    let user = state
        .store()
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &username))?;
    Ok(Json(ApiResponse::success(user.into())))
}

pub async fn patch_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Path(username): Path<String>,
    Json(payload): Json<PatchUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    authorize(Policy::AdminOnly, actor.as_ref(), Action::Update, false)?;

    let user = state
        .store()
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &username))?;

    let updated = apply_user_patch(&state, user, payload).await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Path(username): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize(Policy::AdminOnly, actor.as_ref(), Action::Delete, false)?;

    let user = state
        .store()
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &username))?;
    state.store().delete_user(user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Validate and persist a partial user update, translating a late unique
/// violation into the same message the pre-check would have produced.
async fn apply_user_patch(
    state: &AppState,
    user: users::Model,
    payload: PatchUserRequest,
) -> Result<users::Model, ApiError> {
    let store = state.store();

    if let Some(username) = &payload.username {
        validate_username(username)?;
        if username != &user.username
            && store.get_user_by_username(username).await?.is_some()
        {
            return Err(ApiError::validation_field("username", DUPLICATE_USERNAME_MSG));
        }
    }
    if let Some(email) = &payload.email {
        validate_email(email)?;
        if email != &user.email && store.get_user_by_email(email).await?.is_some() {
            return Err(ApiError::validation_field("email", DUPLICATE_EMAIL_MSG));
        }
    }

    let username_changed = payload.username.is_some();
    let patch = UserPatch {
        username: payload.username,
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        bio: payload.bio,
        role: payload.role,
    };

    store.update_user(user, patch).await.map_err(|err| match err {
        crate::db::InsertError::Conflict => {
            if username_changed {
                ApiError::validation_field("username", DUPLICATE_USERNAME_MSG)
            } else {
                ApiError::validation_field("email", DUPLICATE_EMAIL_MSG)
            }
        }
        other => other.into(),
    })
}
