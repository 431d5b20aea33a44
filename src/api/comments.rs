use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::AuthUser;
use super::permissions::{Action, Policy, authorize};
use super::{ApiError, ApiResponse, AppState, CommentDto};

const DUPLICATE_COMMENT_MSG: &str = "An identical comment already exists for this review";

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct PatchCommentRequest {
    pub text: String,
}

/// The review must exist and belong to the title from the path.
async fn ensure_review(state: &AppState, title_id: i32, review_id: i32) -> Result<(), ApiError> {
    state
        .store()
        .get_review(title_id, review_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found("Review", review_id))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<Vec<CommentDto>>>, ApiError> {
    ensure_review(&state, title_id, review_id).await?;

    let comments = state.store().list_comments(review_id).await?;
    let dtos = comments.into_iter().map(CommentDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CommentDto>>), ApiError> {
    authorize(
        Policy::AdminModeratorAuthorOrReadOnly,
        actor.as_ref(),
        Action::Create,
        false,
    )?;
    let actor = actor.ok_or_else(|| ApiError::internal("authorized create without actor"))?;

    ensure_review(&state, title_id, review_id).await?;
    if payload.text.trim().is_empty() {
        return Err(ApiError::validation_field("text", "text cannot be empty"));
    }

    let comment = state
        .store()
        .create_comment(review_id, actor.id, &payload.text)
        .await
        .map_err(|err| match err {
            crate::db::InsertError::Conflict => {
                ApiError::validation_field("text", DUPLICATE_COMMENT_MSG)
            }
            other => other.into(),
        })?;

    let dto = CommentDto {
        id: comment.id,
        text: comment.text,
        author: actor.username,
        pub_date: comment.pub_date,
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::success(dto))))
}

pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
) -> Result<Json<ApiResponse<CommentDto>>, ApiError> {
    ensure_review(&state, title_id, review_id).await?;

    let comment = state
        .store()
        .get_comment(review_id, comment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment", comment_id))?;
    Ok(Json(ApiResponse::success(comment.into())))
}

pub async fn patch_comment(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
    Json(payload): Json<PatchCommentRequest>,
) -> Result<Json<ApiResponse<CommentDto>>, ApiError> {
    ensure_review(&state, title_id, review_id).await?;

    let (comment, author) = state
        .store()
        .get_comment(review_id, comment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment", comment_id))?;

    let is_author = actor.as_ref().is_some_and(|a| a.id == comment.author_id);
    authorize(
        Policy::AdminModeratorAuthorOrReadOnly,
        actor.as_ref(),
        Action::Update,
        is_author,
    )?;

    if payload.text.trim().is_empty() {
        return Err(ApiError::validation_field("text", "text cannot be empty"));
    }

    let updated = state
        .store()
        .update_comment(comment, payload.text)
        .await
        .map_err(|err| match err {
            crate::db::InsertError::Conflict => {
                ApiError::validation_field("text", DUPLICATE_COMMENT_MSG)
            }
            other => other.into(),
        })?;
    Ok(Json(ApiResponse::success((updated, author).into())))
}

pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
) -> Result<StatusCode, ApiError> {
    ensure_review(&state, title_id, review_id).await?;

    let (comment, _) = state
        .store()
        .get_comment(review_id, comment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment", comment_id))?;

    let is_author = actor.as_ref().is_some_and(|a| a.id == comment.author_id);
    authorize(
        Policy::AdminModeratorAuthorOrReadOnly,
        actor.as_ref(),
        Action::Delete,
        is_author,
    )?;

    state.store().delete_comment(comment).await?;
    Ok(StatusCode::NO_CONTENT)
}
