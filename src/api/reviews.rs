use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::AuthUser;
use super::permissions::{Action, Policy, authorize};
use super::validation::validate_score;
use super::{ApiError, ApiResponse, AppState, ReviewDto};

const DUPLICATE_REVIEW_MSG: &str = "You have already reviewed this title";

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub text: String,
    pub score: i16,
}

#[derive(Debug, Deserialize, Default)]
pub struct PatchReviewRequest {
    pub text: Option<String>,
    pub score: Option<i16>,
}

async fn ensure_title(state: &AppState, title_id: i32) -> Result<(), ApiError> {
    state
        .store()
        .get_title(title_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found("Title", title_id))
}

pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(title_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<ReviewDto>>>, ApiError> {
    ensure_title(&state, title_id).await?;

    let reviews = state.store().list_reviews(title_id).await?;
    let dtos = reviews.into_iter().map(ReviewDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Path(title_id): Path<i32>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewDto>>), ApiError> {
    authorize(
        Policy::AdminModeratorAuthorOrReadOnly,
        actor.as_ref(),
        Action::Create,
        false,
    )?;
    let actor = actor.ok_or_else(|| ApiError::internal("authorized create without actor"))?;

    ensure_title(&state, title_id).await?;
    validate_score(payload.score)?;
    if payload.text.trim().is_empty() {
        return Err(ApiError::validation_field("text", "text cannot be empty"));
    }

    // Fast-path duplicate check; the unique index catches races.
    if state
        .store()
        .get_review_by_author(title_id, actor.id)
        .await?
        .is_some()
    {
        return Err(ApiError::validation(DUPLICATE_REVIEW_MSG));
    }

    let review = state
        .store()
        .create_review(title_id, actor.id, &payload.text, payload.score)
        .await
        .map_err(|err| match err {
            crate::db::InsertError::Conflict => ApiError::validation(DUPLICATE_REVIEW_MSG),
            other => other.into(),
        })?;

    let dto = ReviewDto {
        id: review.id,
        text: review.text,
        author: actor.username,
        score: review.score,
        pub_date: review.pub_date,
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::success(dto))))
}

pub async fn get_review(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<ReviewDto>>, ApiError> {
    let review = state
        .store()
        .get_review(title_id, review_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Review", review_id))?;
    Ok(Json(ApiResponse::success(review.into())))
}

pub async fn patch_review(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Json(payload): Json<PatchReviewRequest>,
) -> Result<Json<ApiResponse<ReviewDto>>, ApiError> {
    let (review, author) = state
        .store()
        .get_review(title_id, review_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Review", review_id))?;

    let is_author = actor.as_ref().is_some_and(|a| a.id == review.author_id);
    authorize(
        Policy::AdminModeratorAuthorOrReadOnly,
        actor.as_ref(),
        Action::Update,
        is_author,
    )?;

    if let Some(score) = payload.score {
        validate_score(score)?;
    }
    if payload
        .text
        .as_deref()
        .is_some_and(|text| text.trim().is_empty())
    {
        return Err(ApiError::validation_field("text", "text cannot be empty"));
    }

    let updated = state
        .store()
        .update_review(review, payload.text, payload.score)
        .await?;
    Ok(Json(ApiResponse::success((updated, author).into())))
}

pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<StatusCode, ApiError> {
    let (review, _) = state
        .store()
        .get_review(title_id, review_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Review", review_id))?;

    let is_author = actor.as_ref().is_some_and(|a| a.id == review.author_id);
    authorize(
        Policy::AdminModeratorAuthorOrReadOnly,
        actor.as_ref(),
        Action::Delete,
        is_author,
    )?;

    state.store().delete_review(review).await?;
    Ok(StatusCode::NO_CONTENT)
}
