use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::AuthUser;
use super::permissions::{Action, Policy, authorize};
use super::validation::{validate_name, validate_slug};
use super::{ApiError, ApiResponse, AppState, GenreDto, SearchQuery};

#[derive(Debug, Deserialize)]
pub struct CreateGenreRequest {
    pub name: String,
    pub slug: String,
}

pub async fn list_genres(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<GenreDto>>>, ApiError> {
    let genres = state.store().list_genres(query.search.as_deref()).await?;
    let dtos = genres.into_iter().map(GenreDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

pub async fn create_genre(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Json(payload): Json<CreateGenreRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GenreDto>>), ApiError> {
    authorize(Policy::AdminOrReadOnly, actor.as_ref(), Action::Create, false)?;
    validate_name("name", &payload.name)?;
    validate_slug(&payload.slug)?;

    if state.store().get_genre_by_slug(&payload.slug).await?.is_some() {
        return Err(ApiError::validation_field(
            "slug",
            "A genre with that slug already exists",
        ));
    }

    let genre = state
        .store()
        .create_genre(&payload.name, &payload.slug)
        .await
        .map_err(|err| match err {
            crate::db::InsertError::Conflict => {
                ApiError::validation_field("slug", "A genre with that slug already exists")
            }
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(genre.into()))))
}

pub async fn delete_genre(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize(Policy::AdminOrReadOnly, actor.as_ref(), Action::Delete, false)?;

    if !state.store().delete_genre(&slug).await? {
        return Err(ApiError::not_found("Genre", &slug));
    }
    Ok(StatusCode::NO_CONTENT)
}
