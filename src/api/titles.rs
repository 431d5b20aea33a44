use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::AuthUser;
use super::permissions::{Action, Policy, authorize};
use super::validation::{validate_name, validate_year};
use super::{ApiError, ApiResponse, AppState, TitleDto};
use crate::db::{TitlePatch, TitleQuery};
use crate::entities::genres;

#[derive(Debug, Deserialize)]
pub struct TitleFilter {
    pub category: Option<String>,
    pub genre: Option<String>,
    pub name: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTitleRequest {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    /// Genre slugs; may be empty.
    #[serde(default)]
    pub genre: Vec<String>,
    /// Category slug.
    pub category: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct PatchTitleRequest {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub genre: Option<Vec<String>>,
    pub category: Option<String>,
}

pub async fn list_titles(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TitleFilter>,
) -> Result<Json<ApiResponse<Vec<TitleDto>>>, ApiError> {
    let query = TitleQuery {
        category: filter.category,
        genre: filter.genre,
        name: filter.name,
        year: filter.year,
    };
    let titles = state.store().list_titles(&query).await?;
    let dtos = titles.into_iter().map(TitleDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

pub async fn get_title(
    State(state): State<Arc<AppState>>,
    Path(title_id): Path<i32>,
) -> Result<Json<ApiResponse<TitleDto>>, ApiError> {
    let detail = state
        .store()
        .get_title_detail(title_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Title", title_id))?;
    Ok(Json(ApiResponse::success(detail.into())))
}

pub async fn create_title(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Json(payload): Json<CreateTitleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TitleDto>>), ApiError> {
    authorize(Policy::AdminOrReadOnly, actor.as_ref(), Action::Create, false)?;
    validate_name("name", &payload.name)?;
    validate_year(payload.year)?;

    let category = state
        .store()
        .get_category_by_slug(&payload.category)
        .await?
        .ok_or_else(|| {
            ApiError::validation_field(
                "category",
                format!("Category '{}' does not exist", payload.category),
            )
        })?;
    let genres = resolve_genres(&state, &payload.genre).await?;
    let genre_ids: Vec<i32> = genres.iter().map(|g| g.id).collect();

    let title = state
        .store()
        .create_title(
            &payload.name,
            payload.year,
            payload.description,
            category.id,
            &genre_ids,
        )
        .await?;

    let detail = state
        .store()
        .get_title_detail(title.id)
        .await?
        .ok_or_else(|| ApiError::internal("created title vanished"))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(detail.into()))))
}

pub async fn patch_title(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Path(title_id): Path<i32>,
    Json(payload): Json<PatchTitleRequest>,
) -> Result<Json<ApiResponse<TitleDto>>, ApiError> {
    authorize(Policy::AdminOrReadOnly, actor.as_ref(), Action::Update, false)?;

    let title = state
        .store()
        .get_title(title_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Title", title_id))?;

    if let Some(name) = &payload.name {
        validate_name("name", name)?;
    }
    if let Some(year) = payload.year {
        validate_year(year)?;
    }

    let category_id = match &payload.category {
        None => None,
        Some(slug) => {
            let category = state.store().get_category_by_slug(slug).await?.ok_or_else(|| {
                ApiError::validation_field("category", format!("Category '{slug}' does not exist"))
            })?;
            Some(category.id)
        }
    };
    let genre_ids = match &payload.genre {
        None => None,
        Some(slugs) => {
            let genres = resolve_genres(&state, slugs).await?;
            Some(genres.iter().map(|g| g.id).collect())
        }
    };

    let patch = TitlePatch {
        name: payload.name,
        year: payload.year,
        description: payload.description,
        category_id,
        genre_ids,
    };
    let updated = state.store().update_title(title, patch).await?;

    let detail = state
        .store()
        .get_title_detail(updated.id)
        .await?
        .ok_or_else(|| ApiError::internal("updated title vanished"))?;
    Ok(Json(ApiResponse::success(detail.into())))
}

pub async fn delete_title(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Path(title_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    authorize(Policy::AdminOrReadOnly, actor.as_ref(), Action::Delete, false)?;

    if !state.store().delete_title(title_id).await? {
        return Err(ApiError::not_found("Title", title_id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn resolve_genres(
    state: &AppState,
    slugs: &[String],
) -> Result<Vec<genres::Model>, ApiError> {
    match state.store().get_genres_by_slugs(slugs).await? {
        Ok(genres) => Ok(genres),
        Err(unknown) => Err(ApiError::validation_field(
            "genre",
            format!("Genre '{unknown}' does not exist"),
        )),
    }
}
