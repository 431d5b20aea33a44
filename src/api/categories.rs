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
use super::{ApiError, ApiResponse, AppState, CategoryDto, SearchQuery};

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<CategoryDto>>>, ApiError> {
    let categories = state
        .store()
        .list_categories(query.search.as_deref())
        .await?;
    let dtos = categories.into_iter().map(CategoryDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryDto>>), ApiError> {
    authorize(Policy::AdminOrReadOnly, actor.as_ref(), Action::Create, false)?;
    validate_name("name", &payload.name)?;
    validate_slug(&payload.slug)?;

    if state.store().get_category_by_slug(&payload.slug).await?.is_some() {
        return Err(ApiError::validation_field(
            "slug",
            "A category with that slug already exists",
        ));
    }

    let category = state
        .store()
        .create_category(&payload.name, &payload.slug)
        .await
        .map_err(|err| match err {
            crate::db::InsertError::Conflict => ApiError::validation_field(
                "slug",
                "A category with that slug already exists",
            ),
            other => other.into(),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(category.into())),
    ))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Option<AuthUser>>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize(Policy::AdminOrReadOnly, actor.as_ref(), Action::Delete, false)?;

    if !state.store().delete_category(&slug).await? {
        return Err(ApiError::not_found("Category", &slug));
    }
    Ok(StatusCode::NO_CONTENT)
}
