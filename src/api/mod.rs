use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

pub mod auth;
mod categories;
mod comments;
mod error;
mod genres;
mod observability;
pub mod permissions;
mod reviews;
mod titles;
mod types;
mod users;
pub mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn mailer(&self) -> &crate::mail::Mailer {
        &self.shared.mailer
    }

    #[must_use]
    pub fn confirmation(&self) -> &crate::auth::ConfirmationCodeIssuer {
        &self.shared.confirmation
    }

    #[must_use]
    pub fn access_tokens(&self) -> &crate::auth::AccessTokenIssuer {
        &self.shared.access_tokens
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

/// Full replacement is disallowed on every mutable resource.
async fn deny_put() -> ApiError {
    ApiError::MethodNotAllowed
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let v1 = Router::new()
        .route("/auth/signup/", post(auth::signup))
        .route("/auth/token/", post(auth::issue_token))
        .route(
            "/users/",
            get(users::list_users).post(users::create_user).put(deny_put),
        )
        .route(
            "/users/me/",
            get(users::get_me).patch(users::patch_me).put(deny_put),
        )
        .route(
            "/users/{username}/",
            get(users::get_user)
                .patch(users::patch_user)
                .delete(users::delete_user)
                .put(deny_put),
        )
        .route(
            "/categories/",
            get(categories::list_categories)
                .post(categories::create_category)
                .put(deny_put),
        )
        .route(
            "/categories/{slug}/",
            delete(categories::delete_category).put(deny_put),
        )
        .route(
            "/genres/",
            get(genres::list_genres)
                .post(genres::create_genre)
                .put(deny_put),
        )
        .route("/genres/{slug}/", delete(genres::delete_genre).put(deny_put))
        .route(
            "/titles/",
            get(titles::list_titles).post(titles::create_title).put(deny_put),
        )
        .route(
            "/titles/{title_id}/",
            get(titles::get_title)
                .patch(titles::patch_title)
                .delete(titles::delete_title)
                .put(deny_put),
        )
        .route(
            "/titles/{title_id}/reviews/",
            get(reviews::list_reviews)
                .post(reviews::create_review)
                .put(deny_put),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/",
            get(reviews::get_review)
                .patch(reviews::patch_review)
                .delete(reviews::delete_review)
                .put(deny_put),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/",
            get(comments::list_comments)
                .post(comments::create_comment)
                .put(deny_put),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}/",
            get(comments::get_comment)
                .patch(comments::patch_comment)
                .delete(comments::delete_comment)
                .put(deny_put),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::identify,
        ));

    let api_router = Router::new()
        .nest("/v1", v1)
        .route("/health", get(observability::get_health))
        .route("/metrics", get(observability::get_metrics))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}
