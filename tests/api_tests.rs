use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use reviewarr::Config;
use reviewarr::api::{self, AppState};
use reviewarr::db::InsertError;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn spawn_app() -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.general.database_url = "sqlite::memory:".to_string();
    config.auth.token_secret = "integration-test-secret".to_string();
    config.mail.mode = "memory".to_string();
    config.server.metrics_enabled = false;

    let state = api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    (api::router(state.clone()), state)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn obtain_token(app: &Router, state: &AppState, username: &str, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/auth/signup/",
            None,
            Some(&json!({"username": username, "email": email})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let code = state
        .mailer()
        .deliveries()
        .iter()
        .rev()
        .find(|d| d.recipient == email)
        .and_then(|d| d.body.strip_prefix("Your confirmation code: "))
        .expect("no confirmation delivery")
        .to_string();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/auth/token/",
            None,
            Some(&json!({"username": username, "confirmation_code": code})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    body_json(response).await["data"]["token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Token for the superuser seeded by the initial migration.
async fn admin_token(app: &Router, state: &AppState) -> String {
    obtain_token(app, state, "admin", "admin@reviewarr.local").await
}

/// Admin-created account with the given role, then the normal token flow.
async fn user_with_role(
    app: &Router,
    state: &AppState,
    admin: &str,
    username: &str,
    role: &str,
) -> String {
    let email = format!("{username}@example.com");
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/users/",
            Some(admin),
            Some(&json!({"username": username, "email": email, "role": role})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    obtain_token(app, state, username, &email).await
}

async fn create_category(app: &Router, admin: &str, name: &str, slug: &str) {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/categories/",
            Some(admin),
            Some(&json!({"name": name, "slug": slug})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn create_title(app: &Router, admin: &str, name: &str, year: i32, category: &str) -> i64 {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/titles/",
            Some(admin),
            Some(&json!({"name": name, "year": year, "category": category})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _state) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(request("GET", "/api/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_category_permissions_and_crud() {
    let (app, state) = spawn_app().await;
    let admin = admin_token(&app, &state).await;
    let user = obtain_token(&app, &state, "plain", "plain@example.com").await;

    // Reads are open, writes are admin-only.
    let response = app
        .clone()
        .oneshot(request("GET", "/api/v1/categories/", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload = json!({"name": "Movies", "slug": "movies"});
    let response = app
        .clone()
        .oneshot(request("POST", "/api/v1/categories/", None, Some(&payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/categories/",
            Some(&user),
            Some(&payload),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    create_category(&app, &admin, "Movies", "movies").await;

    // Duplicate slug, both via pre-check and response shape.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/categories/",
            Some(&admin),
            Some(&json!({"name": "Films", "slug": "movies"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["field"], "slug");

    // Exact-match search.
    let response = app
        .clone()
        .oneshot(request("GET", "/api/v1/categories/?search=Movies", None, None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["slug"], "movies");

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            "/api/v1/categories/movies/",
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            "/api/v1/categories/movies/",
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_genre_slug_validation() {
    let (app, state) = spawn_app().await;
    let admin = admin_token(&app, &state).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/genres/",
            Some(&admin),
            Some(&json!({"name": "Sci-Fi", "slug": "sci fi"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["field"], "slug");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/genres/",
            Some(&admin),
            Some(&json!({"name": "Sci-Fi", "slug": "sci-fi"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_title_crud_and_validation() {
    let (app, state) = spawn_app().await;
    let admin = admin_token(&app, &state).await;

    create_category(&app, &admin, "Movies", "movies").await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/genres/",
            Some(&admin),
            Some(&json!({"name": "Drama", "slug": "drama"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Unknown category and genre are named in the error.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/titles/",
            Some(&admin),
            Some(&json!({"name": "Solaris", "year": 1972, "category": "books"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "category");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/titles/",
            Some(&admin),
            Some(&json!({
                "name": "Solaris", "year": 1972,
                "category": "movies", "genre": ["horror"]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "genre");

    // Releases cannot postdate the current year.
    use chrono::Datelike;
    let next_year = chrono::Utc::now().year() + 1;
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/titles/",
            Some(&admin),
            Some(&json!({"name": "Future", "year": next_year, "category": "movies"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "year");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/titles/",
            Some(&admin),
            Some(&json!({
                "name": "Solaris", "year": 1972,
                "category": "movies", "genre": ["drama"]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let title_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["rating"], Value::Null);
    assert_eq!(body["data"]["category"]["slug"], "movies");
    assert_eq!(body["data"]["genre"][0]["slug"], "drama");

    let uri = format!("/api/v1/titles/{title_id}/");
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &uri,
            Some(&admin),
            Some(&json!({"description": "A space station orbits a sentient ocean"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["data"]["description"],
        "A space station orbits a sentient ocean"
    );

    // Full replacement is not offered.
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &uri,
            Some(&admin),
            Some(&json!({"name": "Solaris", "year": 1972, "category": "movies"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Method not allowed on this resource");

    let response = app
        .clone()
        .oneshot(request("DELETE", &uri, Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(request("GET", &uri, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_scores_and_uniqueness() {
    let (app, state) = spawn_app().await;
    let admin = admin_token(&app, &state).await;
    let alice = obtain_token(&app, &state, "alice", "alice@example.com").await;
    let bob = obtain_token(&app, &state, "bob", "bob@example.com").await;

    create_category(&app, &admin, "Movies", "movies").await;
    let title_id = create_title(&app, &admin, "Stalker", 1979, "movies").await;
    let reviews_uri = format!("/api/v1/titles/{title_id}/reviews/");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &reviews_uri,
            Some(&alice),
            Some(&json!({"text": "Masterpiece", "score": 11})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "score");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &reviews_uri,
            Some(&alice),
            Some(&json!({"text": "Masterpiece", "score": 10})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["author"], "alice");
    assert_eq!(body["data"]["score"], 10);

    // One review per author per title.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &reviews_uri,
            Some(&alice),
            Some(&json!({"text": "Second take", "score": 3})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "You have already reviewed this title");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &reviews_uri,
            Some(&bob),
            Some(&json!({"text": "Slow but rewarding", "score": 5})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Rounded average of 10 and 5.
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/v1/titles/{title_id}/"),
            None,
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["rating"], 8);
}

#[tokio::test]
async fn test_review_unique_index_guards_races() {
    let (app, state) = spawn_app().await;
    let admin = admin_token(&app, &state).await;
    let alice = obtain_token(&app, &state, "alice", "alice@example.com").await;

    create_category(&app, &admin, "Movies", "movies").await;
    let title_id =
        i32::try_from(create_title(&app, &admin, "Stalker", 1979, "movies").await).unwrap();

    let author = state
        .store()
        .get_user_by_username("alice")
        .await
        .unwrap()
        .expect("signup created the account");

    // The index is the authoritative guard: a second insert for the same
    // (title, author) pair must fail even when no handler pre-check ran.
    state
        .store()
        .create_review(title_id, author.id, "Masterpiece", 10)
        .await
        .unwrap();
    let conflict = state
        .store()
        .create_review(title_id, author.id, "Second take", 3)
        .await;
    assert!(matches!(conflict, Err(InsertError::Conflict)));

    // Whichever path catches the duplicate, the API message is the same.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews/"),
            Some(&alice),
            Some(&json!({"text": "Third take", "score": 7})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "You have already reviewed this title"
    );
}

#[tokio::test]
async fn test_patch_review_rejects_blank_text() {
    let (app, state) = spawn_app().await;
    let admin = admin_token(&app, &state).await;
    let alice = obtain_token(&app, &state, "alice", "alice@example.com").await;

    create_category(&app, &admin, "Movies", "movies").await;
    let title_id = create_title(&app, &admin, "Stalker", 1979, "movies").await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews/"),
            Some(&alice),
            Some(&json!({"text": "Masterpiece", "score": 9})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let review_id = body_json(response).await["data"]["id"].as_i64().unwrap();
    let review_uri = format!("/api/v1/titles/{title_id}/reviews/{review_id}/");

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &review_uri,
            Some(&alice),
            Some(&json!({"text": "   "})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "text");

    let response = app
        .clone()
        .oneshot(request("GET", &review_uri, None, None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["data"]["text"], "Masterpiece");
}

#[tokio::test]
async fn test_put_is_denied_with_standard_body_everywhere() {
    let (app, state) = spawn_app().await;
    let admin = admin_token(&app, &state).await;

    create_category(&app, &admin, "Movies", "movies").await;
    let title_id = create_title(&app, &admin, "Stalker", 1979, "movies").await;

    for uri in [
        "/api/v1/users/".to_string(),
        "/api/v1/users/me/".to_string(),
        "/api/v1/categories/".to_string(),
        "/api/v1/categories/movies/".to_string(),
        "/api/v1/genres/".to_string(),
        "/api/v1/titles/".to_string(),
        format!("/api/v1/titles/{title_id}/reviews/"),
    ] {
        let response = app
            .clone()
            .oneshot(request(
                "PUT",
                &uri,
                Some(&admin),
                Some(&json!({"name": "ignored"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{uri}");
        let body = body_json(response).await;
        assert_eq!(body["success"], false, "{uri}");
        assert_eq!(body["error"], "Method not allowed on this resource", "{uri}");
    }
}

#[tokio::test]
async fn test_review_author_and_moderator_permissions() {
    let (app, state) = spawn_app().await;
    let admin = admin_token(&app, &state).await;
    let alice = obtain_token(&app, &state, "alice", "alice@example.com").await;
    let bob = obtain_token(&app, &state, "bob", "bob@example.com").await;
    let moderator = user_with_role(&app, &state, &admin, "mod", "moderator").await;

    create_category(&app, &admin, "Movies", "movies").await;
    let title_id = create_title(&app, &admin, "Stalker", 1979, "movies").await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews/"),
            Some(&alice),
            Some(&json!({"text": "Masterpiece", "score": 9})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let review_id = body_json(response).await["data"]["id"].as_i64().unwrap();
    let review_uri = format!("/api/v1/titles/{title_id}/reviews/{review_id}/");

    // Anonymous reads are fine, anonymous writes are not.
    let response = app
        .clone()
        .oneshot(request("GET", &review_uri, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let patch = json!({"text": "Edited"});
    let response = app
        .clone()
        .oneshot(request("PATCH", &review_uri, None, Some(&patch)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A non-author regular user cannot edit.
    let response = app
        .clone()
        .oneshot(request("PATCH", &review_uri, Some(&bob), Some(&patch)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Moderators can.
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &review_uri,
            Some(&moderator),
            Some(&json!({"score": 7})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["score"], 7);
    assert_eq!(body["data"]["author"], "alice");

    // So can the author, including delete.
    let response = app
        .clone()
        .oneshot(request("DELETE", &review_uri, Some(&alice), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(request("GET", &review_uri, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comments_nested_under_reviews() {
    let (app, state) = spawn_app().await;
    let admin = admin_token(&app, &state).await;
    let alice = obtain_token(&app, &state, "alice", "alice@example.com").await;
    let bob = obtain_token(&app, &state, "bob", "bob@example.com").await;

    create_category(&app, &admin, "Movies", "movies").await;
    let title_id = create_title(&app, &admin, "Stalker", 1979, "movies").await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/titles/{title_id}/reviews/"),
            Some(&alice),
            Some(&json!({"text": "Masterpiece", "score": 9})),
        ))
        .await
        .unwrap();
    let review_id = body_json(response).await["data"]["id"].as_i64().unwrap();
    let comments_uri = format!("/api/v1/titles/{title_id}/reviews/{review_id}/comments/");

    // Unknown parent review is a 404, not an empty list.
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/v1/titles/{title_id}/reviews/9999/comments/"),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &comments_uri,
            Some(&bob),
            Some(&json!({"text": "Agreed"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let comment_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    // Identical text on the same review is refused.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &comments_uri,
            Some(&bob),
            Some(&json!({"text": "Agreed"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["field"], "text");

    let response = app
        .clone()
        .oneshot(request("GET", &comments_uri, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["author"], "bob");

    let comment_uri = format!("{comments_uri}{comment_id}/");
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &comment_uri,
            Some(&alice),
            Some(&json!({"text": "Strongly agreed"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &comment_uri,
            Some(&bob),
            Some(&json!({"text": "Strongly agreed"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request("DELETE", &comment_uri, Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_reviews_require_existing_title() {
    let (app, _state) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(request("GET", "/api/v1/titles/9999/reviews/", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_user_management() {
    let (app, state) = spawn_app().await;
    let admin = admin_token(&app, &state).await;
    let user = obtain_token(&app, &state, "plain", "plain@example.com").await;

    // Listing is admin-only.
    let response = app
        .clone()
        .oneshot(request("GET", "/api/v1/users/", Some(&user), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/users/",
            Some(&admin),
            Some(&json!({"username": "frank", "email": "frank@example.com"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["role"], "user");

    // Admins can change roles.
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            "/api/v1/users/frank/",
            Some(&admin),
            Some(&json!({"role": "moderator", "bio": "Keeps the peace"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["role"], "moderator");
    assert_eq!(body["data"]["bio"], "Keeps the peace");

    let response = app
        .clone()
        .oneshot(request("GET", "/api/v1/users/?search=frank", Some(&admin), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(request("DELETE", "/api/v1/users/frank/", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/v1/users/frank/", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_self_service_cannot_escalate_role() {
    let (app, state) = spawn_app().await;
    let user = obtain_token(&app, &state, "plain", "plain@example.com").await;

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            "/api/v1/users/me/",
            Some(&user),
            Some(&json!({"first_name": "Plain", "role": "admin"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    // The profile change lands, the role change is dropped.
    assert_eq!(body["data"]["first_name"], "Plain");
    assert_eq!(body["data"]["role"], "user");
}
