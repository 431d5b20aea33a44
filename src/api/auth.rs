use axum::{
    Json,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{SignupIdentity, check_signup_identity, validate_email, validate_username};
use super::{ApiError, ApiResponse, AppState, SignupDto, TokenDto};
use crate::db::NewUser;
use crate::entities::users::{self, Role};

pub const DUPLICATE_USERNAME_MSG: &str = "A user with that username already exists";
pub const DUPLICATE_EMAIL_MSG: &str = "A user with that email already exists";

/// The authenticated caller, resolved once per request by [`identify`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub is_superuser: bool,
}

impl AuthUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.is_superuser
    }

    #[must_use]
    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }
}

impl From<&users::Model> for AuthUser {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            is_superuser: user.is_superuser,
        }
    }
}

/// Resolves the bearer token into an `Option<AuthUser>` request extension.
///
/// A missing or non-bearer Authorization header leaves the request
/// anonymous; a bearer token that fails verification (or names a deleted
/// user) is rejected outright so the caller learns the token is stale.
pub async fn identify(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let actor = match token {
        None => None,
        Some(token) => {
            let claims = state
                .access_tokens()
                .verify(token)
                .map_err(|_| ApiError::Unauthorized("Invalid access token".to_string()))?;
            let user_id = claims
                .user_id()
                .ok_or_else(|| ApiError::Unauthorized("Invalid access token".to_string()))?;
            let user = state
                .store()
                .get_user(user_id)
                .await?
                .ok_or_else(|| ApiError::Unauthorized("Invalid access token".to_string()))?;
            Some(AuthUser::from(&user))
        }
    };

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
}

/// POST /auth/signup/ — create the account (or accept a resend for an
/// exact identity match) and deliver a confirmation code out-of-band.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<ApiResponse<SignupDto>>, ApiError> {
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;

    let user = resolve_signup_user(&state, &payload).await?;

    let code = state.confirmation().make_code(&user);
    state.mailer().send_confirmation_code(&user.email, &code);

    Ok(Json(ApiResponse::success(SignupDto {
        username: user.username,
        email: user.email,
    })))
}

/// Find-or-create step of signup. The unique indexes are the authoritative
/// guard; a conflicting concurrent insert is re-resolved through the same
/// identity check so both paths produce identical errors.
async fn resolve_signup_user(
    state: &AppState,
    payload: &SignupRequest,
) -> Result<users::Model, ApiError> {
    let store = state.store();

    let username_owner = store.get_user_by_username(&payload.username).await?;
    let email_owner = store.get_user_by_email(&payload.email).await?;

    match check_signup_identity(username_owner.as_ref(), email_owner.as_ref(), &payload.email) {
        // Resend implies the username owner exists.
        SignupIdentity::Resend => {
            username_owner.ok_or_else(|| ApiError::internal("signup identity lookup desync"))
        }
        SignupIdentity::DuplicateUsername => {
            Err(ApiError::validation_field("username", DUPLICATE_USERNAME_MSG))
        }
        SignupIdentity::DuplicateEmail => {
            Err(ApiError::validation_field("email", DUPLICATE_EMAIL_MSG))
        }
        SignupIdentity::New => {
            let new_user = NewUser {
                username: payload.username.clone(),
                email: payload.email.clone(),
                first_name: String::new(),
                last_name: String::new(),
                bio: String::new(),
                role: Role::User,
            };
            match store.create_user(new_user).await {
                Ok(user) => Ok(user),
                Err(crate::db::InsertError::Conflict) => {
                    // Lost a race; whoever won defines the outcome now.
                    let username_owner = store.get_user_by_username(&payload.username).await?;
                    let email_owner = store.get_user_by_email(&payload.email).await?;
                    match check_signup_identity(
                        username_owner.as_ref(),
                        email_owner.as_ref(),
                        &payload.email,
                    ) {
                        SignupIdentity::Resend => username_owner
                            .ok_or_else(|| ApiError::internal("signup identity lookup desync")),
                        SignupIdentity::DuplicateEmail => {
                            Err(ApiError::validation_field("email", DUPLICATE_EMAIL_MSG))
                        }
                        _ => Err(ApiError::validation_field("username", DUPLICATE_USERNAME_MSG)),
                    }
                }
                Err(err) => Err(err.into()),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub confirmation_code: String,
}

/// POST /auth/token/ — exchange a confirmation code for an access token.
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<ApiResponse<TokenDto>>, ApiError> {
    let user = state
        .store()
        .get_user_by_username(&payload.username)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &payload.username))?;

    if !state.confirmation().verify(&user, &payload.confirmation_code) {
        return Err(ApiError::validation_field(
            "confirmation_code",
            "Invalid or expired confirmation code",
        ));
    }

    let token = state
        .access_tokens()
        .mint(&user)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(ApiResponse::success(TokenDto { token })))
}
