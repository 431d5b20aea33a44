use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    /// Malformed or policy-violating input. `field` names the offending
    /// field when there is a single one.
    ValidationError {
        field: Option<String>,
        message: String,
    },

    NotFound(String),

    Unauthorized(String),

    Forbidden(String),

    MethodNotAllowed,

    DatabaseError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationError { message, .. } => write!(f, "Validation error: {}", message),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::MethodNotAllowed => write!(f, "Method not allowed"),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, field) = match self {
            ApiError::ValidationError { field, message } => {
                (StatusCode::BAD_REQUEST, message, field)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed on this resource".to_string(),
                None,
            ),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                    None,
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            success: false,
            error: message,
            field,
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::DatabaseError(format!("{err:#}"))
    }
}

impl From<crate::db::InsertError> for ApiError {
    fn from(err: crate::db::InsertError) -> Self {
        match err {
            // Callers that can name the duplicated field translate Conflict
            // themselves; reaching this arm means a constraint we did not
            // anticipate.
            crate::db::InsertError::Conflict => {
                ApiError::validation("The record conflicts with an existing one")
            }
            crate::db::InsertError::Db(e) => ApiError::DatabaseError(e.to_string()),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError {
            field: None,
            message: msg.into(),
        }
    }

    pub fn validation_field(field: &str, msg: impl Into<String>) -> Self {
        ApiError::ValidationError {
            field: Some(field.to_string()),
            message: msg.into(),
        }
    }

    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}
