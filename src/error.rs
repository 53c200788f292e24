//! Application error type mapped onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lazy_static::lazy_static;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

lazy_static! {
    // Internal error detail is only surfaced outside production.
    static ref EXPOSE_DETAIL: bool = std::env::var("APP_ENV")
        .map(|env| env != "production")
        .unwrap_or(true);
}

/// One rejected field from payload validation, keyed by the wire-format
/// (camelCase) field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests, please try again later")]
    TooManyRequests,

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// True when the error is a Postgres unique-constraint violation, so callers
/// can turn a racing insert into a 409 instead of a 500.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Validation failed", "errors": errors })),
            )
                .into_response(),
            AppError::BadRequest(message) => respond(StatusCode::BAD_REQUEST, message),
            AppError::Unauthorized(message) => respond(StatusCode::UNAUTHORIZED, message),
            AppError::Forbidden(message) => respond(StatusCode::FORBIDDEN, message),
            AppError::NotFound(message) => respond(StatusCode::NOT_FOUND, message),
            AppError::Conflict(message) => respond(StatusCode::CONFLICT, message),
            AppError::TooManyRequests => respond(
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please try again later".to_string(),
            ),
            AppError::Db(sqlx::Error::RowNotFound) => {
                respond(StatusCode::NOT_FOUND, "Resource not found".to_string())
            }
            AppError::Db(err) if is_unique_violation(&err) => {
                respond(StatusCode::CONFLICT, "Resource already exists".to_string())
            }
            AppError::Db(err) => internal(err.to_string()),
            AppError::Internal(err) => internal(format!("{err:#}")),
        }
    }
}

fn respond(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn internal(detail: String) -> Response {
    tracing::error!(%detail, "internal server error");
    let body = if *EXPOSE_DETAIL {
        json!({ "message": "Internal server error", "detail": detail })
    } else {
        json!({ "message": "Internal server error" })
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = camelize(field);
                errs.iter().map(move |err| FieldError {
                    message: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid")),
                    field: field.clone(),
                })
            })
            .collect();
        // HashMap iteration order is arbitrary; keep the wire output stable.
        fields.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
        AppError::Validation(fields)
    }
}

/// Maps a Rust snake_case field name to the camelCase name used on the wire.
fn camelize(field: &str) -> String {
    let mut parts = field.split('_');
    let mut out = String::with_capacity(field.len());
    if let Some(first) = parts.next() {
        out.push_str(first);
    }
    for part in parts {
        let mut chars = part.chars();
        if let Some(c) = chars.next() {
            out.extend(c.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
