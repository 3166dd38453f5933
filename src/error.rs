use std::collections::BTreeMap;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::models::{DetailsResponse, MessageResponse};

/// RepoError
///
/// Failure raised by any `Repository` implementation. Handlers decide how much
/// of it reaches the client; the full cause is always available for logging.
#[derive(Debug, Error)]
pub enum RepoError {
    /// A unique constraint rejected the write (e.g. an email already registered).
    #[error("duplicate value for {0}")]
    Duplicate(String),
    /// A CHECK constraint rejected the write; holds the constraint name.
    #[error("check constraint {0} violated")]
    CheckViolation(String),
    /// A stored value could not be mapped back into the domain model.
    #[error("corrupt row: {0}")]
    Corrupt(String),
    /// Simulated or injected storage failure (in-memory store only).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            let constraint = db.constraint().unwrap_or_default().to_string();
            if db.is_unique_violation() {
                return RepoError::Duplicate(constraint);
            }
            if db.is_check_violation() {
                return RepoError::CheckViolation(constraint);
            }
        }
        RepoError::Database(e)
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// FieldErrors
///
/// Per-field validation messages, serialized as `{"campo": ["mensaje", ...]}`.
#[derive(Debug, Default, Clone, Serialize, PartialEq)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// Trims a required text field, recording an error when it is absent or blank.
    pub fn required(&mut self, field: &str, value: Option<String>) -> String {
        match value.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => v,
            _ => {
                self.add(field, "Este campo es requerido.");
                String::new()
            }
        }
    }

    /// Like `required`, but only checks values that are present (partial updates).
    pub fn not_blank(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let value = value?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "Este campo no puede estar en blanco.");
        }
        Some(trimmed.to_string())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the collected messages into a result, failing if any were recorded.
    pub fn finish(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

/// ApiError
///
/// The single error type returned by handlers and extractors. Every variant
/// renders as a JSON body with a Spanish, human-readable message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("missing or invalid credentials")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found")]
    NotFound,
    #[error("event deletion failed")]
    DeletionFailed(#[source] RepoError),
    #[error("repository error")]
    Repository(#[from] RepoError),
    #[error("token error")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing error: {0}")]
    Password(String),
}

fn message(status: StatusCode, text: &str) -> Response {
    let body = MessageResponse {
        message: text.to_string(),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Los datos enviados no son válidos.", "errors": errors })),
            )
                .into_response(),
            ApiError::BadRequest(text) => message(StatusCode::BAD_REQUEST, text),
            ApiError::Unauthorized => message(
                StatusCode::UNAUTHORIZED,
                "Las credenciales de autenticación no se proveyeron o no son válidas.",
            ),
            ApiError::Forbidden(text) => message(StatusCode::FORBIDDEN, text),
            ApiError::NotFound => message(StatusCode::NOT_FOUND, "No encontrado."),
            ApiError::DeletionFailed(cause) => {
                tracing::error!(error = ?cause, "event deletion failed");
                let body = DetailsResponse {
                    details: "Algo pasó al intentar eliminar el evento".to_string(),
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::Repository(_) | ApiError::Token(_) | ApiError::Password(_) => {
                tracing::error!(error = ?self, source = ?std::error::Error::source(&self), "request failed");
                message(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocurrió un error interno en el servidor.",
                )
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Cuerpo JSON inválido: {}", rejection.body_text()))
    }
}
