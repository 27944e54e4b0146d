use actix_web::{error::BlockingError, http::StatusCode, HttpResponse, ResponseError};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;

use crate::actions::DbError;
use crate::storage::StorageError;
use crate::validation::FieldErrors;

/// A status update that would not move the record forward.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct StatusConflict {
    message: String,
}

impl StatusConflict {
    pub fn new(entity: &str, from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self {
            message: format!("Cannot move {entity} status from {from} to {to}"),
        }
    }

    pub fn raced(entity: &str) -> Self {
        Self {
            message: format!("The {entity} status was changed by someone else; reload and try again"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Please fix the highlighted fields")]
    Validation(FieldErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a FieldErrors>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let errors = match self {
            ApiError::Validation(fields) => Some(fields),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            message: self.to_string(),
            errors,
        })
    }
}

impl ApiError {
    /// Maps a data-access failure for `entity` onto the HTTP error it deserves.
    pub fn from_db(entity: &str, e: DbError) -> Self {
        if let Some(conflict) = e.downcast_ref::<StatusConflict>() {
            log::warn!("Rejected {} status change: {}", entity, conflict);
            return ApiError::Conflict(conflict.to_string());
        }

        if let Some(diesel_error) = e.downcast_ref::<DieselError>() {
            match diesel_error {
                DieselError::NotFound => return ApiError::NotFound(format!("{} not found", capitalize(entity))),
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    log::warn!("Duplicate {}: {:?}", entity, e);
                    return ApiError::Conflict(format!("{} already exists", capitalize(entity)));
                }
                _ => {}
            }
        }

        log::error!("Database operation on {} failed: {:?}", entity, e);
        ApiError::Internal(format!("Failed to process {entity}. Please try again."))
    }
}

impl From<BlockingError> for ApiError {
    fn from(e: BlockingError) -> Self {
        log::error!("Blocking task failed: {:?}", e);
        ApiError::Internal("Internal server error".to_owned())
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidKey(_) | StorageError::NotFound(_) => ApiError::NotFound("Document not found".to_owned()),
            StorageError::Io(ref io) => {
                log::error!("Document storage failed: {:?}", io);
                ApiError::Internal("Failed to store document. Please try again.".to_owned())
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
