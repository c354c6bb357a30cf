use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::store::StoreError;

/// Failures surfaced by user lookups, listing, creation and seeding.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("user not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("store failure: {0}")]
    Internal(#[from] StoreError),
}

impl UserError {
    pub fn status(&self) -> StatusCode {
        match self {
            UserError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            UserError::NotFound => StatusCode::NOT_FOUND,
            UserError::Conflict(_) => StatusCode::CONFLICT,
            UserError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Store details stay in the logs.
        let message = match &self {
            UserError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        (status, message).into_response()
    }
}
