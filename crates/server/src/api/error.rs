//! Mapping of workflow errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use racdesk_core::{DeliveryError, ReportError, RepositoryError};

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {}", self.message);
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        let status = match &e {
            RepositoryError::NotFound(_) => StatusCode::NOT_FOUND,
            RepositoryError::InvalidTransition { .. } | RepositoryError::DuplicateIdentifier(_) => {
                StatusCode::CONFLICT
            }
            RepositoryError::InvalidUpdate(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RepositoryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::TicketNotFound(_) => Self::not_found(e.to_string()),
            ReportError::TicketNotResolved { .. } => Self::new(StatusCode::CONFLICT, e.to_string()),
            ReportError::Repository(inner) => inner.into(),
            other => Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

impl From<DeliveryError> for ApiError {
    fn from(e: DeliveryError) -> Self {
        match e {
            DeliveryError::ReportNotFound(_) => Self::not_found(e.to_string()),
            DeliveryError::ArtifactMissing { .. } => Self::new(StatusCode::CONFLICT, e.to_string()),
            DeliveryError::Repository(inner) => inner.into(),
            DeliveryError::Artifact(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        }
    }
}
