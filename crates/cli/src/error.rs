use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use simlog_indexer::IndexerError;
use simlog_pack::PackError;
use simlog_protocol::ErrorEnvelope;
use simlog_tabular::TabularError;
use thiserror::Error;

/// Failure of one HTTP request, already mapped to a status code.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "invalid_request",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Internal(_) => "internal",
        }
    }

    fn hint(&self) -> Option<String> {
        match self {
            Self::Unauthorized(_) => Some(
                "The server was started with an auth token; include Authorization: Bearer <token>."
                    .to_string(),
            ),
            Self::BadRequest(_) => Some(
                "Paths are relative to the data root and may not contain `..` segments."
                    .to_string(),
            ),
            _ => None,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.to_string(),
            code: self.code().to_string(),
            hint: self.hint(),
        }
    }
}

impl From<IndexerError> for ApiError {
    fn from(err: IndexerError) -> Self {
        match err {
            IndexerError::NotFound(_) => Self::NotFound(err.to_string()),
            IndexerError::InvalidPath(_) => Self::BadRequest(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<PackError> for ApiError {
    fn from(err: PackError) -> Self {
        match err {
            PackError::Validation(_) => Self::BadRequest(err.to_string()),
            PackError::Internal(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<TabularError> for ApiError {
    fn from(err: TabularError) -> Self {
        match err {
            TabularError::NotFound(_) => Self::NotFound(err.to_string()),
            TabularError::InvalidLocation(_) => Self::BadRequest(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match status {
            StatusCode::INTERNAL_SERVER_ERROR => log::error!("Request failed: {self}"),
            _ => log::debug!("Request rejected ({status}): {self}"),
        }
        crate::http_api::build_response(status, &self.envelope())
    }
}
