use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use super::dto::ErrorBody;
use crate::{control::ConfigError, store::StoreError};

/// Every failed request renders as `{"success": false, "message": ...}`.
#[derive(Debug)]
pub enum AppError {
    /// Unparsable body or out-of-domain value.
    BadRequest(String),
    /// Store failure or missing server-side configuration.
    Internal(String),
    /// The remote board could not be reached or answered with an error.
    BadGateway(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn into_message(self) -> String {
        match self {
            AppError::BadRequest(m) | AppError::Internal(m) | AppError::BadGateway(m) => m,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorBody {
            success: false,
            message: self.into_message(),
        });
        (status, body).into_response()
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        warn!(error = %e, "Rejected query string");
        Self::BadRequest("Invalid query string".to_owned())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        error!(error = %e, "Device store failure");
        Self::Internal(e.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidAlarmOverride => Self::BadRequest(e.to_string()),
            ConfigError::Store(e) => e.into(),
        }
    }
}
