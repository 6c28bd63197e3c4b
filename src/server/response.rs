use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::error_translation::ErrorTranslator;
use crate::security::ValidationError;

/// JSON error body returned for every handled failure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Gateway failure on its way to the client
///
/// Forbidden maps to 403; everything else the client sees as 500 with the
/// message intact.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(GatewayError::Validation(err))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let translated = ErrorTranslator::translate_gateway_error(&self.0);
        ErrorBody {
            error: self.0.to_string(),
            kind: self.0.kind().to_string(),
            retryable: self.0.is_retryable(),
            hint: translated.suggestion,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(status = status.as_u16(), kind = self.0.kind(), "request failed");
        (status, Json(self.body())).into_response()
    }
}
