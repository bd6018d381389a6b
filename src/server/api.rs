//! Axum handlers and the JSON error envelope.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::AppState;
use crate::models::{ImageRequest, ImageResponse, MnemonicRequest, MnemonicResponse};
use crate::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    MethodNotAllowed,
    MnemonicFailed,
    ImageFailed,
}

impl ErrorCode {
    fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::MnemonicFailed | ErrorCode::ImageFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Map a service error onto the taxonomy, with `failed` for anything
    /// that is not a validation problem.
    fn from_service(err: Error, failed: ErrorCode) -> Self {
        match err {
            Error::Validation(message) => Self::new(ErrorCode::ValidationError, message),
            other => {
                error!("{:?}: {}", failed, other);
                Self::new(failed, other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: Some(self.message),
            },
        };
        (self.code.status(), Json(body)).into_response()
    }
}

/// POST /api/generate-mnemonic
pub(super) async fn generate_mnemonic(
    State(state): State<AppState>,
    body: Result<Json<MnemonicRequest>, JsonRejection>,
) -> Result<Json<MnemonicResponse>, ApiError> {
    let Json(req) = body.map_err(|e| {
        warn!("rejected mnemonic request body: {e}");
        ApiError::new(ErrorCode::ValidationError, "Invalid word")
    })?;

    let candidates = state
        .mnemonic
        .generate(&req.word)
        .await
        .map_err(|e| ApiError::from_service(e, ErrorCode::MnemonicFailed))?;

    Ok(Json(MnemonicResponse { candidates }))
}

/// POST /api/generate-image
pub(super) async fn generate_image(
    State(state): State<AppState>,
    body: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<ImageResponse>, ApiError> {
    let Json(req) = body.map_err(|e| {
        warn!("rejected image request body: {e}");
        ApiError::new(ErrorCode::ValidationError, "Invalid body")
    })?;

    let image = state
        .illustration
        .generate(&req.mnemonic, &req.scene)
        .await
        .map_err(|e| ApiError::from_service(e, ErrorCode::ImageFailed))?;

    Ok(Json(ImageResponse {
        image_url: image.to_image_url(),
    }))
}

pub(super) async fn method_not_allowed() -> ApiError {
    ApiError::new(ErrorCode::MethodNotAllowed, "POST only")
}
