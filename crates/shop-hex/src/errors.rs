use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use shop_types::envelope::Envelope;
use shop_types::ports::store::StoreError;

/// Application error taxonomy. Business failures carry a machine-readable
/// code surfaced in the response envelope; anything unexpected collapses to
/// `Internal` and a generic 500.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    Validation { code: &'static str, message: String },

    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { code, .. }
            | Self::NotFound { code, .. }
            | Self::Conflict { code, .. } => code,
            Self::Internal(_) => "system_error",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VariantNotFound(id) => {
                Self::not_found("variant_not_found", format!("product item {id} not found"))
            }
            StoreError::InsufficientStock {
                id,
                requested,
                available,
            } => Self::conflict(
                "insufficient_stock",
                format!(
                    "product item {id}: requested {requested}, only {available} in stock"
                ),
            ),
            StoreError::ConversationNotFound(id) => Self::not_found(
                "conversation_not_found",
                format!("conversation {id} not found"),
            ),
            StoreError::Db(msg) => Self::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Coarse status mapping: business failure -> 400, missing entity ->
        // 404, everything else -> 500 with a generic message.
        let (status, message) = match &self {
            AppError::Validation { message, .. } | AppError::Conflict { message, .. } => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            AppError::NotFound { message, .. } => (StatusCode::NOT_FOUND, message.clone()),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "unhandled error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
            }
        };

        let body = Envelope::<()>::error(self.code(), message);
        let json = serde_json::to_string(&body)
            .unwrap_or_else(|_| "{\"code\":\"system_error\",\"message\":\"internal serialization\",\"data\":null}".into());
        (status, [("content-type", "application/json")], json).into_response()
    }
}
