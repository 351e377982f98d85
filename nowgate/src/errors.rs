use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Webhook body was not parseable JSON
    #[error("Invalid JSON")]
    InvalidJson,

    /// Webhook arrived without the signature header
    #[error("Missing signature")]
    MissingSignature,

    /// Webhook signature did not match the payload
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook body parsed but lacks order_id or payment_status
    #[error("Missing required fields")]
    MissingRequiredFields,

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// The payment processor rejected or failed the request
    #[error("Payment cannot be initiated at this time")]
    PaymentUnavailable,

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidJson => StatusCode::BAD_REQUEST,
            Error::MissingSignature => StatusCode::BAD_REQUEST,
            Error::InvalidSignature => StatusCode::UNAUTHORIZED,
            Error::MissingRequiredFields => StatusCode::BAD_REQUEST,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::PaymentUnavailable => StatusCode::BAD_GATEWAY,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::PaymentUnavailable => {
                tracing::warn!("Payment processor error: {}", self);
            }
            Error::InvalidSignature => {
                tracing::warn!("Webhook authentication error: {}", self);
            }
            Error::InvalidJson | Error::MissingSignature | Error::MissingRequiredFields | Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let body = json!({ "error": self.user_message() });

        (status, Json(body)).into_response()
    }
}
