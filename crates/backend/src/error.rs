//! Unified error handling for the gateway.
//!
//! `AuthError` is the taxonomy of sign-in failures produced by the credential
//! verifier. `ApiError` is the handler-facing error that implements
//! `IntoResponse`, allowing handlers to use `?` naturally while returning
//! appropriate HTTP status codes and error messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failure raised while verifying a username/password pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// One or both credential fields were absent or empty
    #[error("Enter Username and Password")]
    MissingCredentials,

    /// The backend rejected the username
    #[error("Please provide correct username value")]
    InvalidUsername,

    /// The backend rejected the password
    #[error("Please provide correct password value")]
    InvalidPassword,

    /// Network or decode failure talking to the login endpoint
    #[error("{0}")]
    Transport(String),
}

impl AuthError {
    /// True for client-side validation failures raised before any network call.
    pub fn is_input_error(&self) -> bool {
        matches!(self, AuthError::MissingCredentials)
    }
}

/// Unified error type for API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Generic anyhow error
    #[error("{0}")]
    Internal(#[from] anyhow::Error),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Environment variable missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication required but not provided or invalid
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Sign-in failed
    #[error("{0}")]
    Auth(#[from] AuthError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    /// Create a config error for missing env vars
    pub fn missing_env(var_name: &str) -> Self {
        ApiError::Config(format!("{} environment variable must be set", var_name))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some(e.to_string()),
                )
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            ApiError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server configuration error".to_string(),
                    None,
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            ApiError::Auth(e) => match e {
                AuthError::MissingCredentials => (StatusCode::BAD_REQUEST, e.to_string(), None),
                AuthError::InvalidUsername | AuthError::InvalidPassword => {
                    (StatusCode::UNAUTHORIZED, e.to_string(), None)
                }
                AuthError::Transport(msg) => {
                    tracing::error!("Login backend unreachable: {}", msg);
                    (
                        StatusCode::BAD_GATEWAY,
                        "Login service unavailable".to_string(),
                        Some(msg.clone()),
                    )
                }
            },
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
