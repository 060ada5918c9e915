//! Auth-related types and configuration.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

// Re-export shared types for convenience
pub use shared_types::{
    AuthenticatedIdentity, Credentials, ProfileDetails, PublicSession, SessionUser,
};

/// Lifetime of both the session token and its cookie.
pub const DEFAULT_SESSION_MAX_AGE_SECS: i64 = 3600;

/// Session state carried between requests inside the signed token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(flatten)]
    pub token: SessionToken,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Auth configuration, built once at startup and handed to the authenticator.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub server_url: String,
    pub profile_path: String,
    pub session_max_age_secs: i64,
    pub cookie_name: String,
    pub sign_in_path: String,
    pub request_timeout_secs: u64,
    pub secure_cookies: bool,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>, server_url: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            server_url: server_url.into().trim_end_matches('/').to_string(),
            profile_path: "/userDetails.json".to_string(),
            session_max_age_secs: DEFAULT_SESSION_MAX_AGE_SECS,
            cookie_name: "session_token".to_string(),
            sign_in_path: "/login".to_string(),
            request_timeout_secs: 10,
            secure_cookies: false,
        }
    }

    /// Load auth configuration from environment variables.
    ///
    /// Required env vars:
    /// - `SESSION_SECRET` (or `NEXTAUTH_SECRET`): Secret key for signing session tokens
    /// - `SERVER_URL`: Base URL of the backend login service
    ///
    /// Optional: `PROFILE_PATH`, `SESSION_MAX_AGE`, `SESSION_COOKIE_NAME`,
    /// `SIGN_IN_PATH`, `BACKEND_TIMEOUT_SECS`, `RUST_ENV`.
    pub fn from_env() -> Result<Self, ApiError> {
        let secret = std::env::var("SESSION_SECRET")
            .or_else(|_| std::env::var("NEXTAUTH_SECRET"))
            .map_err(|_| ApiError::missing_env("SESSION_SECRET"))?;
        if secret.trim().is_empty() {
            return Err(ApiError::Config("SESSION_SECRET cannot be empty".to_string()));
        }

        let server_url =
            std::env::var("SERVER_URL").map_err(|_| ApiError::missing_env("SERVER_URL"))?;

        let mut config = Self::new(secret, server_url);

        if let Ok(path) = std::env::var("PROFILE_PATH") {
            config.profile_path = path;
        }
        if let Ok(name) = std::env::var("SESSION_COOKIE_NAME") {
            config.cookie_name = name;
        }
        if let Ok(path) = std::env::var("SIGN_IN_PATH") {
            config.sign_in_path = path;
        }
        if let Some(secs) = parse_env("SESSION_MAX_AGE")? {
            config.session_max_age_secs = secs;
        }
        if let Some(secs) = parse_env("BACKEND_TIMEOUT_SECS")? {
            config.request_timeout_secs = secs;
        }
        config.secure_cookies = std::env::var("RUST_ENV").unwrap_or_default() == "production";

        Ok(config)
    }

    pub fn login_url(&self) -> String {
        format!("{}/login.json", self.server_url)
    }

    pub fn profile_url(&self) -> String {
        format!("{}{}", self.server_url, self.profile_path)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(var: &str) -> Result<Option<T>, ApiError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ApiError::Config(format!("{} must be a number, got {:?}", var, raw))),
        Err(_) => Ok(None),
    }
}
