//! Authentication HTTP handlers.

use axum::{
    extract::{FromRequest, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::authenticator::project_session;
use super::jwt;
use super::middleware::{
    build_auth_cookie, build_clear_cookie, load_session, with_refreshed_cookie,
};
use super::types::{AuthConfig, Credentials, PublicSession, SessionToken};

/// Error code used when the backend rejects credentials without a reason.
pub const CREDENTIALS_SIGNIN: &str = "CredentialsSignin";

/// Sign-in form submission.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInForm {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl SignInForm {
    fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// Verify credentials and mint a session token for a successful login.
///
/// `Ok(None)` means the backend rejected the credentials without a reason.
async fn issue_session(
    state: &AppState,
    credentials: &Credentials,
) -> ApiResult<Option<(SessionToken, String)>> {
    let identity = match state.authenticator.verify_credentials(credentials).await {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            tracing::warn!("Sign-in rejected: invalid credentials");
            return Ok(None);
        }
        Err(e) => {
            if e.is_input_error() {
                tracing::info!("Sign-in form incomplete");
            } else {
                tracing::warn!("Sign-in failed: {}", e);
            }
            return Err(e.into());
        }
    };

    let token = state
        .authenticator
        .enrich_token(SessionToken::default(), Some(&identity))
        .await;

    let raw = jwt::create_token(&state.auth_config, &token)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to create token: {}", e)))?;

    tracing::info!(
        "Successful sign-in for user {}",
        token.id.as_deref().unwrap_or("<unknown>")
    );

    Ok(Some((token, raw)))
}

/// Handle a credentials sign-in from the sign-in form.
///
/// Sets the session cookie and redirects to the callback URL. Sign-in
/// failures redirect back to the sign-in page with the reason in `?error=`.
pub async fn sign_in(State(state): State<AppState>, request: Request) -> ApiResult<Response> {
    let form = read_sign_in_form(request).await?;
    let config = &state.auth_config;

    let raw = match issue_session(&state, &form.credentials()).await {
        Ok(Some((_, raw))) => raw,
        Ok(None) => {
            return Ok(Redirect::to(&error_redirect(config, CREDENTIALS_SIGNIN)).into_response());
        }
        Err(ApiError::Auth(e)) => {
            return Ok(Redirect::to(&error_redirect(config, &e.to_string())).into_response());
        }
        Err(e) => return Err(e),
    };

    let cookie = build_auth_cookie(config, &raw);
    let location = safe_callback(form.callback_url.as_deref());
    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, location.as_str()),
            (header::SET_COOKIE, cookie.as_str()),
        ],
    )
        .into_response())
}

/// JSON sign-in for API clients.
///
/// Returns the public session with the session cookie set; failures are
/// reported as JSON errors instead of redirects.
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Response> {
    let (token, raw) = issue_session(&state, &credentials)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(CREDENTIALS_SIGNIN.to_string()))?;

    let cookie = build_auth_cookie(&state.auth_config, &raw);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(project_session(&token)),
    )
        .into_response())
}

async fn read_sign_in_form(request: Request) -> ApiResult<SignInForm> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if is_json {
        let Json(form) = Json::<SignInForm>::from_request(request, &())
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(form)
    } else {
        let Form(form) = Form::<SignInForm>::from_request(request, &())
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(form)
    }
}

fn error_redirect(config: &AuthConfig, error: &str) -> String {
    format!(
        "{}?error={}",
        config.sign_in_path,
        urlencoding::encode(error)
    )
}

/// Only same-site relative paths are accepted as post-login targets.
fn safe_callback(callback: Option<&str>) -> String {
    match callback {
        Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.contains('\\') => {
            url.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Get the current session.
///
/// Returns the public session and a refreshed cookie, or `{}` when there is
/// no valid session.
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let config = &state.auth_config;

    match load_session(&headers, config) {
        Some(token) => {
            let token = state.authenticator.enrich_token(token, None).await;
            let response = Json(project_session(&token)).into_response();
            with_refreshed_cookie(response, config, &token)
        }
        None => Json(json!({})).into_response(),
    }
}

/// Sign out - clear the session cookie.
pub async fn sign_out(State(state): State<AppState>) -> impl IntoResponse {
    let config = &state.auth_config;
    let cookie = build_clear_cookie(config);

    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, config.sign_in_path.clone()),
            (header::SET_COOKIE, cookie),
        ],
    )
}

/// Session of the authenticated caller. Mounted behind `require_auth`.
pub async fn me(Extension(session): Extension<PublicSession>) -> Json<PublicSession> {
    Json(session)
}
