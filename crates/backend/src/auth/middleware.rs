//! Session middleware: reads, refreshes, and enforces the session cookie.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::AppState;

use super::authenticator::project_session;
use super::jwt;
use super::types::{AuthConfig, SessionToken};

/// Middleware function that requires an authenticated session.
///
/// This can be used with `axum::middleware::from_fn_with_state` to protect routes.
/// Unauthenticated requests are redirected to the sign-in path. Authenticated
/// requests get the `PublicSession` as an extension and a re-issued cookie on
/// the response.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let config = &state.auth_config;

    let token = match load_session(request.headers(), config) {
        Some(token) => token,
        None => {
            let callback = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| "/".to_string());
            return Redirect::to(&sign_in_redirect(config, &callback)).into_response();
        }
    };

    let token = state.authenticator.enrich_token(token, None).await;

    request.extensions_mut().insert(project_session(&token));

    let response = next.run(request).await;
    with_refreshed_cookie(response, config, &token)
}

/// Decode the session token carried by the request, if any and valid.
pub fn load_session(headers: &HeaderMap, config: &AuthConfig) -> Option<SessionToken> {
    let raw = extract_token_from_cookie(headers, &config.cookie_name)
        .or_else(|| extract_token_from_header(headers))?;

    match jwt::validate_token(config, &raw) {
        Ok(claims) => Some(claims.token),
        Err(e) => {
            tracing::debug!("Rejected session token: {}", e);
            None
        }
    }
}

/// Re-issue the session token with a fresh expiry and attach it to `response`.
pub fn with_refreshed_cookie(
    response: Response,
    config: &AuthConfig,
    token: &SessionToken,
) -> Response {
    let new_token = match jwt::create_token(config, token) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to refresh session token: {}", e);
            return response;
        }
    };

    let cookie = build_auth_cookie(config, &new_token);
    let (mut parts, body) = response.into_parts();
    if let Ok(cookie_value) = cookie.parse() {
        parts.headers.append(header::SET_COOKIE, cookie_value);
    }
    Response::from_parts(parts, body)
}

fn extract_token_from_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = cookie_header.to_str() else {
            continue;
        };
        for cookie_str in cookie_header.split(';') {
            if let Ok(cookie) = cookie::Cookie::parse(cookie_str.trim()) {
                if cookie.name() == cookie_name {
                    return Some(cookie.value().to_string());
                }
            }
        }
    }

    None
}

fn extract_token_from_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|s| s.to_string())
}

/// Build a session cookie string.
pub fn build_auth_cookie(config: &AuthConfig, value: &str) -> String {
    cookie_string(config, value, config.session_max_age_secs)
}

/// Build a cookie string that removes the session cookie.
pub fn build_clear_cookie(config: &AuthConfig) -> String {
    cookie_string(config, "", 0)
}

fn cookie_string(config: &AuthConfig, value: &str, max_age: i64) -> String {
    let secure = if config.secure_cookies { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        config.cookie_name, value, max_age, secure
    )
}

/// Sign-in URL carrying the page the user asked for.
pub fn sign_in_redirect(config: &AuthConfig, callback: &str) -> String {
    format!(
        "{}?callbackUrl={}",
        config.sign_in_path,
        urlencoding::encode(callback)
    )
}
