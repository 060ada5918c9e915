//! Credentials sign-in gateway.
//!
//! Verifies username/password pairs against a backend login service, issues a
//! signed session cookie enriched with profile details, and exposes the
//! derived public session to client code.

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub mod auth;
pub mod error;

use auth::types::AuthConfig;
use auth::Authenticator;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub auth_config: Arc<AuthConfig>,
    pub authenticator: Arc<dyn Authenticator>,
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/me", get(auth::me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/callback/credentials", post(auth::sign_in))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/session", get(auth::session))
        .route("/api/auth/signout", post(auth::sign_out))
        .merge(protected)
        .with_state(state)
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}
