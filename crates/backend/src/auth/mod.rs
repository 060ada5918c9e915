//! Authentication module for credentials sign-in against a backend service.
//!
//! This module provides:
//! - Credential verification against the backend login endpoint
//! - Session token enrichment with profile details fetched once per login
//! - Signed session token creation and validation
//! - `require_auth` middleware for protecting routes

mod authenticator;
mod handlers;
mod jwt;
mod middleware;
pub mod profile;
pub mod types;
pub mod verifier;

pub use authenticator::{project_session, Authenticator, BackendAuthenticator};
pub use handlers::{login, me, session, sign_in, sign_out};
pub use middleware::require_auth;
pub use profile::{HttpProfileLookup, ProfileLookup};
pub use verifier::{CredentialVerifier, HttpLoginBackend, LoginBackend};
