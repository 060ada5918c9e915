//! The authenticator the session layer calls into.
//!
//! This module provides:
//! - The `Authenticator` trait (credential verification and token enrichment)
//! - `BackendAuthenticator`, backed by the remote login and profile endpoints
//! - `project_session`, deriving the public session view from a token

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use crate::error::AuthError;

use super::profile::{HttpProfileLookup, ProfileLookup};
use super::types::{
    AuthConfig, AuthenticatedIdentity, Credentials, PublicSession, SessionToken, SessionUser,
};
use super::verifier::{CredentialVerifier, HttpLoginBackend};

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Check a username/password pair. `Ok(None)` is a generic rejection.
    async fn verify_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<AuthenticatedIdentity>, AuthError>;

    /// Project identity fields into the session token.
    ///
    /// `identity` is only present on the login that created the token; on
    /// refresh the token is carried forward as is.
    async fn enrich_token(
        &self,
        token: SessionToken,
        identity: Option<&AuthenticatedIdentity>,
    ) -> SessionToken;
}

pub struct BackendAuthenticator {
    verifier: CredentialVerifier,
    profiles: Arc<dyn ProfileLookup>,
}

impl BackendAuthenticator {
    pub fn new(verifier: CredentialVerifier, profiles: Arc<dyn ProfileLookup>) -> Self {
        Self { verifier, profiles }
    }

    /// Build an authenticator talking HTTP to `config.server_url`.
    pub fn from_config(config: &AuthConfig) -> anyhow::Result<Self> {
        let backend =
            HttpLoginBackend::new(config).context("Failed to build login backend client")?;
        let profiles = HttpProfileLookup::new(config)?;

        Ok(Self::new(
            CredentialVerifier::new(backend),
            Arc::new(profiles),
        ))
    }

    async fn enrich_on_login(
        &self,
        mut token: SessionToken,
        identity: &AuthenticatedIdentity,
    ) -> SessionToken {
        token.id = identity.id();
        token.session_id = identity.message().map(str::to_string);

        let (Some(id), Some(session_id)) = (non_empty(&token.id), non_empty(&token.session_id))
        else {
            return token;
        };
        let (id, session_id) = (id.to_string(), session_id.to_string());

        match self.profiles.get_profile(&id, &session_id).await {
            Ok(Some(profile)) => {
                token.fullname = profile.fullname;
                token.email = profile.email;
                token.role = profile.role;
            }
            Ok(None) => {
                tracing::info!("No profile details for user {}", id);
            }
            Err(e) => {
                tracing::warn!("Profile lookup failed for user {}: {:?}", id, e);
            }
        }

        token
    }
}

#[async_trait]
impl Authenticator for BackendAuthenticator {
    async fn verify_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<AuthenticatedIdentity>, AuthError> {
        self.verifier.verify(credentials).await
    }

    async fn enrich_token(
        &self,
        token: SessionToken,
        identity: Option<&AuthenticatedIdentity>,
    ) -> SessionToken {
        match identity {
            Some(identity) => self.enrich_on_login(token, identity).await,
            None => token,
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Derive the client-facing session from a token.
pub fn project_session(token: &SessionToken) -> PublicSession {
    PublicSession {
        user: SessionUser {
            id: token.id.clone(),
            session_id: token.session_id.clone(),
            fullname: token.fullname.clone(),
            email: token.email.clone(),
            role: token.role.clone(),
        },
    }
}
