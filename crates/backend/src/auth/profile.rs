//! Profile lookup used to enrich a freshly issued session token.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use super::types::{AuthConfig, ProfileDetails};

#[async_trait]
pub trait ProfileLookup: Send + Sync {
    /// Fetch profile details for a logged-in user.
    ///
    /// `Ok(None)` means the backend has no profile for this user.
    async fn get_profile(&self, id: &str, session_id: &str) -> Result<Option<ProfileDetails>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRequest<'a> {
    id: &'a str,
    session_id: &'a str,
}

/// Fetches profile details from the backend's user details endpoint.
pub struct HttpProfileLookup {
    client: reqwest::Client,
    url: String,
}

impl HttpProfileLookup {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build profile lookup client")?;

        Ok(Self {
            client,
            url: config.profile_url(),
        })
    }
}

#[async_trait]
impl ProfileLookup for HttpProfileLookup {
    async fn get_profile(&self, id: &str, session_id: &str) -> Result<Option<ProfileDetails>> {
        let response = self
            .client
            .post(&self.url)
            .json(&ProfileRequest { id, session_id })
            .send()
            .await
            .context("Profile request failed")?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!("No profile found for user {}", id);
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Profile lookup returned {}: {}", status, body);
        }

        response
            .json::<Option<ProfileDetails>>()
            .await
            .context("Invalid profile response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn lookup_against(server: &MockServer) -> HttpProfileLookup {
        HttpProfileLookup::new(&AuthConfig::new("secret", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn returns_profile_on_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/userDetails.json"))
            .and(body_json(json!({"id": "1", "sessionId": "s1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fullname": "A",
                "email": "a@x.com",
                "role": "admin"
            })))
            .mount(&server)
            .await;

        let profile = lookup_against(&server)
            .await
            .get_profile("1", "s1")
            .await
            .unwrap();

        assert_eq!(
            profile,
            Some(ProfileDetails {
                fullname: Some("A".into()),
                email: Some("a@x.com".into()),
                role: Some("admin".into()),
            })
        );
    }

    #[tokio::test]
    async fn null_body_and_not_found_mean_no_profile() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_json(json!({"id": "1", "sessionId": "s1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Null))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_json(json!({"id": "2", "sessionId": "s2"})))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let lookup = lookup_against(&server).await;
        assert_eq!(lookup.get_profile("1", "s1").await.unwrap(), None);
        assert_eq!(lookup.get_profile("2", "s2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = lookup_against(&server)
            .await
            .get_profile("1", "s1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
