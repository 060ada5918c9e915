//! Credential verification against the backend login endpoint.
//!
//! The verifier validates the submitted pair locally, posts it to
//! `{SERVER_URL}/login.json` once, and classifies the reply. No retries are
//! attempted: a failed call surfaces immediately as an [`AuthError`].

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::AuthError;

use super::types::{AuthConfig, AuthenticatedIdentity, Credentials};

/// JSON body posted to the login endpoint
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Status and decoded body of a login call.
#[derive(Debug, Clone)]
pub struct LoginReply {
    /// True for a 2xx status
    pub ok: bool,
    pub body: Value,
}

/// Failure to obtain a [`LoginReply`] at all.
#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),

    /// A bare message with no error type behind it
    #[error("{0}")]
    Message(String),
}

impl From<TransportFailure> for AuthError {
    fn from(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::Message(msg) => AuthError::Transport(msg.to_uppercase()),
            // The URL names an internal host; it must not reach the sign-in page.
            TransportFailure::Http(e) => AuthError::Transport(error_chain(&e.without_url())),
            TransportFailure::Other(e) => AuthError::Transport(error_chain(&*e)),
        }
    }
}

/// Render an error followed by each of its sources.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait]
pub trait LoginBackend: Send + Sync {
    async fn submit(&self, request: &LoginRequest) -> Result<LoginReply, TransportFailure>;
}

/// Posts credentials to the configured login endpoint over HTTP.
pub struct HttpLoginBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpLoginBackend {
    pub fn new(config: &AuthConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            url: config.login_url(),
        })
    }
}

#[async_trait]
impl LoginBackend for HttpLoginBackend {
    async fn submit(&self, request: &LoginRequest) -> Result<LoginReply, TransportFailure> {
        let response = self.client.post(&self.url).json(request).send().await?;
        let ok = response.status().is_success();
        let body = response.json::<Value>().await?;

        Ok(LoginReply { ok, body })
    }
}

pub struct CredentialVerifier {
    backend: Box<dyn LoginBackend>,
}

impl CredentialVerifier {
    pub fn new(backend: impl LoginBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Verify a username/password pair.
    ///
    /// Returns `Ok(None)` when the backend rejects the pair without a
    /// recognised reason; callers treat that as generic invalid credentials.
    pub async fn verify(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<AuthenticatedIdentity>, AuthError> {
        let (username, password) = match (
            non_empty(&credentials.username),
            non_empty(&credentials.password),
        ) {
            (Some(username), Some(password)) => (username, password),
            _ => return Err(AuthError::MissingCredentials),
        };

        tracing::info!("Login attempt for: {}", username);

        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let reply = self.backend.submit(&request).await.map_err(|e| {
            tracing::error!("Login request failed: {}", e);
            AuthError::from(e)
        })?;

        classify_reply(reply)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

fn classify_reply(reply: LoginReply) -> Result<Option<AuthenticatedIdentity>, AuthError> {
    if reply.ok && is_truthy(&reply.body) {
        return Ok(Some(AuthenticatedIdentity::new(reply.body)));
    }

    match reply.body.get("messageId").and_then(Value::as_str) {
        Some(message_id) if message_id.contains("usernameError") => {
            tracing::warn!("Login rejected: {}", message_id);
            Err(AuthError::InvalidUsername)
        }
        Some(message_id) if message_id.contains("invalidPasswordError") => {
            tracing::warn!("Login rejected: {}", message_id);
            Err(AuthError::InvalidPassword)
        }
        Some(message_id) => {
            tracing::warn!("Login rejected: {}", message_id);
            Ok(None)
        }
        None if reply.ok => {
            tracing::warn!("Login endpoint returned an empty identity");
            Ok(None)
        }
        None => {
            tracing::warn!("Login rejected without a messageId: {}", reply.body);
            Ok(None)
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Replies with a canned result and counts calls.
    struct StubBackend {
        reply: fn() -> Result<LoginReply, TransportFailure>,
        calls: Arc<AtomicUsize>,
    }

    impl StubBackend {
        fn new(reply: fn() -> Result<LoginReply, TransportFailure>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    reply,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl LoginBackend for StubBackend {
        async fn submit(&self, _request: &LoginRequest) -> Result<LoginReply, TransportFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)()
        }
    }

    fn rejected(body: Value) -> Result<LoginReply, TransportFailure> {
        Ok(LoginReply { ok: false, body })
    }

    async fn verify_with(
        reply: fn() -> Result<LoginReply, TransportFailure>,
    ) -> Result<Option<AuthenticatedIdentity>, AuthError> {
        let (backend, _) = StubBackend::new(reply);
        CredentialVerifier::new(backend)
            .verify(&Credentials::new("tenant", "secret"))
            .await
    }

    #[tokio::test]
    async fn missing_fields_fail_before_any_call() {
        let cases = [
            Credentials::default(),
            Credentials {
                username: Some("tenant".into()),
                password: None,
            },
            Credentials {
                username: None,
                password: Some("secret".into()),
            },
            Credentials::new("", "secret"),
            Credentials::new("tenant", ""),
        ];

        for credentials in cases {
            let (backend, calls) = StubBackend::new(|| {
                Ok(LoginReply {
                    ok: true,
                    body: json!({"id": "1"}),
                })
            });
            let err = CredentialVerifier::new(backend)
                .verify(&credentials)
                .await
                .unwrap_err();
            assert_eq!(err, AuthError::MissingCredentials);
            assert!(err.is_input_error());
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn ok_reply_returns_body_unchanged() {
        let identity = verify_with(|| {
            Ok(LoginReply {
                ok: true,
                body: json!({"id": "1", "message": "abc"}),
            })
        })
        .await
        .unwrap()
        .expect("identity");

        assert_eq!(
            serde_json::to_value(&identity).unwrap(),
            json!({"id": "1", "message": "abc"})
        );
    }

    #[tokio::test]
    async fn ok_reply_with_null_body_is_empty_result() {
        let result = verify_with(|| {
            Ok(LoginReply {
                ok: true,
                body: Value::Null,
            })
        })
        .await;
        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn ok_reply_body_is_not_shape_checked() {
        let bodies: [fn() -> Result<LoginReply, TransportFailure>; 4] = [
            || {
                Ok(LoginReply {
                    ok: true,
                    body: json!({"id": "1", "message": 123}),
                })
            },
            || {
                Ok(LoginReply {
                    ok: true,
                    body: json!({"id": {"uid": 1}, "message": "s1"}),
                })
            },
            || {
                Ok(LoginReply {
                    ok: true,
                    body: json!({"id": 42, "message": "s1"}),
                })
            },
            || {
                Ok(LoginReply {
                    ok: true,
                    body: json!("welcome"),
                })
            },
        ];

        for reply in bodies {
            let expected = reply().unwrap().body;
            let identity = verify_with(reply)
                .await
                .unwrap()
                .expect("identity");
            assert_eq!(
                serde_json::to_string(&identity).unwrap(),
                expected.to_string()
            );
        }
    }

    #[tokio::test]
    async fn username_error_classifier() {
        let result = verify_with(|| rejected(json!({"messageId": "usernameError-x"}))).await;
        assert_eq!(result, Err(AuthError::InvalidUsername));
    }

    #[tokio::test]
    async fn password_error_classifier() {
        let result = verify_with(|| rejected(json!({"messageId": "invalidPasswordError-y"}))).await;
        assert_eq!(result, Err(AuthError::InvalidPassword));
    }

    #[tokio::test]
    async fn unrelated_classifier_is_empty_result() {
        let result = verify_with(|| rejected(json!({"messageId": "accountLocked"}))).await;
        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn rejection_without_classifier_is_empty_result() {
        let result = verify_with(|| rejected(json!({"error": "nope"}))).await;
        assert_eq!(result, Ok(None));

        let result = verify_with(|| rejected(json!({"messageId": 17}))).await;
        assert_eq!(result, Ok(None));

        let result = verify_with(|| rejected(Value::Null)).await;
        assert_eq!(result, Ok(None));

        let result = verify_with(|| rejected(json!(["usernameError"]))).await;
        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn transport_error_message_is_forwarded() {
        let result = verify_with(|| {
            Err(TransportFailure::Other(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "timeout",
            ))))
        })
        .await;
        assert_eq!(result, Err(AuthError::Transport("timeout".to_string())));
    }

    #[tokio::test]
    async fn bare_transport_message_is_uppercased() {
        let result = verify_with(|| Err(TransportFailure::Message("timeout".to_string()))).await;
        assert_eq!(result, Err(AuthError::Transport("TIMEOUT".to_string())));
    }

    #[tokio::test]
    async fn http_backend_posts_json_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login.json"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"username": "tenant", "password": "secret"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "7", "message": "sess"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = AuthConfig::new("secret", server.uri());
        let verifier = CredentialVerifier::new(HttpLoginBackend::new(&config).unwrap());
        let identity = verifier
            .verify(&Credentials::new("tenant", "secret"))
            .await
            .unwrap()
            .expect("identity");

        assert_eq!(identity.id().as_deref(), Some("7"));
        assert_eq!(identity.message(), Some("sess"));
    }

    #[tokio::test]
    async fn http_backend_classifies_rejection() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login.json"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"messageId": "auth.usernameError.unknown"})),
            )
            .mount(&server)
            .await;

        let config = AuthConfig::new("secret", server.uri());
        let verifier = CredentialVerifier::new(HttpLoginBackend::new(&config).unwrap());
        let result = verifier.verify(&Credentials::new("ghost", "secret")).await;

        assert_eq!(result, Err(AuthError::InvalidUsername));
    }

    #[tokio::test]
    async fn http_backend_non_json_body_is_transport_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login.json"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let config = AuthConfig::new("secret", server.uri());
        let verifier = CredentialVerifier::new(HttpLoginBackend::new(&config).unwrap());
        let result = verifier.verify(&Credentials::new("tenant", "secret")).await;

        let Err(AuthError::Transport(message)) = &result else {
            panic!("expected transport error, got {:?}", result);
        };
        assert!(message.contains("expected value"), "{}", message);
        assert!(!message.contains(server.uri().as_str()), "{}", message);
    }
}
