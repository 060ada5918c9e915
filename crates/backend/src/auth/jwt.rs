//! Session token creation and validation.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use super::types::{AuthConfig, SessionClaims, SessionToken};

/// Create a new signed session token valid for `session_max_age_secs`.
pub fn create_token(
    config: &AuthConfig,
    token: &SessionToken,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::seconds(config.session_max_age_secs);

    let claims = SessionClaims {
        token: token.clone(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    encode_claims(config, &claims)
}

fn encode_claims(
    config: &AuthConfig,
    claims: &SessionClaims,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate a session token and return its claims.
pub fn validate_token(
    config: &AuthConfig,
    token: &str,
) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}
