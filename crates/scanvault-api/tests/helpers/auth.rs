use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use scanvault_api::auth::SessionClaims;

/// Shared secret for session tokens (must match `test_config`).
pub const TEST_JWT_SECRET: &str = "test-session-secret-at-least-32-characters";

/// Mint an HS256 session token for `email`, valid for an hour.
pub fn bearer_token(email: &str) -> String {
    sign(SessionClaims {
        sub: format!("user_{}", email),
        email: Some(email.to_string()),
        name: None,
        exp: Utc::now().timestamp() + 3600,
        iat: Some(Utc::now().timestamp()),
    })
}

pub fn expired_token(email: &str) -> String {
    sign(SessionClaims {
        sub: format!("user_{}", email),
        email: Some(email.to_string()),
        name: None,
        exp: Utc::now().timestamp() - 60,
        iat: Some(Utc::now().timestamp() - 3660),
    })
}

pub fn sign(claims: SessionClaims) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("encode token")
}
