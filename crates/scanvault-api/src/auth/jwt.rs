//! HS256 session token verification.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use scanvault_core::AppError;

use super::models::{SessionClaims, SessionUser};

#[derive(Clone)]
pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify `token` and return the session it identifies.
    pub fn validate_token(&self, token: &str) -> Result<SessionUser, AppError> {
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!("JWT validation failed: {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        AppError::Unauthorized("Token has expired".to_string())
                    }
                    ErrorKind::InvalidSignature => {
                        AppError::Unauthorized("Invalid token signature".to_string())
                    }
                    ErrorKind::ImmatureSignature => {
                        AppError::Unauthorized("Token is not yet valid (nbf)".to_string())
                    }
                    _ => AppError::Unauthorized(format!("Invalid or expired token: {}", e)),
                }
            })?;

        let claims = token_data.claims;
        let email = claims
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Email is required".to_string()))?;

        Ok(SessionUser {
            subject: claims.sub,
            email,
            name: claims.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-key-min-32-characters-long";

    fn token(email: Option<&str>, exp_offset: i64) -> String {
        let claims = SessionClaims {
            sub: "user-1".to_string(),
            email: email.map(str::to_string),
            name: None,
            exp: chrono::Utc::now().timestamp() + exp_offset,
            iat: None,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_yields_normalized_email() {
        let user = JwtValidator::new(SECRET)
            .validate_token(&token(Some("Alice@Example.com"), 3600))
            .unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.subject, "user-1");
    }

    #[test]
    fn test_expired_token_rejected() {
        let err = JwtValidator::new(SECRET)
            .validate_token(&token(Some("a@b.c"), -3600))
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Token has expired"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let err = JwtValidator::new("another-secret-key-that-is-32-chars-long")
            .validate_token(&token(Some("a@b.c"), 3600))
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_token_without_email_rejected() {
        let err = JwtValidator::new(SECRET)
            .validate_token(&token(None, 3600))
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Email is required"));
    }
}
