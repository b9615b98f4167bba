use super::model::{AuthenticatedUser, Claims};
use crate::core::error::AppError;
use crate::shared::constants::ROLE_USER;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::time::Duration;
use uuid::Uuid;

/// Verifies bearer tokens issued by the auth service (HS256, shared secret)
pub struct JwtValidator {
    decoding_key: DecodingKey,
    leeway: u64,
}

impl JwtValidator {
    pub fn new(secret: &str, leeway: Duration) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            leeway: leeway.as_secs(),
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let header =
            decode_header(token).map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        if header.alg != Algorithm::HS256 {
            return Err(AppError::Unauthorized(format!(
                "Unsupported algorithm: {:?}. Only HS256 is allowed",
                header.alg
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?
            .claims;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Token subject is not a user id".to_string()))?;

        if claims.email.trim().is_empty() {
            return Err(AppError::Unauthorized("Token carries no email".to_string()));
        }

        Ok(AuthenticatedUser {
            user_id,
            username: claims.username.unwrap_or_else(|| claims.email.clone()),
            email: claims.email,
            role: claims.role.unwrap_or_else(|| ROLE_USER.to_string()),
        })
    }
}
