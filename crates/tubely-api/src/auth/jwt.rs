//! HS256 bearer token validation.
//!
//! Tokens are issued elsewhere; this service only verifies them and reads the
//! requester from `sub`.

use crate::auth::models::JwtClaims;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tubely_core::AppError;

pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify signature and time claims, returning the decoded claims.
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AppError> {
        let token_data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "Token has expired",
                ErrorKind::ImmatureSignature => "Token is not yet valid",
                ErrorKind::InvalidSignature => "Invalid token signature",
                ErrorKind::InvalidAlgorithm => "Invalid token algorithm",
                _ => "Invalid token",
            };
            tracing::debug!(error = %e, "JWT validation failed");
            AppError::Unauthorized(reason.to_string())
        })?;

        Ok(token_data.claims)
    }
}
