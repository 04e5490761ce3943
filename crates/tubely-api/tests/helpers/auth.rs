use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tubely_api::auth::JwtClaims;
use uuid::Uuid;

/// Secret shared by the test app and the tokens minted here.
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";

fn sign(claims: &JwtClaims, secret: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign test token")
}

/// A token for `user_id` valid for the next hour.
pub fn token_for(user_id: Uuid) -> String {
    let now = Utc::now().timestamp();
    sign(
        &JwtClaims {
            sub: user_id,
            exp: now + 3600,
            iat: now,
            nbf: None,
        },
        TEST_JWT_SECRET,
    )
}

pub fn expired_token_for(user_id: Uuid) -> String {
    let now = Utc::now().timestamp();
    sign(
        &JwtClaims {
            sub: user_id,
            exp: now - 3600,
            iat: now - 7200,
            nbf: None,
        },
        TEST_JWT_SECRET,
    )
}

pub fn token_with_wrong_secret(user_id: Uuid) -> String {
    let now = Utc::now().timestamp();
    sign(
        &JwtClaims {
            sub: user_id,
            exp: now + 3600,
            iat: now,
            nbf: None,
        },
        "some-other-secret-that-the-server-does-not-know",
    )
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
