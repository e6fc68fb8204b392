use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

pub const ACCESS_TOKEN_TYPE: &str = "access";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub email: String,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// Hash a password with bcrypt at the default cost
pub fn hash_password(password: &str) -> Result<String> {
    hash_password_with_cost(password, bcrypt::DEFAULT_COST)
}

pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost).context("Failed to hash password")
}

/// Verify a password against a bcrypt hash. A malformed hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Create an access token with the configured lifetime
pub fn create_access_token(
    user_id: Uuid,
    username: &str,
    email: &str,
    jwt: &JwtConfig,
) -> Result<String> {
    create_access_token_with_expiry(
        user_id,
        username,
        email,
        &jwt.secret,
        Duration::minutes(jwt.expire_minutes),
    )
}

pub fn create_access_token_with_expiry(
    user_id: Uuid,
    username: &str,
    email: &str,
    secret: &str,
    expires_in: Duration,
) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        email: email.to_string(),
        token_type: ACCESS_TOKEN_TYPE.to_string(),
        iat: now.timestamp(),
        exp: (now + expires_in).timestamp(),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to create access token")
}

/// Decode an access token. Expired, tampered or non-access tokens yield `None`.
pub fn decode_access_token(token: &str, secret: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .ok()?;

    (data.claims.token_type == ACCESS_TOKEN_TYPE).then_some(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_password_hash_and_verify_correct() {
        let hash = hash_password_with_cost("my-secure-password", 4).unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("my-secure-password", &hash));
    }

    #[test]
    fn test_password_verify_wrong() {
        let hash = hash_password_with_cost("correct-password", 4).unwrap();
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn test_password_hash_never_plaintext() {
        let hash = hash_password_with_cost("plain-text-pw", 4).unwrap();
        assert!(!hash.contains("plain-text-pw"));
        let again = hash_password_with_cost("plain-text-pw", 4).unwrap();
        assert_ne!(hash, again);
    }

    #[test]
    fn test_verify_against_garbage_hash() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }

    #[test]
    fn test_token_roundtrip() {
        let id = Uuid::new_v4();
        let token =
            create_access_token_with_expiry(id, "ana", "ana@example.com", SECRET, Duration::minutes(5))
                .unwrap();
        let claims = decode_access_token(&token, SECRET).unwrap();
        assert_eq!(claims.user_id(), Some(id));
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.email, "ana@example.com");
        assert_eq!(claims.token_type, ACCESS_TOKEN_TYPE);
    }

    #[test]
    fn test_expired_token_decodes_to_none() {
        let token = create_access_token_with_expiry(
            Uuid::new_v4(),
            "ana",
            "ana@example.com",
            SECRET,
            Duration::seconds(-10),
        )
        .unwrap();
        assert!(decode_access_token(&token, SECRET).is_none());
    }

    #[test]
    fn test_wrong_secret_or_garbage_decodes_to_none() {
        let token = create_access_token_with_expiry(
            Uuid::new_v4(),
            "ana",
            "ana@example.com",
            SECRET,
            Duration::minutes(5),
        )
        .unwrap();
        assert!(decode_access_token(&token, "other-secret").is_none());
        assert!(decode_access_token("not.a.jwt", SECRET).is_none());
    }

    #[test]
    fn test_uses_configured_lifetime() {
        let jwt = JwtConfig {
            secret: SECRET.to_string(),
            expire_minutes: 60,
        };
        let token = create_access_token(Uuid::new_v4(), "ana", "a@b.c", &jwt).unwrap();
        let claims = decode_access_token(&token, SECRET).unwrap();
        assert_eq!(claims.exp - claims.iat, 3600);
    }
}
