use actix_web::HttpRequest;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::Engine;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use fantasy_db::{common::UserType, users};

use crate::config::AuthConfig;
use crate::error::Error;
use crate::http_types::AppHttpError;
use crate::server_state::server_state;

/// Bearer token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account email.
    pub sub: String,
    pub uid: i64,
    pub role: UserType,
    pub first_name: String,
    pub last_name: String,
    pub photo: String,
    pub country_id: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == UserType::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDto {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expiration: OffsetDateTime,
}

pub fn issue_token(user: &users::Model, cfg: &AuthConfig) -> Result<TokenDto, Error> {
    let expiration = OffsetDateTime::now_utc() + time::Duration::days(cfg.token_lifetime_days);
    let claims = Claims {
        sub: user.email.clone(),
        uid: user.id,
        role: user.user_type,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        photo: user.photo.clone(),
        country_id: user.country_id,
        exp: expiration.unix_timestamp(),
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.jwt_key.as_bytes()),
    )
    .map_err(|e| {
        log::error!("Failed to sign token for user {}: {e}", user.id);
        Error::Internal(format!("token signing: {e}"))
    })?;
    Ok(TokenDto { token, expiration })
}

/// Verifies signature and expiry.
pub fn decode_token(token: &str, cfg: &AuthConfig) -> Result<Claims, Error> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(cfg.jwt_key.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        log::debug!("Rejected bearer token: {e}");
        Error::InvalidToken
    })
}

pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            log::error!("Failed to hash password: {e}");
            Error::Internal(format!("password hashing: {e}"))
        })
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        log::warn!("Stored password hash is malformed");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Random URL-safe token for one-time email confirmation.
pub fn random_email_token() -> String {
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Extracts and checks the `Authorization: Bearer` credential.
pub fn authenticate(req: &HttpRequest) -> Result<Claims, AppHttpError> {
    let state = server_state(req)?;
    let header = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .ok_or(AppHttpError::Unauthenticated)?;
    let header = header.to_str().map_err(|e| {
        log::debug!("Authorization header is not ascii: {e}");
        AppHttpError::Unauthenticated
    })?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or(AppHttpError::Unauthenticated)?;
    decode_token(token.trim(), &state.accounts.auth).map_err(|_| AppHttpError::Unauthenticated)
}

pub fn require_admin(req: &HttpRequest) -> Result<Claims, AppHttpError> {
    let claims = authenticate(req)?;
    if !claims.is_admin() {
        log::info!("Non-admin {} tried an admin operation", claims.sub);
        return Err(AppHttpError::Unauthorized);
    }
    Ok(claims)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing;

    fn user() -> users::Model {
        users::Model {
            id: 3,
            email: "ana@example.com".to_owned(),
            first_name: "Ana".to_owned(),
            last_name: "Gómez".to_owned(),
            phone_number: None,
            photo: String::new(),
            country_id: 1,
            user_type: UserType::Admin,
            password_hash: String::new(),
            email_confirmed: true,
            access_failed_count: 0,
            lockout_end: None,
        }
    }

    #[test]
    fn token_carries_profile_claims() {
        let cfg = testing::auth_config();
        let dto = issue_token(&user(), &cfg).unwrap();
        let claims = decode_token(&dto.token, &cfg).unwrap();
        assert_eq!(claims.sub, "ana@example.com");
        assert_eq!(claims.uid, 3);
        assert!(claims.is_admin());
        assert_eq!(claims.exp, dto.expiration.unix_timestamp());
        let days = (dto.expiration - OffsetDateTime::now_utc()).whole_days();
        assert!((29..=30).contains(&days));
    }

    #[test]
    fn token_signed_with_other_key_is_rejected() {
        let cfg = testing::auth_config();
        let dto = issue_token(&user(), &cfg).unwrap();
        let mut other = cfg.clone();
        other.jwt_key = "another-key-another-key-another-key".to_owned();
        assert_eq!(decode_token(&dto.token, &other), Err(Error::InvalidToken));
        assert_eq!(decode_token("garbage", &cfg), Err(Error::InvalidToken));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
        assert!(!verify_password("secret1", "not-a-hash"));
    }

    #[test]
    fn email_tokens_are_url_safe() {
        let t = random_email_token();
        assert_eq!(t.len(), 43);
        assert!(t.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(t, random_email_token());
    }
}
