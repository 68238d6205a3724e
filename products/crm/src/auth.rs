use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use entity::{user, user_secret};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use platform_api::{ApiError, ApiResult};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::db_error;

pub const SESSION_COOKIE: &str = "crm_session";

/// Shown for every failed login, whatever the cause.
pub const LOGIN_FAILED: &str = "Please enter a correct username and password.";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_minutes: i64,
}

impl AuthConfig {
    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.jwt_secret.as_bytes())
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.jwt_secret.as_bytes())
    }
}

/// Session token body. Tiers are deliberately absent: they are resolved from
/// the store on each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

pub fn issue_token(user_id: Uuid, config: &AuthConfig) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::minutes(config.session_ttl_minutes))
        .unwrap_or(now)
        .timestamp() as usize;
    let claims = SessionClaims {
        sub: user_id,
        exp,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key())
}

pub fn decode_token(
    token: &str,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<SessionClaims> {
    jsonwebtoken::decode::<SessionClaims>(token, &config.decoding_key(), &Validation::default())
        .map(|data| data.claims)
}

/// Session cookie carrying `token`, expiring with the token itself.
pub fn session_cookie(token: String, ttl_minutes: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(ttl_minutes.max(0)))
        .build()
}

/// Removal cookie tearing a session down.
pub fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie
}

pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::internal(anyhow::anyhow!("hash error: {err}")))
}

pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Check a username/password pair. Unknown users, wrong passwords and
/// inactive accounts all fail with the same form error.
pub async fn authenticate<C>(db: &C, username: &str, password: &str) -> ApiResult<user::Model>
where
    C: ConnectionTrait,
{
    let rejected = || ApiError::form(LOGIN_FAILED);
    let user = user::Entity::find()
        .filter(user::Column::Username.eq(username.trim()))
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(rejected)?;
    if !user.is_active {
        debug!(user_id = %user.id, "login refused for inactive account");
        return Err(rejected());
    }
    let secret = user_secret::Entity::find_by_id(user.id)
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(rejected)?;
    if !verify_password(&secret.password_hash, password) {
        return Err(rejected());
    }
    Ok(user)
}
