//! Bearer tokens vouched for by the identity provider.
//!
//! The service only verifies tokens. [`create_access_token`] exists for tests
//! and local tooling that stand in for the provider.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    models::user::{Actor, UserRole},
    types::UserId,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub username: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl Claims {
    pub fn new(user_id: UserId, username: &str, role: UserRole, expiration_hours: u64) -> Self {
        let now = Utc::now();
        let hours = i64::try_from(expiration_hours).unwrap_or(i64::MAX / 3600);
        let exp = now + Duration::hours(hours);

        Self {
            sub: user_id.to_string(),
            username: username.to_string(),
            role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn actor(&self) -> anyhow::Result<Actor> {
        let id: UserId = self
            .sub
            .parse()
            .map_err(|_| anyhow::anyhow!("token subject is not a user id"))?;
        Ok(Actor::new(id, self.role))
    }
}

pub fn create_access_token(
    user_id: UserId,
    username: &str,
    role: UserRole,
    secret: &str,
    expiration_hours: u64,
) -> anyhow::Result<String> {
    let claims = Claims::new(user_id, username, role, expiration_hours);
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

pub fn verify_access_token(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}
