pub mod passwords;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use lms_core::domain::{
    repositories::users::UserRepository,
    value_objects::{access_policy::Actor, enums::user_roles::UserRole},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::{config::config_loader, usecases::errors::UseCaseError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: UserRole,
    pub token_type: TokenType,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

pub fn issue_token(
    user_id: Uuid,
    role: UserRole,
    token_type: TokenType,
    secret: &str,
    ttl_seconds: i64,
) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        token_type,
        iat: now as usize,
        exp: (now + ttl_seconds) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("failed to sign token")
}

/// Checks signature, expiry and that the token is of the `expected` kind.
pub fn validate_token(token: &str, secret: &str, expected: TokenType) -> Result<Claims> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(jsonwebtoken::Algorithm::HS256);

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| anyhow::anyhow!("JWT validation failed: {}", e))?;

    if token_data.claims.token_type != expected {
        anyhow::bail!("unexpected token type");
    }

    Ok(token_data.claims)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// User lookup installed as a request extension by the server. When present,
/// every authenticated request re-reads the user row, so deactivated or
/// deleted accounts lose access and role changes apply immediately.
#[derive(Clone)]
pub struct UserDirectory(pub Arc<dyn UserRepository + Send + Sync>);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = UseCaseError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(UseCaseError::Unauthenticated)?;

        let secret = config_loader::get_user_secret()?;

        let claims = validate_token(token, &secret.secret, TokenType::Access).map_err(|err| {
            debug!(error = %err, "auth: access token rejected");
            UseCaseError::Unauthenticated
        })?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| UseCaseError::Unauthenticated)?;

        let Some(UserDirectory(users)) = parts.extensions.get::<UserDirectory>().cloned() else {
            return Ok(AuthUser {
                user_id,
                role: claims.role,
            });
        };

        let user = users.find_by_id(user_id).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "auth: failed to load user");
            UseCaseError::Internal(err)
        })?;

        match user {
            Some(user) if user.is_active => Ok(AuthUser {
                user_id,
                role: UserRole::from_moderator_flag(user.is_moderator),
            }),
            _ => {
                debug!(%user_id, "auth: token for missing or inactive user");
                Err(UseCaseError::Unauthenticated)
            }
        }
    }
}
