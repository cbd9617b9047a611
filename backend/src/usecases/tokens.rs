use std::sync::Arc;

use chrono::Utc;
use lms_core::domain::{
    entities::users::UserEntity,
    repositories::users::UserRepository,
    value_objects::{
        enums::user_roles::UserRole,
        users::{AccessTokenDto, TokenObtainModel, TokenPairDto, TokenRefreshModel},
    },
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{TokenType, issue_token, passwords::verify_password, validate_token},
    config::config_model::{TokenTtl, UserSecret},
    usecases::errors::{UseCaseError, UseCaseResult},
};

pub struct TokenUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    secret: UserSecret,
    ttl: TokenTtl,
}

impl<U> TokenUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, secret: UserSecret, ttl: TokenTtl) -> Self {
        Self {
            user_repo,
            secret,
            ttl,
        }
    }

    /// Exchanges credentials for an access/refresh pair.
    pub async fn obtain(&self, model: TokenObtainModel) -> UseCaseResult<TokenPairDto> {
        model.validate()?;

        let user = self
            .user_repo
            .find_by_username(model.username.trim().to_string())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "tokens: failed to load user by username");
                UseCaseError::Internal(err)
            })?;

        let user = match user {
            Some(user)
                if user.is_active && verify_password(&model.password, &user.password_hash) =>
            {
                user
            }
            _ => {
                warn!("tokens: rejected credentials");
                return Err(UseCaseError::Unauthenticated);
            }
        };

        let now = Utc::now();
        if let Err(err) = self.user_repo.touch_last_login(user.id, now).await {
            error!(user_id = %user.id, db_error = ?err, "tokens: failed to record last login");
        }

        let role = UserRole::from_moderator_flag(user.is_moderator);
        let pair = TokenPairDto {
            access: self.sign(user.id, role, TokenType::Access)?,
            refresh: self.sign(user.id, role, TokenType::Refresh)?,
        };

        info!(user_id = %user.id, "tokens: issued token pair");
        Ok(pair)
    }

    pub async fn refresh(&self, model: TokenRefreshModel) -> UseCaseResult<AccessTokenDto> {
        let claims = validate_token(&model.refresh, &self.secret.refresh_secret, TokenType::Refresh)
            .map_err(|err| {
                debug!(error = %err, "tokens: refresh token rejected");
                UseCaseError::Unauthenticated
            })?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| UseCaseError::Unauthenticated)?;

        let user = self.load_active(user_id).await?;
        let role = UserRole::from_moderator_flag(user.is_moderator);

        Ok(AccessTokenDto {
            access: self.sign(user.id, role, TokenType::Access)?,
        })
    }

    async fn load_active(&self, user_id: Uuid) -> UseCaseResult<UserEntity> {
        let user = self.user_repo.find_by_id(user_id).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "tokens: failed to load user");
            UseCaseError::Internal(err)
        })?;

        match user {
            Some(user) if user.is_active => Ok(user),
            _ => {
                warn!(%user_id, "tokens: refresh for missing or inactive user");
                Err(UseCaseError::Unauthenticated)
            }
        }
    }

    fn sign(&self, user_id: Uuid, role: UserRole, token_type: TokenType) -> UseCaseResult<String> {
        let (secret, ttl) = match token_type {
            TokenType::Access => (&self.secret.secret, self.ttl.access_seconds),
            TokenType::Refresh => (&self.secret.refresh_secret, self.ttl.refresh_seconds),
        };

        Ok(issue_token(user_id, role, token_type, secret, ttl)?)
    }
}
