use std::sync::Arc;

use lms_core::domain::{
    repositories::users::UserRepository,
    value_objects::{
        access_policy::{Action, Actor, ResourceKind},
        users::{RegisterUserModel, UpdateUserModel, UserDto},
    },
};
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::passwords::hash_password,
    usecases::{
        authorize,
        errors::{FieldErrors, UseCaseError, UseCaseResult},
    },
};

const USERNAME_TAKEN: &str = "A user with that username already exists.";
const EMAIL_TAKEN: &str = "A user with that email already exists.";

pub struct UserUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
}

impl<U> UserUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    /// Public sign-up. New accounts are active regular users.
    pub async fn register(&self, model: RegisterUserModel) -> UseCaseResult<UserDto> {
        model.validate()?;
        self.ensure_unique(
            Some(model.username.trim().to_string()),
            Some(model.email.trim().to_lowercase()),
            None,
        )
        .await?;

        let password_hash = hash_password(&model.password)?;
        let user = self
            .user_repo
            .create(model.to_entity(password_hash))
            .await
            .map_err(|err| {
                error!(db_error = ?err, "users: failed to register");
                UseCaseError::Internal(err)
            })?;

        info!(user_id = %user.id, "users: registered");
        Ok(user.into())
    }

    pub async fn list(&self) -> UseCaseResult<Vec<UserDto>> {
        let users = self.user_repo.list().await.map_err(|err| {
            error!(db_error = ?err, "users: failed to list");
            UseCaseError::Internal(err)
        })?;

        Ok(users.into_iter().map(UserDto::from).collect())
    }

    pub async fn retrieve(&self, actor: Actor, user_id: Uuid) -> UseCaseResult<UserDto> {
        authorize(&actor, ResourceKind::User, Action::Retrieve, user_id)?;
        self.load(user_id).await
    }

    pub async fn update(
        &self,
        actor: Actor,
        user_id: Uuid,
        model: UpdateUserModel,
        partial: bool,
    ) -> UseCaseResult<UserDto> {
        let current = self.load(user_id).await?;
        authorize(&actor, ResourceKind::User, Action::Update, current.id)?;

        if !partial {
            UseCaseError::require(&model.missing_required())?;
        }
        model.validate()?;

        let username = model
            .username
            .as_deref()
            .map(str::trim)
            .filter(|username| *username != current.username)
            .map(str::to_string);
        let email = model
            .email
            .as_deref()
            .map(|email| email.trim().to_lowercase())
            .filter(|email| *email != current.email);
        self.ensure_unique(username, email, Some(user_id)).await?;

        let password_hash = match model.password.as_deref() {
            Some(raw) => Some(hash_password(raw)?),
            None => None,
        };

        let changes = model.to_entity(password_hash);
        if changes.is_empty() {
            return Ok(current);
        }

        let user = self
            .user_repo
            .update(user_id, changes)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "users: failed to update");
                UseCaseError::Internal(err)
            })?;

        info!(%user_id, "users: updated");
        Ok(user.into())
    }

    /// Removes the account together with everything it owns.
    pub async fn delete(&self, actor: Actor, user_id: Uuid) -> UseCaseResult<()> {
        let current = self.load(user_id).await?;
        authorize(&actor, ResourceKind::User, Action::Delete, current.id)?;

        self.user_repo.delete_cascade(user_id).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "users: failed to delete");
            UseCaseError::Internal(err)
        })?;

        info!(%user_id, "users: deleted");
        Ok(())
    }

    async fn ensure_unique(
        &self,
        username: Option<String>,
        email: Option<String>,
        exclude: Option<Uuid>,
    ) -> UseCaseResult<()> {
        let mut errors = FieldErrors::new();

        if let Some(username) = username {
            let taken = self
                .user_repo
                .username_taken(username, exclude)
                .await
                .map_err(|err| {
                    error!(db_error = ?err, "users: failed to check username");
                    UseCaseError::Internal(err)
                })?;
            if taken {
                errors.insert("username".to_string(), vec![USERNAME_TAKEN.to_string()]);
            }
        }

        if let Some(email) = email {
            let taken = self
                .user_repo
                .email_taken(email, exclude)
                .await
                .map_err(|err| {
                    error!(db_error = ?err, "users: failed to check email");
                    UseCaseError::Internal(err)
                })?;
            if taken {
                errors.insert("email".to_string(), vec![EMAIL_TAKEN.to_string()]);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(UseCaseError::Validation(errors))
        }
    }

    async fn load(&self, user_id: Uuid) -> UseCaseResult<UserDto> {
        self.user_repo
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "users: failed to load");
                UseCaseError::Internal(err)
            })?
            .map(UserDto::from)
            .ok_or(UseCaseError::NotFound("user"))
    }
}
