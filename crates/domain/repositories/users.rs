use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::users::{InsertUserEntity, UpdateUserEntity, UserEntity};

#[automock]
#[async_trait]
pub trait UserRepository {
    async fn create(&self, insert_user_entity: InsertUserEntity) -> Result<UserEntity>;
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserEntity>>;
    async fn find_by_username(&self, username: String) -> Result<Option<UserEntity>>;
    /// `exclude` skips the user being edited.
    async fn username_taken(&self, username: String, exclude: Option<Uuid>) -> Result<bool>;
    async fn email_taken(&self, email: String, exclude: Option<Uuid>) -> Result<bool>;
    async fn list(&self) -> Result<Vec<UserEntity>>;
    async fn update(
        &self,
        user_id: Uuid,
        update_user_entity: UpdateUserEntity,
    ) -> Result<UserEntity>;
    async fn touch_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()>;
    /// Removes the user with their payments, subscriptions, lessons and courses.
    async fn delete_cascade(&self, user_id: Uuid) -> Result<()>;
    /// Returns how many active users were switched off.
    async fn deactivate_inactive_since(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}
