use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity};

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    async fn find(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<SubscriptionEntity>>;
    /// A concurrent duplicate is absorbed by the unique (user, course) pair.
    async fn subscribe(&self, insert_subscription_entity: InsertSubscriptionEntity) -> Result<()>;
    async fn unsubscribe(&self, user_id: Uuid, course_id: Uuid) -> Result<()>;
    async fn list_subscriber_emails(&self, course_id: Uuid) -> Result<Vec<String>>;
}
