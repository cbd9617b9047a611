use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{subscriptions, users},
    },
};
use domain::{
    entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    repositories::subscriptions::SubscriptionRepository,
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::course_id.eq(course_id))
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn subscribe(&self, insert_subscription_entity: InsertSubscriptionEntity) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        insert_into(subscriptions::table)
            .values(&insert_subscription_entity)
            .on_conflict((subscriptions::user_id, subscriptions::course_id))
            .do_nothing()
            .execute(&mut conn)?;

        Ok(())
    }

    async fn unsubscribe(&self, user_id: Uuid, course_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::delete(
            subscriptions::table
                .filter(subscriptions::user_id.eq(user_id))
                .filter(subscriptions::course_id.eq(course_id)),
        )
        .execute(&mut conn)?;

        Ok(())
    }

    async fn list_subscriber_emails(&self, course_id: Uuid) -> Result<Vec<String>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = subscriptions::table
            .inner_join(users::table)
            .filter(subscriptions::course_id.eq(course_id))
            .filter(users::email.ne(""))
            .select(users::email)
            .load::<String>(&mut conn)?;

        Ok(results)
    }
}
