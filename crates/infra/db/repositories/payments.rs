use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::payments},
};
use domain::{
    entities::payments::{
        CheckoutSessionChangeset, InsertPaymentEntity, PaymentEntity, UpdatePaymentEntity,
    },
    repositories::payments::PaymentRepository,
    value_objects::{
        enums::{payment_statuses::PaymentStatus, sort_order::SortOrder},
        payments::PaymentFilter,
    },
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn create(&self, insert_payment_entity: InsertPaymentEntity) -> Result<PaymentEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(payments::table)
            .values(&insert_payment_entity)
            .returning(PaymentEntity::as_returning())
            .get_result::<PaymentEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .find(payment_id)
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list(&self, filter: PaymentFilter) -> Result<Vec<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = payments::table
            .filter(payments::user_id.eq(filter.user_id))
            .select(PaymentEntity::as_select())
            .into_boxed();

        if let Some(course_id) = filter.course_id {
            query = query.filter(payments::course_id.eq(course_id));
        }
        if let Some(lesson_id) = filter.lesson_id {
            query = query.filter(payments::lesson_id.eq(lesson_id));
        }
        if let Some(payment_method) = filter.payment_method {
            query = query.filter(payments::payment_method.eq(payment_method.as_str()));
        }

        query = match filter.order {
            SortOrder::Asc => query.order(payments::payment_date.asc()),
            SortOrder::Desc => query.order(payments::payment_date.desc()),
        };

        let results = query.load::<PaymentEntity>(&mut conn)?;

        Ok(results)
    }

    async fn update(
        &self,
        payment_id: Uuid,
        update_payment_entity: UpdatePaymentEntity,
    ) -> Result<PaymentEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(payments::table.find(payment_id))
            .set(&update_payment_entity)
            .returning(PaymentEntity::as_returning())
            .get_result::<PaymentEntity>(&mut conn)?;

        Ok(result)
    }

    async fn delete(&self, payment_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::delete(payments::table.find(payment_id)).execute(&mut conn)?;

        Ok(())
    }

    async fn attach_checkout_session(
        &self,
        payment_id: Uuid,
        changeset: CheckoutSessionChangeset,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(payments::table.find(payment_id))
            .set(&changeset)
            .execute(&mut conn)?;

        if updated == 0 {
            anyhow::bail!("payment {payment_id} vanished before checkout confirmation");
        }

        Ok(())
    }

    async fn mark_failed(&self, payment_id: Uuid, error: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(payments::table.find(payment_id))
            .set((
                payments::status.eq(PaymentStatus::Failed.as_str()),
                payments::error.eq(Some(error)),
                payments::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn update_status_by_session_id(
        &self,
        session_id: String,
        status: PaymentStatus,
    ) -> Result<Option<Uuid>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(payments::table.filter(payments::gateway_session_id.eq(session_id)))
            .set((
                payments::status.eq(status.as_str()),
                payments::updated_at.eq(Utc::now()),
            ))
            .returning(payments::id)
            .get_result::<Uuid>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
