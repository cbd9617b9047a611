use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::payments::{
        CheckoutSessionChangeset, InsertPaymentEntity, PaymentEntity, UpdatePaymentEntity,
    },
    value_objects::{enums::payment_statuses::PaymentStatus, payments::PaymentFilter},
};

#[automock]
#[async_trait]
pub trait PaymentRepository {
    async fn create(&self, insert_payment_entity: InsertPaymentEntity) -> Result<PaymentEntity>;
    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>>;
    async fn list(&self, filter: PaymentFilter) -> Result<Vec<PaymentEntity>>;
    async fn update(
        &self,
        payment_id: Uuid,
        update_payment_entity: UpdatePaymentEntity,
    ) -> Result<PaymentEntity>;
    async fn delete(&self, payment_id: Uuid) -> Result<()>;
    async fn attach_checkout_session(
        &self,
        payment_id: Uuid,
        changeset: CheckoutSessionChangeset,
    ) -> Result<()>;
    async fn mark_failed(&self, payment_id: Uuid, error: String) -> Result<()>;
    /// Returns the id of the payment that owned the session, if any.
    async fn update_status_by_session_id(
        &self,
        session_id: String,
        status: PaymentStatus,
    ) -> Result<Option<Uuid>>;
}
