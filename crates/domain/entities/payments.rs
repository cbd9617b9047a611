use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::payments;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payment_date: DateTime<Utc>,
    pub course_id: Option<Uuid>,
    pub lesson_id: Option<Uuid>,
    pub amount_minor: i64,
    pub payment_method: String,
    pub status: String,
    pub gateway_product_id: Option<String>,
    pub gateway_price_id: Option<String>,
    pub gateway_session_id: Option<String>,
    pub gateway_checkout_url: Option<String>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub user_id: Uuid,
    pub course_id: Option<Uuid>,
    pub lesson_id: Option<Uuid>,
    pub amount_minor: i64,
    pub payment_method: String,
    pub status: String,
}

/// Edits allowed on manually recorded (cash/transfer) payments.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = payments)]
pub struct UpdatePaymentEntity {
    pub course_id: Option<Option<Uuid>>,
    pub lesson_id: Option<Option<Uuid>>,
    pub amount_minor: Option<i64>,
    pub payment_method: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UpdatePaymentEntity {
    pub fn is_empty(&self) -> bool {
        self.course_id.is_none()
            && self.lesson_id.is_none()
            && self.amount_minor.is_none()
            && self.payment_method.is_none()
    }
}

/// Gateway references written once the checkout session exists.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = payments)]
pub struct CheckoutSessionChangeset {
    pub status: String,
    pub gateway_product_id: Option<String>,
    pub gateway_price_id: Option<String>,
    pub gateway_session_id: Option<String>,
    pub gateway_checkout_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}
