use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::payments::PaymentEntity,
    value_objects::{
        enums::{
            payment_methods::PaymentMethod, payment_statuses::PaymentStatus, sort_order::SortOrder,
        },
        money::from_minor_units,
    },
};

/// Body of manual payment create/update requests (cash or transfer).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentModel {
    pub course: Option<Uuid>,
    pub lesson: Option<Uuid>,
    pub amount: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
}

impl PaymentModel {
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.amount.is_none() {
            missing.push("amount");
        }
        if self.payment_method.is_none() {
            missing.push("payment_method");
        }
        missing
    }
}

/// Body of `POST /payments/stripe`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutModel {
    pub course: Option<Uuid>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutDto {
    pub payment_id: Uuid,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentDto {
    pub id: Uuid,
    pub user: Uuid,
    pub payment_date: DateTime<Utc>,
    pub course: Option<Uuid>,
    pub lesson: Option<Uuid>,
    pub amount: Decimal,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub checkout_url: Option<String>,
    pub error: Option<String>,
}

impl From<PaymentEntity> for PaymentDto {
    fn from(entity: PaymentEntity) -> Self {
        Self {
            id: entity.id,
            user: entity.user_id,
            payment_date: entity.payment_date,
            course: entity.course_id,
            lesson: entity.lesson_id,
            amount: from_minor_units(entity.amount_minor),
            payment_method: entity.payment_method,
            status: PaymentStatus::from_str(&entity.status),
            checkout_url: entity.gateway_checkout_url,
            error: entity.error,
        }
    }
}

/// Raw query string of `GET /payments`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPaymentsQuery {
    pub course: Option<Uuid>,
    pub lesson: Option<Uuid>,
    pub payment_method: Option<String>,
    pub ordering: Option<String>,
}

/// Parsed filters handed to the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentFilter {
    pub user_id: Uuid,
    pub course_id: Option<Uuid>,
    pub lesson_id: Option<Uuid>,
    pub payment_method: Option<PaymentMethod>,
    pub order: SortOrder,
}

impl ListPaymentsQuery {
    /// Unknown `payment_method` or `ordering` values are reported by field
    /// name.
    pub fn into_filter(self, user_id: Uuid) -> Result<PaymentFilter, &'static str> {
        let payment_method = match self.payment_method.as_deref() {
            None | Some("") => None,
            Some(value) => Some(PaymentMethod::from_str(value).ok_or("payment_method")?),
        };
        let order = match self.ordering.as_deref() {
            None | Some("") => SortOrder::default(),
            Some(value) => SortOrder::from_ordering(value, "payment_date").ok_or("ordering")?,
        };

        Ok(PaymentFilter {
            user_id,
            course_id: self.course,
            lesson_id: self.lesson,
            payment_method,
            order,
        })
    }
}
