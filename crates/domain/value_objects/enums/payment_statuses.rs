use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Lifecycle of a payment row.
///
/// Gateway payments start `Pending` before any Stripe call, become `Open` once
/// a checkout session exists, and end as `Paid`, `Failed` or `Expired`.
/// Cash and transfer payments are recorded directly as `Paid`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Open,
    Paid,
    Failed,
    Expired,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Open => "open",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "pending" => PaymentStatus::Pending,
            "open" => PaymentStatus::Open,
            "paid" => PaymentStatus::Paid,
            "expired" => PaymentStatus::Expired,
            _ => PaymentStatus::Failed,
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
