use rust_decimal::{Decimal, prelude::ToPrimitive};

/// Converts a major-unit amount to integer minor units, truncating anything
/// past the second decimal place. Returns `None` for non-positive amounts or
/// values that do not fit in `i64`.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    if amount <= Decimal::ZERO {
        return None;
    }

    let minor = amount.checked_mul(Decimal::ONE_HUNDRED)?.trunc().to_i64()?;
    (minor > 0).then_some(minor)
}

pub fn from_minor_units(amount_minor: i64) -> Decimal {
    Decimal::new(amount_minor, 2)
}
