//! Fixed-point money helpers and the supported currency set.

use super::{BillingDomainError, ParseBillingValueError};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decimal places kept for amounts, quantities and rates.
pub const MONEY_SCALE: u32 = 2;

/// Number of decimal places kept for accumulated task hours.
pub const HOURS_SCALE: u32 = 12;

const SECONDS_PER_HOUR: i64 = 3_600;

/// Invoice currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Euro.
    #[default]
    Eur,
    /// Moroccan dirham.
    Mad,
    /// United States dollar.
    Usd,
}

impl Currency {
    /// Returns the ISO 4217 code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eur => "EUR",
            Self::Mad => "MAD",
            Self::Usd => "USD",
        }
    }
}

impl TryFrom<&str> for Currency {
    type Error = ParseBillingValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Self::Eur),
            "MAD" => Ok(Self::Mad),
            "USD" => Ok(Self::Usd),
            _ => Err(ParseBillingValueError::new("currency", value)),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rounds an amount to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts tracked seconds into hours at [`HOURS_SCALE`] decimal places.
///
/// The fixed scale keeps hour counters exact under addition, so adding and
/// later removing the same session restores the previous total.
#[must_use]
pub fn hours_from_seconds(seconds: i64) -> Decimal {
    (Decimal::from(seconds) / Decimal::from(SECONDS_PER_HOUR))
        .round_dp_with_strategy(HOURS_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts tracked seconds into billable hours rounded to cents.
#[must_use]
pub fn billable_hours(seconds: i64) -> Decimal {
    round_money(hours_from_seconds(seconds))
}

/// Line total for a quantity and a unit price, rounded to cents.
///
/// # Errors
///
/// Returns [`BillingDomainError::AmountOutOfRange`] when the product does not
/// fit in a decimal.
pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Result<Decimal, BillingDomainError> {
    quantity
        .checked_mul(unit_price)
        .map(round_money)
        .ok_or(BillingDomainError::AmountOutOfRange("line total"))
}

/// Rejects negative amounts.
///
/// # Errors
///
/// Returns [`BillingDomainError::NegativeAmount`] when `value` is below zero.
pub fn ensure_non_negative(field: &'static str, value: Decimal) -> Result<Decimal, BillingDomainError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(BillingDomainError::NegativeAmount { field, value });
    }
    Ok(value)
}
