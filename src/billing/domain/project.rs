//! Read-only records owned by the surrounding project and account services.
//!
//! The billing engine never creates or edits these records. It reads them to
//! resolve ownership, rates and the client an invoice is addressed to.

use super::{ClientId, Currency, ParseBillingValueError, ProjectId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Scoping and estimation.
    Planning,
    /// Work is ongoing.
    InProgress,
    /// Work is finished and may be invoiced as a whole.
    Completed,
    /// Work is suspended.
    OnHold,
}

impl ProjectStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
        }
    }
}

impl TryFrom<&str> for ProjectStatus {
    type Error = ParseBillingValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "planning" => Ok(Self::Planning),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "on_hold" => Ok(Self::OnHold),
            _ => Err(ParseBillingValueError::new("project status", value)),
        }
    }
}

/// How a project is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingType {
    /// Hours worked multiplied by a rate.
    Hourly,
    /// A fixed amount for the whole project.
    Fixed,
}

impl BillingType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Fixed => "fixed",
        }
    }
}

impl TryFrom<&str> for BillingType {
    type Error = ParseBillingValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "fixed" => Ok(Self::Fixed),
            _ => Err(ParseBillingValueError::new("billing type", value)),
        }
    }
}

/// Snapshot of a client project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project identifier.
    pub id: ProjectId,
    /// Owning user.
    pub user_id: UserId,
    /// Client the project is delivered to.
    pub client_id: ClientId,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: ProjectStatus,
    /// Pricing model.
    pub billing_type: BillingType,
    /// Project-level hourly rate.
    pub hourly_rate: Option<Decimal>,
    /// Total price for fixed-price projects.
    pub fixed_amount: Option<Decimal>,
}

impl Project {
    /// Returns whether `user_id` owns this project.
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// Billing preferences of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingProfile {
    /// Account identifier.
    pub user_id: UserId,
    /// Preferred invoice currency.
    pub currency: Option<Currency>,
    /// Fallback hourly rate when neither task nor project sets one.
    pub default_hourly_rate: Option<Decimal>,
}

impl BillingProfile {
    /// Creates a profile with no preferences set.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            currency: None,
            default_hourly_rate: None,
        }
    }
}
