//! Invoice line items.

use super::{
    BillingDomainError, InvoiceId, InvoiceItemId, TaskId, ensure_non_negative, line_total,
    round_money,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Description used when neither the request nor the task provides one.
pub const DEFAULT_ITEM_DESCRIPTION: &str = "Prestation";

/// Parameter object for a new line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoiceItem {
    /// Invoice the line belongs to.
    pub invoice_id: InvoiceId,
    /// Task the line bills, if any.
    pub task_id: Option<TaskId>,
    /// Line label.
    pub description: Option<String>,
    /// Quantity in hours (or units for fixed-price lines).
    pub quantity: Decimal,
    /// Price per unit.
    pub unit_price: Decimal,
}

/// Partial update of a line item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceItemRevision {
    /// New quantity.
    pub quantity: Option<Decimal>,
    /// New unit price.
    pub unit_price: Option<Decimal>,
    /// New label.
    pub description: Option<String>,
}

impl InvoiceItemRevision {
    /// Returns whether the revision carries no changes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.unit_price.is_none() && self.description.is_none()
    }
}

/// A priced line on an invoice; `total = quantity × unit_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    id: InvoiceItemId,
    invoice_id: InvoiceId,
    task_id: Option<TaskId>,
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    total: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedInvoiceItemData {
    /// Persisted item identifier.
    pub id: InvoiceItemId,
    /// Owning invoice.
    pub invoice_id: InvoiceId,
    /// Billed task, if any.
    pub task_id: Option<TaskId>,
    /// Line label.
    pub description: String,
    /// Quantity.
    pub quantity: Decimal,
    /// Price per unit.
    pub unit_price: Decimal,
    /// Stored line total.
    pub total: Decimal,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl InvoiceItem {
    /// Prices a new line item.
    ///
    /// Quantity and unit price are rounded to cents before the total is
    /// computed, so the stored figures always multiply out to the stored
    /// total.
    ///
    /// # Errors
    ///
    /// Returns [`BillingDomainError::NegativeAmount`] for a negative quantity
    /// or unit price, and [`BillingDomainError::AmountOutOfRange`] when their
    /// product overflows.
    pub fn new(params: NewInvoiceItem, clock: &impl Clock) -> Result<Self, BillingDomainError> {
        let quantity = round_money(ensure_non_negative("quantity", params.quantity)?);
        let unit_price = round_money(ensure_non_negative("unit_price", params.unit_price)?);
        let timestamp = clock.utc();
        Ok(Self {
            id: InvoiceItemId::new(),
            invoice_id: params.invoice_id,
            task_id: params.task_id,
            description: label_or_default(params.description),
            quantity,
            unit_price,
            total: line_total(quantity, unit_price)?,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a line item from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedInvoiceItemData) -> Self {
        Self {
            id: data.id,
            invoice_id: data.invoice_id,
            task_id: data.task_id,
            description: data.description,
            quantity: data.quantity,
            unit_price: data.unit_price,
            total: data.total,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the item identifier.
    #[must_use]
    pub const fn id(&self) -> InvoiceItemId {
        self.id
    }

    /// Returns the owning invoice.
    #[must_use]
    pub const fn invoice_id(&self) -> InvoiceId {
        self.invoice_id
    }

    /// Returns the billed task, if any.
    #[must_use]
    pub const fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    /// Returns the line label.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the quantity.
    #[must_use]
    pub const fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// Returns the unit price.
    #[must_use]
    pub const fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// Returns the line total.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies a partial update and recomputes the line total.
    ///
    /// # Errors
    ///
    /// Returns [`BillingDomainError::EmptyItemRevision`] when nothing would
    /// change, [`BillingDomainError::NegativeAmount`] for negative values and
    /// [`BillingDomainError::AmountOutOfRange`] for an overflowing total.
    /// The item is left untouched on error.
    pub fn revise(
        &mut self,
        revision: InvoiceItemRevision,
        clock: &impl Clock,
    ) -> Result<(), BillingDomainError> {
        if revision.is_empty() {
            return Err(BillingDomainError::EmptyItemRevision(self.id));
        }
        let quantity = match revision.quantity {
            Some(value) => round_money(ensure_non_negative("quantity", value)?),
            None => self.quantity,
        };
        let unit_price = match revision.unit_price {
            Some(value) => round_money(ensure_non_negative("unit_price", value)?),
            None => self.unit_price,
        };
        let total = line_total(quantity, unit_price)?;
        if let Some(description) = revision.description {
            self.description = label_or_default(Some(description));
        }
        self.quantity = quantity;
        self.unit_price = unit_price;
        self.total = total;
        self.updated_at = clock.utc();
        Ok(())
    }
}

fn label_or_default(description: Option<String>) -> String {
    description
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_ITEM_DESCRIPTION.to_owned())
}
