//! Invoice aggregate and its monetary totals.

use super::{
    BillingDomainError, ClientId, Currency, InvoiceId, InvoiceNumber, ParseBillingValueError,
    ProjectId, UserId, round_money,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Invoice payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Still editable; auto-billing appends to draft invoices.
    Draft,
    /// Sent to the client.
    Sent,
    /// Settled.
    Paid,
    /// Past its due date and unpaid.
    Overdue,
}

impl InvoiceStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }
}

impl TryFrom<&str> for InvoiceStatus {
    type Error = ParseBillingValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "sent" => Ok(Self::Sent),
            "paid" => Ok(Self::Paid),
            "overdue" => Ok(Self::Overdue),
            _ => Err(ParseBillingValueError::new("invoice status", value)),
        }
    }
}

/// How an invoice came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    /// Generated from project work.
    Project,
    /// Entered by hand.
    Manual,
}

impl InvoiceKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Manual => "manual",
        }
    }
}

impl TryFrom<&str> for InvoiceKind {
    type Error = ParseBillingValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "project" => Ok(Self::Project),
            "manual" => Ok(Self::Manual),
            _ => Err(ParseBillingValueError::new("invoice kind", value)),
        }
    }
}

/// Pre-tax, tax and tax-inclusive totals of an invoice.
///
/// Tax is not computed: `total_tva` is always zero and `total_ttc` equals
/// `total_ht`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// Pre-tax total (HT).
    pub total_ht: Decimal,
    /// Tax amount (TVA).
    pub total_tva: Decimal,
    /// Tax-inclusive total (TTC).
    pub total_ttc: Decimal,
}

impl InvoiceTotals {
    /// Totals of an invoice without items.
    pub const ZERO: Self = Self {
        total_ht: Decimal::ZERO,
        total_tva: Decimal::ZERO,
        total_ttc: Decimal::ZERO,
    };

    /// Sums line totals into rounded invoice totals.
    ///
    /// # Errors
    ///
    /// Returns [`BillingDomainError::AmountOutOfRange`] when the sum does not
    /// fit in a decimal.
    pub fn from_line_totals(
        line_totals: impl IntoIterator<Item = Decimal>,
    ) -> Result<Self, BillingDomainError> {
        let sum = line_totals
            .into_iter()
            .try_fold(Decimal::ZERO, Decimal::checked_add)
            .ok_or(BillingDomainError::AmountOutOfRange("invoice total"))?;
        let total_ht = round_money(sum);
        Ok(Self {
            total_ht,
            total_tva: Decimal::ZERO,
            total_ttc: total_ht,
        })
    }
}

/// Parameter object for opening a new draft invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDraftInvoice {
    /// Issuing user.
    pub user_id: UserId,
    /// Billed client.
    pub client_id: ClientId,
    /// Source project for project invoices.
    pub project_id: Option<ProjectId>,
    /// Issued number.
    pub number: InvoiceNumber,
    /// Origin of the invoice.
    pub kind: InvoiceKind,
    /// Invoice currency.
    pub currency: Currency,
    /// Payment deadline.
    pub due_date: DateTime<Utc>,
    /// Free-text note printed on the invoice.
    pub notes: Option<String>,
}

/// Invoice aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    user_id: UserId,
    client_id: ClientId,
    project_id: Option<ProjectId>,
    number: InvoiceNumber,
    status: InvoiceStatus,
    kind: InvoiceKind,
    currency: Currency,
    issue_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    notes: Option<String>,
    totals: InvoiceTotals,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedInvoiceData {
    /// Persisted invoice identifier.
    pub id: InvoiceId,
    /// Issuing user.
    pub user_id: UserId,
    /// Billed client.
    pub client_id: ClientId,
    /// Source project, if any.
    pub project_id: Option<ProjectId>,
    /// Issued number.
    pub number: InvoiceNumber,
    /// Payment status.
    pub status: InvoiceStatus,
    /// Origin of the invoice.
    pub kind: InvoiceKind,
    /// Invoice currency.
    pub currency: Currency,
    /// Issue timestamp.
    pub issue_date: DateTime<Utc>,
    /// Payment deadline.
    pub due_date: DateTime<Utc>,
    /// Free-text note.
    pub notes: Option<String>,
    /// Stored totals.
    pub totals: InvoiceTotals,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Opens an empty draft invoice issued now.
    #[must_use]
    pub fn draft(params: NewDraftInvoice, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: InvoiceId::new(),
            user_id: params.user_id,
            client_id: params.client_id,
            project_id: params.project_id,
            number: params.number,
            status: InvoiceStatus::Draft,
            kind: params.kind,
            currency: params.currency,
            issue_date: timestamp,
            due_date: params.due_date,
            notes: params.notes,
            totals: InvoiceTotals::ZERO,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs an invoice from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedInvoiceData) -> Self {
        Self {
            id: data.id,
            user_id: data.user_id,
            client_id: data.client_id,
            project_id: data.project_id,
            number: data.number,
            status: data.status,
            kind: data.kind,
            currency: data.currency,
            issue_date: data.issue_date,
            due_date: data.due_date,
            notes: data.notes,
            totals: data.totals,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the invoice identifier.
    #[must_use]
    pub const fn id(&self) -> InvoiceId {
        self.id
    }

    /// Returns the issuing user.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the billed client.
    #[must_use]
    pub const fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Returns the source project, if any.
    #[must_use]
    pub const fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    /// Returns the invoice number.
    #[must_use]
    pub const fn number(&self) -> &InvoiceNumber {
        &self.number
    }

    /// Returns the payment status.
    #[must_use]
    pub const fn status(&self) -> InvoiceStatus {
        self.status
    }

    /// Returns the invoice origin.
    #[must_use]
    pub const fn kind(&self) -> InvoiceKind {
        self.kind
    }

    /// Returns the invoice currency.
    #[must_use]
    pub const fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns the issue timestamp.
    #[must_use]
    pub const fn issue_date(&self) -> DateTime<Utc> {
        self.issue_date
    }

    /// Returns the payment deadline.
    #[must_use]
    pub const fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    /// Returns the invoice note, if any.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Returns the stored totals.
    #[must_use]
    pub const fn totals(&self) -> InvoiceTotals {
        self.totals
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

    /// Returns whether `user_id` issued this invoice.
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Replaces the stored totals.
    pub fn apply_totals(&mut self, totals: InvoiceTotals, clock: &impl Clock) {
        self.totals = totals;
        self.touch(clock);
    }

    /// Moves the invoice to another payment status.
    pub fn change_status(&mut self, status: InvoiceStatus, clock: &impl Clock) {
        self.status = status;
        self.touch(clock);
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
