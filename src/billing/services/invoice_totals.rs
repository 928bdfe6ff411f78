//! Invoice line items and the totals derived from them.
//!
//! Every item mutation and the recomputation of its invoice's totals commit
//! in the same unit of work, so stored totals always match the stored items.

use super::{
    BillingError, BillingResult,
    aggregator::total_seconds_in,
    ownership::{owned_invoice, owned_task},
};
use crate::billing::{
    domain::{
        Invoice, InvoiceId, InvoiceItem, InvoiceItemId, InvoiceItemRevision, InvoiceStatus,
        InvoiceTotals, NewInvoiceItem, TaskId, UserId, hours_from_seconds,
    },
    ports::{BillingStore, BillingTransaction},
};
use mockable::Clock;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Request payload for adding a line item to an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateItemRequest {
    user_id: UserId,
    invoice_id: InvoiceId,
    unit_price: Decimal,
    task_id: Option<TaskId>,
    description: Option<String>,
    hours: Option<Decimal>,
}

impl CreateItemRequest {
    /// Creates a request for a line priced at `unit_price`.
    #[must_use]
    pub const fn new(user_id: UserId, invoice_id: InvoiceId, unit_price: Decimal) -> Self {
        Self {
            user_id,
            invoice_id,
            unit_price,
            task_id: None,
            description: None,
            hours: None,
        }
    }

    /// Bills the line against a task; without explicit hours the task's
    /// tracked time is used.
    #[must_use]
    pub const fn for_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Sets the line label.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the quantity explicitly. Zero is kept as zero.
    #[must_use]
    pub const fn with_hours(mut self, hours: Decimal) -> Self {
        self.hours = Some(hours);
        self
    }
}

/// Request payload for revising a line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateItemRequest {
    user_id: UserId,
    item_id: InvoiceItemId,
    revision: InvoiceItemRevision,
}

impl UpdateItemRequest {
    /// Creates an empty revision of `item_id`.
    #[must_use]
    pub fn new(user_id: UserId, item_id: InvoiceItemId) -> Self {
        Self {
            user_id,
            item_id,
            revision: InvoiceItemRevision::default(),
        }
    }

    /// Replaces the quantity.
    #[must_use]
    pub const fn with_hours(mut self, hours: Decimal) -> Self {
        self.revision.quantity = Some(hours);
        self
    }

    /// Replaces the unit price.
    #[must_use]
    pub const fn with_unit_price(mut self, unit_price: Decimal) -> Self {
        self.revision.unit_price = Some(unit_price);
        self
    }

    /// Replaces the label.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.revision.description = Some(description.into());
        self
    }
}

/// Line item and totals service.
pub struct InvoiceService<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> Clone for InvoiceService<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, C> InvoiceService<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a new invoice service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Recomputes and stores an invoice's totals from its current items.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::NotFound`] when the invoice does not exist.
    pub async fn recalculate(&self, invoice_id: InvoiceId) -> BillingResult<InvoiceTotals> {
        let clock = Arc::clone(&self.clock);
        self.store
            .transaction(move |tx| {
                let invoice = tx
                    .find_invoice(invoice_id)?
                    .ok_or_else(|| BillingError::not_found("invoice", invoice_id))?;
                Ok(recalculate_in(tx, invoice, &*clock)?.totals())
            })
            .await
    }

    /// Loads one of the user's invoices.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::NotFound`] when the invoice is missing or not
    /// the user's.
    pub async fn invoice(&self, user_id: UserId, invoice_id: InvoiceId) -> BillingResult<Invoice> {
        self.store
            .transaction(move |tx| owned_invoice(tx, user_id, invoice_id))
            .await
    }

    /// Adds a priced line to an invoice and refreshes its totals.
    ///
    /// Quantity is the explicit hours when given, otherwise the task's
    /// tracked time (running timer included), otherwise zero. The label
    /// falls back to the task title, then to
    /// [`crate::billing::domain::DEFAULT_ITEM_DESCRIPTION`].
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::NotFound`] when the invoice or the task is not
    /// the user's, and [`BillingError::Domain`] for negative amounts.
    pub async fn create_item(&self, request: CreateItemRequest) -> BillingResult<InvoiceItem> {
        let clock = Arc::clone(&self.clock);
        let item = self
            .store
            .transaction(move |tx| -> BillingResult<_> {
                let CreateItemRequest {
                    user_id,
                    invoice_id,
                    unit_price,
                    task_id,
                    description,
                    hours,
                } = request;
                let invoice = owned_invoice(tx, user_id, invoice_id)?;
                let task = task_id
                    .map(|id| owned_task(tx, user_id, id))
                    .transpose()?
                    .map(|(owned, _)| owned);
                let quantity = match (hours, &task) {
                    (Some(explicit), _) => explicit,
                    (None, Some(billed)) => {
                        let now = clock.utc();
                        hours_from_seconds(total_seconds_in(tx, user_id, billed.id(), now)?)
                    }
                    (None, None) => Decimal::ZERO,
                };
                let label = description
                    .filter(|text| !text.trim().is_empty())
                    .or_else(|| task.as_ref().map(|billed| billed.title().to_owned()));
                let item = InvoiceItem::new(
                    NewInvoiceItem {
                        invoice_id,
                        task_id,
                        description: label,
                        quantity,
                        unit_price,
                    },
                    &*clock,
                )?;
                tx.insert_item(&item)?;
                recalculate_in(tx, invoice, &*clock)?;
                Ok(item)
            })
            .await?;
        tracing::info!(
            invoice_id = %item.invoice_id(),
            item_id = %item.id(),
            total = %item.total(),
            "invoice item created"
        );
        Ok(item)
    }

    /// Revises a line item and refreshes its invoice's totals.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::NotFound`] when the item is missing or its
    /// invoice is not the user's, and [`BillingError::Domain`] for an empty
    /// revision or negative amounts.
    pub async fn update_item(&self, request: UpdateItemRequest) -> BillingResult<InvoiceItem> {
        let clock = Arc::clone(&self.clock);
        self.store
            .transaction(move |tx| {
                let UpdateItemRequest {
                    user_id,
                    item_id,
                    revision,
                } = request;
                let (mut item, invoice) = owned_item(tx, user_id, item_id)?;
                item.revise(revision, &*clock)?;
                tx.update_item(&item)?;
                recalculate_in(tx, invoice, &*clock)?;
                Ok(item)
            })
            .await
    }

    /// Removes a line item and refreshes its invoice's totals.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::NotFound`] when the item is missing or its
    /// invoice is not the user's.
    pub async fn delete_item(
        &self,
        user_id: UserId,
        item_id: InvoiceItemId,
    ) -> BillingResult<InvoiceItem> {
        let clock = Arc::clone(&self.clock);
        self.store
            .transaction(move |tx| {
                let (item, invoice) = owned_item(tx, user_id, item_id)?;
                tx.delete_item(item_id)?;
                recalculate_in(tx, invoice, &*clock)?;
                Ok(item)
            })
            .await
    }

    /// Lists an invoice's items in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::NotFound`] when the invoice is not the user's.
    pub async fn items_for_invoice(
        &self,
        user_id: UserId,
        invoice_id: InvoiceId,
    ) -> BillingResult<Vec<InvoiceItem>> {
        self.store
            .transaction(move |tx| {
                owned_invoice(tx, user_id, invoice_id)?;
                Ok(tx.invoice_items(invoice_id)?)
            })
            .await
    }

    /// Moves an invoice to `status`, leaving its totals untouched.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::NotFound`] when the invoice is not the user's.
    pub async fn set_invoice_status(
        &self,
        user_id: UserId,
        invoice_id: InvoiceId,
        status: InvoiceStatus,
    ) -> BillingResult<Invoice> {
        let clock = Arc::clone(&self.clock);
        let invoice = self
            .store
            .transaction(move |tx| -> BillingResult<_> {
                let mut invoice = owned_invoice(tx, user_id, invoice_id)?;
                invoice.change_status(status, &*clock);
                tx.update_invoice(&invoice)?;
                Ok(invoice)
            })
            .await?;
        tracing::info!(
            invoice_id = %invoice_id,
            status = invoice.status().as_str(),
            "invoice status changed"
        );
        Ok(invoice)
    }
}

fn owned_item(
    tx: &mut dyn BillingTransaction,
    user_id: UserId,
    item_id: InvoiceItemId,
) -> BillingResult<(InvoiceItem, Invoice)> {
    let item = tx
        .find_item(item_id)?
        .ok_or_else(|| BillingError::not_found("invoice item", item_id))?;
    let invoice = tx
        .find_invoice(item.invoice_id())?
        .filter(|invoice| invoice.is_owned_by(user_id))
        .ok_or_else(|| BillingError::not_found("invoice item", item_id))?;
    Ok((item, invoice))
}

/// Sums the invoice's stored items into its totals and persists them.
pub(crate) fn recalculate_in(
    tx: &mut dyn BillingTransaction,
    mut invoice: Invoice,
    clock: &impl Clock,
) -> BillingResult<Invoice> {
    let items = tx.invoice_items(invoice.id())?;
    let totals = InvoiceTotals::from_line_totals(items.iter().map(InvoiceItem::total))?;
    invoice.apply_totals(totals, clock);
    tx.update_invoice(&invoice)?;
    tracing::debug!(
        invoice_id = %invoice.id(),
        items = items.len(),
        total_ht = %totals.total_ht,
        "invoice totals recalculated"
    );
    Ok(invoice)
}
