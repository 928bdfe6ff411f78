//! Sequential invoice numbers per user and calendar year.

use super::BillingResult;
use crate::billing::{
    domain::{InvoiceNumber, UserId},
    ports::{BillingStore, BillingTransaction},
};
use chrono::{DateTime, Datelike, Utc};
use mockable::Clock;
use std::sync::Arc;

/// Issues invoice numbers from the store's atomic per-year counter.
pub struct InvoiceNumberingService<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    store: Arc<S>,
    clock: Arc<C>,
    prefix: Arc<str>,
}

impl<S, C> Clone for InvoiceNumberingService<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            prefix: Arc::clone(&self.prefix),
        }
    }
}

impl<S, C> InvoiceNumberingService<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a numbering service issuing `{prefix}-{year}-{sequence}`.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>, prefix: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            clock,
            prefix: prefix.into(),
        }
    }

    /// Reserves the user's next invoice number for the current year.
    ///
    /// A reserved number is never issued again, even when no invoice ends
    /// up carrying it.
    ///
    /// # Errors
    ///
    /// Returns [`super::BillingError::Store`] when the counter cannot be
    /// advanced and [`super::BillingError::Domain`] when the configured
    /// prefix is malformed.
    pub async fn generate_invoice_number(&self, user_id: UserId) -> BillingResult<InvoiceNumber> {
        let now = self.clock.utc();
        let prefix = Arc::clone(&self.prefix);
        let number = self
            .store
            .transaction(move |tx| issue_number_in(tx, user_id, &prefix, now))
            .await?;
        tracing::debug!(user_id = %user_id, number = %number, "invoice number reserved");
        Ok(number)
    }
}

pub(crate) fn issue_number_in(
    tx: &mut dyn BillingTransaction,
    user_id: UserId,
    prefix: &str,
    now: DateTime<Utc>,
) -> BillingResult<InvoiceNumber> {
    let year = now.year();
    let sequence = tx.next_invoice_sequence(user_id, year)?;
    Ok(InvoiceNumber::new(prefix, year, sequence)?)
}
