//! Single entry point wiring the billing services to one store and clock.

use super::{
    AutoBillingService, InvoiceNumberingService, InvoiceService, TimeAggregator, TimerService,
};
use crate::billing::ports::BillingStore;
use crate::config::BillingConfig;
use mockable::Clock;
use std::sync::Arc;

/// The billing engine: every service sharing one store, clock and
/// configuration.
pub struct BillingEngine<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    timer: TimerService<S, C>,
    aggregator: TimeAggregator<S, C>,
    invoices: InvoiceService<S, C>,
    auto_billing: AutoBillingService<S, C>,
    numbering: InvoiceNumberingService<S, C>,
}

impl<S, C> Clone for BillingEngine<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            timer: self.timer.clone(),
            aggregator: self.aggregator.clone(),
            invoices: self.invoices.clone(),
            auto_billing: self.auto_billing.clone(),
            numbering: self.numbering.clone(),
        }
    }
}

impl<S, C> BillingEngine<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    /// Builds every service over `store` and `clock`.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>, config: BillingConfig) -> Self {
        let prefix = config.invoice_prefix.clone();
        let shared_config = Arc::new(config);
        Self {
            timer: TimerService::new(Arc::clone(&store), Arc::clone(&clock)),
            aggregator: TimeAggregator::new(Arc::clone(&store), Arc::clone(&clock)),
            invoices: InvoiceService::new(Arc::clone(&store), Arc::clone(&clock)),
            auto_billing: AutoBillingService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                shared_config,
            ),
            numbering: InvoiceNumberingService::new(store, clock, prefix),
        }
    }

    /// Timer state controller.
    #[must_use]
    pub const fn timer(&self) -> &TimerService<S, C> {
        &self.timer
    }

    /// Time aggregator.
    #[must_use]
    pub const fn aggregator(&self) -> &TimeAggregator<S, C> {
        &self.aggregator
    }

    /// Invoice item and totals service.
    #[must_use]
    pub const fn invoices(&self) -> &InvoiceService<S, C> {
        &self.invoices
    }

    /// Auto-billing orchestrator.
    #[must_use]
    pub const fn auto_billing(&self) -> &AutoBillingService<S, C> {
        &self.auto_billing
    }

    /// Invoice numbering.
    #[must_use]
    pub const fn numbering(&self) -> &InvoiceNumberingService<S, C> {
        &self.numbering
    }
}
