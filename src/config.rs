//! Runtime configuration for the billing engine.
//!
//! Values are read from `TIMEBILL_`-prefixed environment variables:
//!
//! - `TIMEBILL_DEFAULT_CURRENCY`: `EUR`, `MAD` or `USD` (default `EUR`)
//! - `TIMEBILL_PAYMENT_TERMS_DAYS`: days until an auto-created invoice is due
//!   (default 30)
//! - `TIMEBILL_INVOICE_PREFIX`: alphanumeric invoice number prefix (default
//!   `FAC`)

use crate::billing::domain::{Currency, DEFAULT_INVOICE_PREFIX, InvoiceNumber};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable prefix for billing settings.
pub const ENV_PREFIX: &str = "TIMEBILL_";

const DEFAULT_PAYMENT_TERMS_DAYS: u32 = 30;
const MAX_PAYMENT_TERMS_DAYS: u32 = 3_650;

/// Billing engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BillingConfig {
    /// Currency used when the user has not chosen one.
    #[serde(default)]
    pub default_currency: Currency,
    /// Days between issue date and due date for auto-created invoices.
    #[serde(default = "default_payment_terms_days")]
    pub payment_terms_days: u32,
    /// Prefix of issued invoice numbers.
    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            default_currency: Currency::default(),
            payment_terms_days: DEFAULT_PAYMENT_TERMS_DAYS,
            invoice_prefix: default_invoice_prefix(),
        }
    }
}

impl BillingConfig {
    /// Loads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable cannot be parsed or a value is
    /// out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        envy::prefixed(ENV_PREFIX)
            .from_env::<Self>()?
            .validated()
    }

    /// Loads settings from explicit key/value pairs using the same rules as
    /// [`BillingConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value cannot be parsed or is out of
    /// range.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter::<_, Self>(vars)?
            .validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if InvoiceNumber::new(self.invoice_prefix.as_str(), 2000, 1).is_err() {
            return Err(ConfigError::InvalidPrefix(self.invoice_prefix));
        }
        if self.payment_terms_days > MAX_PAYMENT_TERMS_DAYS {
            return Err(ConfigError::PaymentTermsOutOfRange(self.payment_terms_days));
        }
        Ok(self)
    }
}

/// Errors raised while loading [`BillingConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is malformed.
    #[error("invalid billing environment: {0}")]
    Environment(#[from] envy::Error),

    /// The invoice prefix is empty or contains non-alphanumeric characters.
    #[error("invalid invoice prefix: '{0}'")]
    InvalidPrefix(String),

    /// Payment terms exceed ten years.
    #[error("payment terms of {0} days are out of range")]
    PaymentTermsOutOfRange(u32),
}

const fn default_payment_terms_days() -> u32 {
    DEFAULT_PAYMENT_TERMS_DAYS
}

fn default_invoice_prefix() -> String {
    DEFAULT_INVOICE_PREFIX.to_owned()
}
