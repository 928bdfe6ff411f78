//! Human-readable invoice numbers of the form `FAC-2026-007`.

use super::BillingDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix used when no other prefix is configured.
pub const DEFAULT_INVOICE_PREFIX: &str = "FAC";

/// Sequential invoice number, unique per user and calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvoiceNumber {
    prefix: String,
    year: i32,
    sequence: u32,
}

impl InvoiceNumber {
    /// Creates an invoice number.
    ///
    /// # Errors
    ///
    /// Returns [`BillingDomainError::MalformedInvoiceNumber`] when the prefix
    /// is empty or not alphanumeric, the year is outside `1000..=9999`, or
    /// the sequence is zero.
    pub fn new(
        prefix: impl Into<String>,
        year: i32,
        sequence: u32,
    ) -> Result<Self, BillingDomainError> {
        let label = prefix.into();
        let prefix_ok = !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric());
        if !prefix_ok || !(1000..=9999).contains(&year) || sequence == 0 {
            return Err(BillingDomainError::MalformedInvoiceNumber(format!(
                "{label}-{year}-{sequence:03}"
            )));
        }
        Ok(Self {
            prefix: label,
            year,
            sequence,
        })
    }

    /// Returns the prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the calendar year the number was issued in.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Returns the per-year sequence.
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{:03}", self.prefix, self.year, self.sequence)
    }
}

impl FromStr for InvoiceNumber {
    type Err = BillingDomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || BillingDomainError::MalformedInvoiceNumber(value.to_owned());
        let mut parts = value.trim().rsplitn(3, '-');
        let sequence_part = parts.next().ok_or_else(malformed)?;
        let year_part = parts.next().ok_or_else(malformed)?;
        let prefix = parts.next().ok_or_else(malformed)?;
        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if sequence_part.len() < 3
            || year_part.len() != 4
            || !all_digits(sequence_part)
            || !all_digits(year_part)
        {
            return Err(malformed());
        }
        let sequence = sequence_part.parse::<u32>().map_err(|_| malformed())?;
        let year = year_part.parse::<i32>().map_err(|_| malformed())?;
        Self::new(prefix, year, sequence).map_err(|_| malformed())
    }
}

impl TryFrom<String> for InvoiceNumber {
    type Error = BillingDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InvoiceNumber> for String {
    fn from(value: InvoiceNumber) -> Self {
        value.to_string()
    }
}
