//! Error types for billing domain validation and parsing.

use super::{InvoiceItemId, TaskId, TimeEntryId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors returned while constructing or mutating billing domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BillingDomainError {
    /// An identifier string is not a valid UUID.
    #[error("invalid {kind} identifier: '{value}'")]
    InvalidIdentifier {
        /// Identifier family, such as `task`.
        kind: &'static str,
        /// Raw rejected input.
        value: String,
    },

    /// A stored or requested enumeration value is unknown.
    #[error(transparent)]
    Parse(#[from] ParseBillingValueError),

    /// A monetary amount or quantity is negative.
    #[error("{field} must not be negative, got {value}")]
    NegativeAmount {
        /// Name of the rejected field.
        field: &'static str,
        /// Rejected value.
        value: Decimal,
    },

    /// An amount computed from valid inputs does not fit in a decimal.
    #[error("{0} is out of range")]
    AmountOutOfRange(&'static str),

    /// A free-text description exceeds the storage limit.
    #[error("description is {actual} characters long, limit is {max}")]
    DescriptionTooLong {
        /// Maximum accepted length in characters.
        max: usize,
        /// Length of the rejected description.
        actual: usize,
    },

    /// Pagination parameters are out of range.
    #[error("invalid pagination: page {page}, limit {limit}")]
    InvalidPagination {
        /// Requested page (1-based).
        page: u32,
        /// Requested page size.
        limit: u32,
    },

    /// A date filter has its lower bound after its upper bound.
    #[error("invalid date range: {from} is after {to}")]
    InvalidDateRange {
        /// Inclusive lower bound.
        from: DateTime<Utc>,
        /// Inclusive upper bound.
        to: DateTime<Utc>,
    },

    /// An invoice number does not follow the `PREFIX-YYYY-NNN` format.
    #[error("malformed invoice number: '{0}'")]
    MalformedInvoiceNumber(String),

    /// The time entry is not running and cannot be stopped.
    #[error("time entry {0} is not running")]
    EntryNotRunning(TimeEntryId),

    /// The task has already been billed.
    #[error("task {0} is already billed")]
    TaskAlreadyBilled(TaskId),

    /// A line item update carried no changes.
    #[error("invoice item {0} update contains no changes")]
    EmptyItemRevision(InvoiceItemId),
}

/// Error returned while parsing billing enumerations from text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseBillingValueError {
    /// Enumeration being parsed, such as `task status`.
    pub kind: &'static str,
    /// Raw rejected input.
    pub value: String,
}

impl ParseBillingValueError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}
