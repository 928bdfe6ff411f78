//! Reporting windows, daily totals and paginated queries over time entries.

use super::{BillingDomainError, ParseBillingValueError};
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Reporting window for time statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsPeriod {
    /// Since midnight today.
    Today,
    /// Since midnight on the most recent Sunday.
    #[default]
    Week,
    /// Since midnight on the first of the month.
    Month,
}

impl StatsPeriod {
    /// Returns the canonical request representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// Start of the window containing `now`, in UTC.
    #[must_use]
    pub fn window_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let first_day = match self {
            Self::Today => today,
            Self::Week => today
                .checked_sub_days(Days::new(u64::from(
                    today.weekday().num_days_from_sunday(),
                )))
                .unwrap_or(today),
            Self::Month => today.with_day(1).unwrap_or(today),
        };
        first_day.and_time(NaiveTime::MIN).and_utc()
    }
}

impl TryFrom<&str> for StatsPeriod {
    type Error = ParseBillingValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            _ => Err(ParseBillingValueError::new("stats period", value)),
        }
    }
}

/// Completed tracked time for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTimeStat {
    /// Calendar day (UTC) the sessions started on.
    pub date: NaiveDate,
    /// Sum of completed session durations.
    pub total_seconds: i64,
    /// `total_seconds` rendered as `HH:MM:SS`.
    pub formatted: String,
}

impl DailyTimeStat {
    /// Builds a day total with its formatted duration.
    #[must_use]
    pub fn new(date: NaiveDate, total_seconds: i64) -> Self {
        Self {
            date,
            total_seconds,
            formatted: format_duration(total_seconds),
        }
    }
}

/// Renders seconds as zero-padded `HH:MM:SS`; hours grow past two digits.
#[must_use]
pub fn format_duration(seconds: i64) -> String {
    let clamped = seconds.max(0);
    let hours = clamped.div_euclid(3_600);
    let minutes = clamped.rem_euclid(3_600).div_euclid(60);
    let secs = clamped.rem_euclid(60);
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Default page size for time entry listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Validated listing request for a task's time entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeEntryQuery {
    page: u32,
    limit: u32,
    started_from: Option<DateTime<Utc>>,
    started_to: Option<DateTime<Utc>>,
}

impl TimeEntryQuery {
    /// Creates a query for the given 1-based page and page size.
    ///
    /// # Errors
    ///
    /// Returns [`BillingDomainError::InvalidPagination`] when `page` is zero
    /// or `limit` is outside `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, limit: u32) -> Result<Self, BillingDomainError> {
        if page == 0 || limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(BillingDomainError::InvalidPagination { page, limit });
        }
        Ok(Self {
            page,
            limit,
            started_from: None,
            started_to: None,
        })
    }

    /// Restricts results to sessions started within `[from, to]`.
    ///
    /// # Errors
    ///
    /// Returns [`BillingDomainError::InvalidDateRange`] when both bounds are
    /// set and `from` is after `to`.
    pub fn with_start_range(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Self, BillingDomainError> {
        if let (Some(lower), Some(upper)) = (from, to) {
            if lower > upper {
                return Err(BillingDomainError::InvalidDateRange {
                    from: lower,
                    to: upper,
                });
            }
        }
        self.started_from = from;
        self.started_to = to;
        Ok(self)
    }

    /// Returns the 1-based page.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Returns the page size.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns the inclusive lower bound on start time.
    #[must_use]
    pub const fn started_from(&self) -> Option<DateTime<Utc>> {
        self.started_from
    }

    /// Returns the inclusive upper bound on start time.
    #[must_use]
    pub const fn started_to(&self) -> Option<DateTime<Utc>> {
        self.started_to
    }

    /// Number of rows to skip before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for TimeEntryQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            started_from: None,
            started_to: None,
        }
    }
}

/// One page of results plus paging metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    /// Rows matching the query across all pages.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Number of pages needed for `total` rows.
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Wraps one fetched page of `items` out of `total` matching rows.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, query: &TimeEntryQuery) -> Self {
        Self {
            items,
            total,
            page: query.page(),
            limit: query.limit(),
            total_pages: total.div_ceil(u64::from(query.limit())),
        }
    }
}
