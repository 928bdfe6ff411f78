//! Derived time totals over a user's work sessions.

use super::BillingResult;
use crate::billing::{
    domain::{DailyTimeStat, Page, StatsPeriod, TaskId, TimeEntry, TimeEntryQuery, UserId},
    ports::{BillingStore, BillingTransaction, StoreResult, TimeEntryFilter},
};
use chrono::{DateTime, NaiveDate, Utc};
use mockable::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only time aggregation service.
///
/// Totals are computed from stored entries on every call and never
/// persisted.
pub struct TimeAggregator<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> Clone for TimeAggregator<S, C>
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

impl<S, C> TimeAggregator<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a new aggregator.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Sums the durations of the user's closed sessions on a task.
    ///
    /// # Errors
    ///
    /// Returns [`super::BillingError::Store`] when the store fails.
    pub async fn completed_seconds(&self, task_id: TaskId, user_id: UserId) -> BillingResult<i64> {
        self.store
            .transaction(move |tx| Ok(completed_seconds_in(tx, user_id, task_id)?))
            .await
    }

    /// Completed seconds plus the elapsed time of a timer running on the
    /// task.
    ///
    /// The value grows with the clock while the timer runs.
    ///
    /// # Errors
    ///
    /// Returns [`super::BillingError::Store`] when the store fails.
    pub async fn total_seconds(&self, task_id: TaskId, user_id: UserId) -> BillingResult<i64> {
        let now = self.clock.utc();
        self.store
            .transaction(move |tx| Ok(total_seconds_in(tx, user_id, task_id, now)?))
            .await
    }

    /// Per-day completed totals within `period`, oldest day first.
    ///
    /// # Errors
    ///
    /// Returns [`super::BillingError::Store`] when the store fails.
    pub async fn time_stats(
        &self,
        user_id: UserId,
        period: StatsPeriod,
    ) -> BillingResult<Vec<DailyTimeStat>> {
        let window_start = period.window_start(self.clock.utc());
        self.store
            .transaction(move |tx| {
                let filter = TimeEntryFilter::for_user(user_id)
                    .completed()
                    .started_between(Some(window_start), None);
                let entries = tx.find_entries(&filter)?;
                Ok(daily_totals(&entries))
            })
            .await
    }

    /// Lists the user's sessions on a task, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`super::BillingError::Store`] when the store fails.
    pub async fn entries_for_task(
        &self,
        user_id: UserId,
        task_id: TaskId,
        query: TimeEntryQuery,
    ) -> BillingResult<Page<TimeEntry>> {
        self.store
            .transaction(move |tx| {
                let filter = TimeEntryFilter::for_user(user_id)
                    .on_task(task_id)
                    .started_between(query.started_from(), query.started_to());
                let total = tx.count_entries(&filter)?;
                let entries = tx.find_entries_page(&filter, query.offset(), query.limit())?;
                Ok(Page::new(entries, total, &query))
            })
            .await
    }
}

pub(crate) fn completed_seconds_in(
    tx: &mut dyn BillingTransaction,
    user_id: UserId,
    task_id: TaskId,
) -> StoreResult<i64> {
    let filter = TimeEntryFilter::for_user(user_id)
        .on_task(task_id)
        .completed();
    Ok(tx
        .find_entries(&filter)?
        .iter()
        .filter_map(TimeEntry::duration_seconds)
        .sum())
}

pub(crate) fn total_seconds_in(
    tx: &mut dyn BillingTransaction,
    user_id: UserId,
    task_id: TaskId,
    now: DateTime<Utc>,
) -> StoreResult<i64> {
    let completed = completed_seconds_in(tx, user_id, task_id)?;
    let running = tx
        .running_entry(user_id)?
        .filter(|entry| entry.task_id() == task_id)
        .map_or(0, |entry| entry.elapsed_seconds(now));
    Ok(completed.saturating_add(running))
}

fn daily_totals(entries: &[TimeEntry]) -> Vec<DailyTimeStat> {
    let mut days: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for entry in entries {
        let seconds = entry.duration_seconds().unwrap_or(0);
        let day = days.entry(entry.start_time().date_naive()).or_insert(0);
        *day = day.saturating_add(seconds);
    }
    days.into_iter()
        .map(|(date, total)| DailyTimeStat::new(date, total))
        .collect()
}
