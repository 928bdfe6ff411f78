//! Timer state controller: one running work session per user.

use super::{
    BillingError, BillingResult, ErrorKind,
    aggregator::completed_seconds_in,
    ownership::{owned_entry, owned_task},
};
use crate::billing::{
    domain::{ProjectId, TaskId, TimeEntry, TimeEntryId, UserId},
    ports::{BillingStore, BillingTransaction},
};
use mockable::Clock;
use serde::Serialize;
use std::sync::Arc;

/// Request payload for starting a timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTimerRequest {
    user_id: UserId,
    task_id: TaskId,
    description: Option<String>,
}

impl StartTimerRequest {
    /// Creates a request to time `task_id` for `user_id`.
    #[must_use]
    pub const fn new(user_id: UserId, task_id: TaskId) -> Self {
        Self {
            user_id,
            task_id,
            description: None,
        }
    }

    /// Sets a note describing the session.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A running session with its live figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveTimer {
    /// The running entry.
    pub entry: TimeEntry,
    /// Seconds since the entry started.
    pub elapsed_seconds: i64,
    /// Closed-session total already recorded on the same task.
    pub completed_seconds: i64,
}

/// Starts, stops and removes work sessions.
pub struct TimerService<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> Clone for TimerService<S, C>
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

impl<S, C> TimerService<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a new timer service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Opens a session on a task the user owns.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::NotFound`] when the task is missing or not the
    /// user's, and a [`ErrorKind::Conflict`] error when the user already has
    /// a running timer on any task.
    pub async fn start_timer(&self, request: StartTimerRequest) -> BillingResult<TimeEntry> {
        let StartTimerRequest {
            user_id,
            task_id,
            description,
        } = request;
        let clock = Arc::clone(&self.clock);
        let result = self
            .store
            .transaction(move |tx| {
                owned_task(tx, user_id, task_id)?;
                if tx.running_entry(user_id)?.is_some() {
                    return Err(BillingError::TimerAlreadyRunning(user_id));
                }
                let entry = TimeEntry::start(user_id, task_id, description, &*clock)?;
                tx.insert_entry(&entry)?;
                Ok(entry)
            })
            .await;

        match &result {
            Ok(entry) => tracing::info!(
                user_id = %user_id,
                task_id = %task_id,
                entry_id = %entry.id(),
                "timer started"
            ),
            Err(err) if err.kind() == ErrorKind::Conflict => tracing::warn!(
                user_id = %user_id,
                task_id = %task_id,
                "timer start rejected: a timer is already running"
            ),
            Err(_) => {}
        }
        result
    }

    /// Closes the user's running session on `task_id` and adds its duration
    /// to the task's hours.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::NotFound`] when no timer is running on the
    /// task for this user, including when it was already stopped.
    pub async fn stop_timer(&self, user_id: UserId, task_id: TaskId) -> BillingResult<TimeEntry> {
        let clock = Arc::clone(&self.clock);
        let entry = self
            .store
            .transaction(move |tx| {
                let running = tx
                    .running_entry(user_id)?
                    .filter(|entry| entry.task_id() == task_id)
                    .ok_or_else(|| BillingError::not_found("running timer", task_id))?;
                close_session(tx, running, &*clock)
            })
            .await?;
        log_stopped(&entry);
        Ok(entry)
    }

    /// Closes a specific running session.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::NotFound`] when the entry is missing, not the
    /// user's, or not running.
    pub async fn stop_entry(
        &self,
        user_id: UserId,
        entry_id: TimeEntryId,
    ) -> BillingResult<TimeEntry> {
        let clock = Arc::clone(&self.clock);
        let entry = self
            .store
            .transaction(move |tx| {
                let running = owned_entry(tx, user_id, entry_id)?;
                if !running.is_running() {
                    return Err(BillingError::not_found("running timer", entry_id));
                }
                close_session(tx, running, &*clock)
            })
            .await?;
        log_stopped(&entry);
        Ok(entry)
    }

    /// Returns the user's running session, optionally only when it belongs
    /// to `project_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::Store`] when the store fails.
    pub async fn active_timer(
        &self,
        user_id: UserId,
        project_id: Option<ProjectId>,
    ) -> BillingResult<Option<ActiveTimer>> {
        let now = self.clock.utc();
        self.store
            .transaction(move |tx| {
                let Some(entry) = tx.running_entry(user_id)? else {
                    return Ok(None);
                };
                if let Some(wanted) = project_id {
                    let on_project = tx
                        .find_task(entry.task_id())?
                        .is_some_and(|task| task.project_id() == wanted);
                    if !on_project {
                        return Ok(None);
                    }
                }
                let completed_seconds = completed_seconds_in(tx, user_id, entry.task_id())?;
                Ok(Some(ActiveTimer {
                    elapsed_seconds: entry.elapsed_seconds(now),
                    completed_seconds,
                    entry,
                }))
            })
            .await
    }

    /// Removes a closed session and takes its duration back off the task's
    /// hours.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::NotFound`] when the entry is missing or not
    /// the user's, and [`BillingError::EntryRunning`] when it is still
    /// running, in which case nothing changes.
    pub async fn delete_entry(
        &self,
        user_id: UserId,
        entry_id: TimeEntryId,
    ) -> BillingResult<TimeEntry> {
        let clock = Arc::clone(&self.clock);
        let result = self
            .store
            .transaction(move |tx| {
                let entry = owned_entry(tx, user_id, entry_id)?;
                if entry.is_running() {
                    return Err(BillingError::EntryRunning(entry_id));
                }
                if let Some(duration) = entry.duration_seconds() {
                    let mut task = tx
                        .find_task(entry.task_id())?
                        .ok_or_else(|| BillingError::not_found("task", entry.task_id()))?;
                    task.remove_session(duration, &*clock);
                    tx.update_task(&task)?;
                }
                tx.delete_entry(entry_id)?;
                Ok(entry)
            })
            .await;

        match &result {
            Ok(entry) => tracing::info!(
                user_id = %user_id,
                task_id = %entry.task_id(),
                entry_id = %entry_id,
                "time entry deleted"
            ),
            Err(BillingError::EntryRunning(_)) => tracing::warn!(
                user_id = %user_id,
                entry_id = %entry_id,
                "refused to delete a running time entry"
            ),
            Err(_) => {}
        }
        result
    }
}

fn close_session(
    tx: &mut dyn BillingTransaction,
    mut entry: TimeEntry,
    clock: &impl Clock,
) -> BillingResult<TimeEntry> {
    let duration = entry.stop(clock)?;
    let mut task = tx
        .find_task(entry.task_id())?
        .ok_or_else(|| BillingError::not_found("task", entry.task_id()))?;
    task.record_session(duration, clock);
    tx.update_task(&task)?;
    tx.update_entry(&entry)?;
    Ok(entry)
}

fn log_stopped(entry: &TimeEntry) {
    tracing::info!(
        user_id = %entry.user_id(),
        task_id = %entry.task_id(),
        entry_id = %entry.id(),
        duration_seconds = entry.duration_seconds().unwrap_or(0),
        "timer stopped"
    );
}
