//! Work sessions recorded by the task timer.

use super::{BillingDomainError, TaskId, TimeEntryId, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Maximum length of a session description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// One work session on a task.
///
/// A session is open (`is_running`) from the moment the timer starts until
/// it is stopped. Stopping fixes `end_time` and `duration_seconds`; neither
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    id: TimeEntryId,
    user_id: UserId,
    task_id: TaskId,
    description: Option<String>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    duration_seconds: Option<i64>,
    is_running: bool,
}

/// Parameter object for reconstructing a persisted time entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTimeEntryData {
    /// Persisted entry identifier.
    pub id: TimeEntryId,
    /// User who tracked the session.
    pub user_id: UserId,
    /// Task the session was tracked against.
    pub task_id: TaskId,
    /// Optional free-text note.
    pub description: Option<String>,
    /// Session start.
    pub start_time: DateTime<Utc>,
    /// Session end, once stopped.
    pub end_time: Option<DateTime<Utc>>,
    /// Whole seconds between start and end, once stopped.
    pub duration_seconds: Option<i64>,
    /// Whether the session is still open.
    pub is_running: bool,
}

impl TimeEntry {
    /// Opens a new session starting now.
    ///
    /// The description is trimmed and dropped when empty.
    ///
    /// # Errors
    ///
    /// Returns [`BillingDomainError::DescriptionTooLong`] when the trimmed
    /// description exceeds [`MAX_DESCRIPTION_CHARS`].
    pub fn start(
        user_id: UserId,
        task_id: TaskId,
        description: Option<String>,
        clock: &impl Clock,
    ) -> Result<Self, BillingDomainError> {
        Ok(Self {
            id: TimeEntryId::new(),
            user_id,
            task_id,
            description: normalize_description(description)?,
            start_time: clock.utc(),
            end_time: None,
            duration_seconds: None,
            is_running: true,
        })
    }

    /// Reconstructs an entry from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTimeEntryData) -> Self {
        Self {
            id: data.id,
            user_id: data.user_id,
            task_id: data.task_id,
            description: data.description,
            start_time: data.start_time,
            end_time: data.end_time,
            duration_seconds: data.duration_seconds,
            is_running: data.is_running,
        }
    }

    /// Returns the entry identifier.
    #[must_use]
    pub const fn id(&self) -> TimeEntryId {
        self.id
    }

    /// Returns the user who tracked the session.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the task the session belongs to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the session note, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the session start.
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Returns the session end, once stopped.
    #[must_use]
    pub const fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Returns the recorded duration in seconds, once stopped.
    #[must_use]
    pub const fn duration_seconds(&self) -> Option<i64> {
        self.duration_seconds
    }

    /// Returns whether the session is still open.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.is_running
    }

    /// Seconds elapsed since the session started, as of `now`.
    ///
    /// Clock skew that places `now` before the start yields zero.
    #[must_use]
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        whole_seconds_between(self.start_time, now)
    }

    /// Closes the session at the current instant and returns its duration.
    ///
    /// # Errors
    ///
    /// Returns [`BillingDomainError::EntryNotRunning`] when the session has
    /// already been stopped.
    pub fn stop(&mut self, clock: &impl Clock) -> Result<i64, BillingDomainError> {
        if !self.is_running {
            return Err(BillingDomainError::EntryNotRunning(self.id));
        }
        let end_time = clock.utc();
        let duration = whole_seconds_between(self.start_time, end_time);
        self.end_time = Some(end_time);
        self.duration_seconds = Some(duration);
        self.is_running = false;
        Ok(duration)
    }
}

/// Whole seconds from `start` to `end`, clamped at zero.
fn whole_seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    // `num_seconds` truncates toward zero, which equals flooring for the
    // non-negative spans that survive the clamp.
    end.signed_duration_since(start).num_seconds().max(0)
}

fn normalize_description(
    description: Option<String>,
) -> Result<Option<String>, BillingDomainError> {
    let Some(raw) = description else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let length = trimmed.chars().count();
    if length > MAX_DESCRIPTION_CHARS {
        return Err(BillingDomainError::DescriptionTooLong {
            max: MAX_DESCRIPTION_CHARS,
            actual: length,
        });
    }
    Ok(Some(trimmed.to_owned()))
}
