//! Task aggregate as seen by time tracking and billing.

use super::{
    BillingDomainError, ParseBillingValueError, ProjectId, TaskId, ensure_non_negative,
    hours_from_seconds,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Task workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    Todo,
    /// Being worked on.
    InProgress,
    /// Awaiting client or peer review.
    InReview,
    /// Finished; eligible for billing.
    Completed,
    /// Suspended.
    OnHold,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::InReview => "in_review",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
        }
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseBillingValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "in_review" => Ok(Self::InReview),
            "completed" => Ok(Self::Completed),
            "on_hold" => Ok(Self::OnHold),
            _ => Err(ParseBillingValueError::new("task status", value)),
        }
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    project_id: ProjectId,
    title: String,
    status: TaskStatus,
    hours_worked: Decimal,
    hourly_rate: Option<Decimal>,
    is_billed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Task title.
    pub title: String,
    /// Workflow status.
    pub status: TaskStatus,
    /// Accumulated hours from completed sessions.
    pub hours_worked: Decimal,
    /// Task-level hourly rate.
    pub hourly_rate: Option<Decimal>,
    /// Whether the task has been invoiced.
    pub is_billed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new unbilled task with no tracked time.
    #[must_use]
    pub fn new(project_id: ProjectId, title: impl Into<String>, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: TaskId::new(),
            project_id,
            title: title.into(),
            status: TaskStatus::Todo,
            hours_worked: Decimal::ZERO,
            hourly_rate: None,
            is_billed: false,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Sets the task-level hourly rate.
    ///
    /// # Errors
    ///
    /// Returns [`BillingDomainError::NegativeAmount`] for a negative rate.
    pub fn with_hourly_rate(mut self, rate: Decimal) -> Result<Self, BillingDomainError> {
        self.hourly_rate = Some(ensure_non_negative("hourly_rate", rate)?);
        Ok(self)
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            title: data.title,
            status: data.status,
            hours_worked: data.hours_worked,
            hourly_rate: data.hourly_rate,
            is_billed: data.is_billed,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the workflow status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the accumulated hours from completed sessions.
    #[must_use]
    pub const fn hours_worked(&self) -> Decimal {
        self.hours_worked
    }

    /// Returns the task-level hourly rate, if any.
    #[must_use]
    pub const fn hourly_rate(&self) -> Option<Decimal> {
        self.hourly_rate
    }

    /// Returns whether the task has been invoiced.
    #[must_use]
    pub const fn is_billed(&self) -> bool {
        self.is_billed
    }

    /// Returns whether the task is completed and not yet invoiced.
    #[must_use]
    pub fn is_billable(&self) -> bool {
        self.status == TaskStatus::Completed && !self.is_billed
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Moves the task to `status` and returns the previous status.
    ///
    /// Any status may follow any other; only the move into
    /// [`TaskStatus::Completed`] carries billing consequences, and those are
    /// applied by the auto-billing service.
    pub fn change_status(&mut self, status: TaskStatus, clock: &impl Clock) -> TaskStatus {
        let previous = self.status;
        self.status = status;
        self.touch(clock);
        previous
    }

    /// Adds a closed work session to the hour counter.
    pub fn record_session(&mut self, duration_seconds: i64, clock: &impl Clock) {
        self.hours_worked = self
            .hours_worked
            .saturating_add(hours_from_seconds(duration_seconds));
        self.touch(clock);
    }

    /// Removes a deleted work session from the hour counter, never going
    /// below zero.
    pub fn remove_session(&mut self, duration_seconds: i64, clock: &impl Clock) {
        let remaining = self
            .hours_worked
            .saturating_sub(hours_from_seconds(duration_seconds));
        self.hours_worked = remaining.max(Decimal::ZERO);
        self.touch(clock);
    }

    /// Flags the task as invoiced.
    ///
    /// # Errors
    ///
    /// Returns [`BillingDomainError::TaskAlreadyBilled`] when the flag is
    /// already set; the flag never reverts.
    pub fn mark_billed(&mut self, clock: &impl Clock) -> Result<(), BillingDomainError> {
        if self.is_billed {
            return Err(BillingDomainError::TaskAlreadyBilled(self.id));
        }
        self.is_billed = true;
        self.touch(clock);
        Ok(())
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
