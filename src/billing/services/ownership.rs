//! Ownership lookups shared by billing services.
//!
//! Records owned by another user are reported as missing, except where a
//! project is addressed for billing, which reports [`BillingError::Forbidden`].

use super::{BillingError, BillingResult};
use crate::billing::{
    domain::{Invoice, InvoiceId, Project, ProjectId, Task, TaskId, TimeEntry, TimeEntryId, UserId},
    ports::BillingTransaction,
};

/// Loads a task whose project belongs to `user_id`.
pub(crate) fn owned_task(
    tx: &mut dyn BillingTransaction,
    user_id: UserId,
    task_id: TaskId,
) -> BillingResult<(Task, Project)> {
    let task = tx
        .find_task(task_id)?
        .ok_or_else(|| BillingError::not_found("task", task_id))?;
    let project = tx
        .find_project(task.project_id())?
        .filter(|project| project.is_owned_by(user_id))
        .ok_or_else(|| BillingError::not_found("task", task_id))?;
    Ok((task, project))
}

/// Loads a task for a billing action, rejecting tasks of other users'
/// projects as forbidden.
pub(crate) fn billable_task(
    tx: &mut dyn BillingTransaction,
    user_id: UserId,
    task_id: TaskId,
) -> BillingResult<(Task, Project)> {
    let task = tx
        .find_task(task_id)?
        .ok_or_else(|| BillingError::not_found("task", task_id))?;
    let project = authorized_project(tx, user_id, task.project_id())?;
    Ok((task, project))
}

/// Loads a project, rejecting projects of other users as forbidden.
pub(crate) fn authorized_project(
    tx: &mut dyn BillingTransaction,
    user_id: UserId,
    project_id: ProjectId,
) -> BillingResult<Project> {
    let project = tx
        .find_project(project_id)?
        .ok_or_else(|| BillingError::not_found("project", project_id))?;
    if !project.is_owned_by(user_id) {
        return Err(BillingError::Forbidden {
            user_id,
            project_id,
        });
    }
    Ok(project)
}

/// Loads an invoice belonging to `user_id`.
pub(crate) fn owned_invoice(
    tx: &mut dyn BillingTransaction,
    user_id: UserId,
    invoice_id: InvoiceId,
) -> BillingResult<Invoice> {
    tx.find_invoice(invoice_id)?
        .filter(|invoice| invoice.is_owned_by(user_id))
        .ok_or_else(|| BillingError::not_found("invoice", invoice_id))
}

/// Loads a time entry belonging to `user_id`.
pub(crate) fn owned_entry(
    tx: &mut dyn BillingTransaction,
    user_id: UserId,
    entry_id: TimeEntryId,
) -> BillingResult<TimeEntry> {
    tx.find_entry(entry_id)?
        .filter(|entry| entry.user_id() == user_id)
        .ok_or_else(|| BillingError::not_found("time entry", entry_id))
}
