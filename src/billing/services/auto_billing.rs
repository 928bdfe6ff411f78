//! Turns completed work into invoice lines, exactly once per task.

use super::{
    BillingError, BillingResult,
    invoice_totals::recalculate_in,
    numbering::issue_number_in,
    ownership::{authorized_project, billable_task},
};
use crate::billing::{
    domain::{
        BillingProfile, BillingType, Invoice, InvoiceItem, InvoiceKind, NewDraftInvoice,
        NewInvoiceItem, Project, ProjectId, ProjectStatus, Task, TaskId, TaskStatus, UserId,
        round_money,
    },
    ports::{BillingStore, BillingTransaction},
};
use crate::config::BillingConfig;
use chrono::{Days, Utc};
use mockable::Clock;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Invoice line produced when a task reached completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoBilledTask {
    /// Draft invoice that received the line, totals included.
    pub invoice: Invoice,
    /// The new line.
    pub item: InvoiceItem,
    /// Whether the draft invoice was created for this task.
    pub invoice_created: bool,
}

/// Outcome of a task status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatusUpdate {
    /// The task after the change.
    pub task: Task,
    /// Status before the change.
    pub previous_status: TaskStatus,
    /// Billing performed as a consequence, if any.
    pub billing: Option<AutoBilledTask>,
}

/// Invoice covering every billable task of a completed project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInvoice {
    /// The new draft invoice, totals included.
    pub invoice: Invoice,
    /// One line per billed task.
    pub items: Vec<InvoiceItem>,
}

/// Auto-billing orchestrator.
pub struct AutoBillingService<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    store: Arc<S>,
    clock: Arc<C>,
    config: Arc<BillingConfig>,
}

impl<S, C> Clone for AutoBillingService<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, C> AutoBillingService<S, C>
where
    S: BillingStore,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a new auto-billing service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>, config: Arc<BillingConfig>) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Changes a task's status; moving an unbilled task into
    /// [`TaskStatus::Completed`] bills its hours onto the project's draft
    /// invoice.
    ///
    /// The status change, any invoice or line creation and the billed flag
    /// commit together. Repeating the call for an already billed task only
    /// records the status.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::NotFound`] for an unknown task and
    /// [`BillingError::Forbidden`] when the task's project is not the
    /// caller's.
    pub async fn update_task_status(
        &self,
        user_id: UserId,
        task_id: TaskId,
        status: TaskStatus,
    ) -> BillingResult<TaskStatusUpdate> {
        let clock = Arc::clone(&self.clock);
        let config = Arc::clone(&self.config);
        let update = self
            .store
            .transaction(move |tx| -> BillingResult<_> {
                let (mut task, project) = billable_task(tx, user_id, task_id)?;
                let previous_status = task.change_status(status, &*clock);
                let enters_completed =
                    status == TaskStatus::Completed && previous_status != TaskStatus::Completed;
                let billing = if enters_completed && !task.is_billed() {
                    Some(bill_task(tx, user_id, &project, &mut task, &config, &*clock)?)
                } else {
                    None
                };
                tx.update_task(&task)?;
                Ok(TaskStatusUpdate {
                    task,
                    previous_status,
                    billing,
                })
            })
            .await?;

        log_status_update(user_id, &update);
        Ok(update)
    }

    /// Bills every completed, unbilled task of a completed project on a new
    /// draft invoice.
    ///
    /// Fixed-price projects split the fixed amount evenly across the tasks;
    /// hourly projects price each task's hours at its resolved rate.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::Forbidden`] when the project is not the
    /// caller's, [`BillingError::ProjectNotCompleted`] when it is still
    /// open, and [`BillingError::NothingToBill`] when no task qualifies.
    pub async fn create_project_invoice(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> BillingResult<ProjectInvoice> {
        let clock = Arc::clone(&self.clock);
        let config = Arc::clone(&self.config);
        let created = self
            .store
            .transaction(move |tx| {
                let project = authorized_project(tx, user_id, project_id)?;
                if project.status != ProjectStatus::Completed {
                    return Err(BillingError::ProjectNotCompleted {
                        project_id,
                        status: project.status,
                    });
                }
                let tasks = tx.billable_tasks(project_id)?;
                if tasks.is_empty() {
                    return Err(BillingError::NothingToBill(project_id));
                }
                let profile = load_profile(tx, user_id)?;
                let invoice = open_draft(
                    tx,
                    &project,
                    &profile,
                    &config,
                    format!("Invoice for project: {}", project.name),
                    &*clock,
                )?;

                let fixed_share = match project.billing_type {
                    BillingType::Fixed => Some(fixed_share(&project, tasks.len())),
                    BillingType::Hourly => None,
                };
                let mut items = Vec::with_capacity(tasks.len());
                for mut task in tasks {
                    let (quantity, unit_price) = fixed_share.map_or_else(
                        || {
                            (
                                round_money(task.hours_worked()),
                                resolve_rate(&task, &project, &profile),
                            )
                        },
                        |share| (Decimal::ONE, share),
                    );
                    let item = InvoiceItem::new(
                        NewInvoiceItem {
                            invoice_id: invoice.id(),
                            task_id: Some(task.id()),
                            description: Some(format!("Task: {}", task.title())),
                            quantity,
                            unit_price,
                        },
                        &*clock,
                    )?;
                    tx.insert_item(&item)?;
                    task.mark_billed(&*clock)?;
                    tx.update_task(&task)?;
                    items.push(item);
                }
                let totalled = recalculate_in(tx, invoice, &*clock)?;
                Ok(ProjectInvoice {
                    invoice: totalled,
                    items,
                })
            })
            .await?;

        tracing::info!(
            user_id = %user_id,
            project_id = %project_id,
            invoice_id = %created.invoice.id(),
            number = %created.invoice.number(),
            tasks = created.items.len(),
            total_ht = %created.invoice.totals().total_ht,
            "project invoice created"
        );
        Ok(created)
    }
}

fn bill_task(
    tx: &mut dyn BillingTransaction,
    user_id: UserId,
    project: &Project,
    task: &mut Task,
    config: &BillingConfig,
    clock: &impl Clock,
) -> BillingResult<AutoBilledTask> {
    let profile = load_profile(tx, user_id)?;
    let (invoice, invoice_created) = match tx.find_draft_invoice(user_id, project.id)? {
        Some(draft) => (draft, false),
        None => {
            let notes = format!("Automatic invoice for project: {}", project.name);
            (open_draft(tx, project, &profile, config, notes, clock)?, true)
        }
    };
    let item = InvoiceItem::new(
        NewInvoiceItem {
            invoice_id: invoice.id(),
            task_id: Some(task.id()),
            description: Some(task.title().to_owned()),
            quantity: task.hours_worked(),
            unit_price: resolve_rate(task, project, &profile),
        },
        clock,
    )?;
    tx.insert_item(&item)?;
    let totalled = recalculate_in(tx, invoice, clock)?;
    task.mark_billed(clock)?;
    Ok(AutoBilledTask {
        invoice: totalled,
        item,
        invoice_created,
    })
}

fn load_profile(
    tx: &mut dyn BillingTransaction,
    user_id: UserId,
) -> BillingResult<BillingProfile> {
    Ok(tx
        .find_profile(user_id)?
        .unwrap_or_else(|| BillingProfile::new(user_id)))
}

/// Creates and stores an empty draft project invoice with a fresh number.
fn open_draft(
    tx: &mut dyn BillingTransaction,
    project: &Project,
    profile: &BillingProfile,
    config: &BillingConfig,
    notes: String,
    clock: &impl Clock,
) -> BillingResult<Invoice> {
    let now = clock.utc();
    let number = issue_number_in(tx, project.user_id, &config.invoice_prefix, now)?;
    let due_date = now
        .checked_add_days(Days::new(u64::from(config.payment_terms_days)))
        .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);
    let invoice = Invoice::draft(
        NewDraftInvoice {
            user_id: project.user_id,
            client_id: project.client_id,
            project_id: Some(project.id),
            number,
            kind: InvoiceKind::Project,
            currency: profile.currency.unwrap_or(config.default_currency),
            due_date,
            notes: Some(notes),
        },
        clock,
    );
    tx.insert_invoice(&invoice)?;
    tracing::info!(
        user_id = %project.user_id,
        project_id = %project.id,
        invoice_id = %invoice.id(),
        number = %invoice.number(),
        "draft invoice opened"
    );
    Ok(invoice)
}

/// Task rate, else project rate, else the user's default rate, else zero.
fn resolve_rate(task: &Task, project: &Project, profile: &BillingProfile) -> Decimal {
    task.hourly_rate()
        .or(project.hourly_rate)
        .or(profile.default_hourly_rate)
        .unwrap_or(Decimal::ZERO)
}

fn fixed_share(project: &Project, task_count: usize) -> Decimal {
    let amount = project.fixed_amount.unwrap_or(Decimal::ZERO);
    let divisor = Decimal::from(task_count.max(1));
    round_money(amount.checked_div(divisor).unwrap_or(Decimal::ZERO))
}

fn log_status_update(user_id: UserId, update: &TaskStatusUpdate) {
    let task_id = update.task.id();
    match &update.billing {
        Some(billed) => tracing::info!(
            user_id = %user_id,
            task_id = %task_id,
            invoice_id = %billed.invoice.id(),
            number = %billed.invoice.number(),
            hours = %billed.item.quantity(),
            invoice_created = billed.invoice_created,
            "completed task billed"
        ),
        None if update.task.status() == TaskStatus::Completed && update.task.is_billed() => {
            tracing::info!(
                user_id = %user_id,
                task_id = %task_id,
                "task already billed; auto-billing skipped"
            );
        }
        None => tracing::debug!(
            user_id = %user_id,
            task_id = %task_id,
            status = update.task.status().as_str(),
            "task status updated"
        ),
    }
}
