//! Then steps for auto-billing BDD scenarios.

use std::str::FromStr;

use super::world::{BillingWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::then;
use rust_decimal::Decimal;
use timebill::billing::{
    domain::{Invoice, InvoiceStatus},
    services::ErrorKind,
};

fn only_draft(world: &BillingWorld) -> Result<Invoice, eyre::Report> {
    let invoices = world
        .store
        .invoices_for_user(world.user)
        .wrap_err("list invoices")?;
    let mut drafts = invoices
        .into_iter()
        .filter(|invoice| invoice.status() == InvoiceStatus::Draft);
    let draft = drafts
        .next()
        .ok_or_else(|| eyre::eyre!("expected a draft invoice, found none"))?;
    if drafts.next().is_some() {
        return Err(eyre::eyre!("expected a single draft invoice"));
    }
    Ok(draft)
}

#[then(r#"a draft invoice "{number}" totals {total}"#)]
fn draft_invoice_totals(
    world: &BillingWorld,
    number: String,
    total: String,
) -> Result<(), eyre::Report> {
    let expected = Decimal::from_str(&total).wrap_err("parse expected total")?;
    let draft = only_draft(world)?;
    if draft.number().to_string() != number {
        return Err(eyre::eyre!(
            "expected invoice {number}, found {}",
            draft.number()
        ));
    }
    let totals = draft.totals();
    if totals.total_ht != expected || totals.total_ttc != expected {
        return Err(eyre::eyre!(
            "expected totals of {expected}, found {totals:?}"
        ));
    }
    Ok(())
}

#[then("the task is flagged as billed")]
fn task_is_billed(world: &BillingWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let task = world
        .store
        .task(task_id)
        .wrap_err("load task")?
        .ok_or_else(|| eyre::eyre!("task {task_id} disappeared"))?;
    if !task.is_billed() {
        return Err(eyre::eyre!("task {task_id} is not billed"));
    }
    let billed_now = world
        .last_update
        .as_ref()
        .is_some_and(|update| update.billing.is_some());
    if !billed_now {
        return Err(eyre::eyre!("completion did not report an invoice line"));
    }
    Ok(())
}

#[then("the invoice count is {count:usize}")]
fn invoice_count(world: &BillingWorld, count: usize) -> Result<(), eyre::Report> {
    let invoices = world
        .store
        .invoices_for_user(world.user)
        .wrap_err("list invoices")?;
    if invoices.len() != count {
        return Err(eyre::eyre!(
            "expected {count} invoices, found {}",
            invoices.len()
        ));
    }
    Ok(())
}

#[then("the draft invoice line count is {count:usize}")]
fn draft_line_count(world: &BillingWorld, count: usize) -> Result<(), eyre::Report> {
    let draft = only_draft(world)?;
    let items = run_async(
        world
            .engine
            .invoices()
            .items_for_invoice(world.user, draft.id()),
    )
    .wrap_err("list invoice items")?;
    if items.len() != count {
        return Err(eyre::eyre!("expected {count} lines, found {}", items.len()));
    }
    Ok(())
}

#[then("the request fails with a conflict")]
fn request_conflicts(world: &BillingWorld) -> Result<(), eyre::Report> {
    let error = world
        .last_error
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected the request to fail"))?;
    if error.kind() != ErrorKind::Conflict {
        return Err(eyre::eyre!("expected a conflict, got {error:?}"));
    }
    Ok(())
}

#[then("the task has {hours} hours worked")]
fn task_hours(world: &BillingWorld, hours: String) -> Result<(), eyre::Report> {
    let expected = Decimal::from_str(&hours).wrap_err("parse expected hours")?;
    let task_id = world.task_id()?;
    let task = world
        .store
        .task(task_id)
        .wrap_err("load task")?
        .ok_or_else(|| eyre::eyre!("task {task_id} disappeared"))?;
    if task.hours_worked() != expected {
        return Err(eyre::eyre!(
            "expected {expected} hours, found {}",
            task.hours_worked()
        ));
    }
    Ok(())
}
