//! End-to-end billing flows through the public engine API.

use super::helpers::{Freelancer, freelancer};
use rstest::rstest;
use rust_decimal_macros::dec;
use timebill::billing::{
    domain::{
        BillingType, InvoiceStatus, PersistedTaskData, ProjectStatus, StatsPeriod, Task,
        TaskStatus, TimeEntryQuery,
    },
    services::{CreateItemRequest, StartTimerRequest},
};

async fn track(freelancer: &Freelancer, seconds: i64) {
    let timer = freelancer.engine.timer();
    timer
        .start_timer(StartTimerRequest::new(freelancer.user, freelancer.task))
        .await
        .expect("timer starts");
    freelancer.clock.advance(seconds);
    timer
        .stop_timer(freelancer.user, freelancer.task)
        .await
        .expect("timer stops");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tracked_sessions_become_a_billed_draft(freelancer: Freelancer) {
    track(&freelancer, 3_600).await;
    freelancer.clock.advance(600);
    track(&freelancer, 1_800).await;

    let aggregator = freelancer.engine.aggregator();
    let seconds = aggregator
        .completed_seconds(freelancer.task, freelancer.user)
        .await
        .expect("completed seconds");
    let today = aggregator
        .time_stats(freelancer.user, StatsPeriod::Today)
        .await
        .expect("daily stats");
    let history = aggregator
        .entries_for_task(
            freelancer.user,
            freelancer.task,
            TimeEntryQuery::new(1, 10).expect("valid query"),
        )
        .await
        .expect("entry page");
    assert_eq!(seconds, 5_400);
    assert_eq!(today.len(), 1);
    assert_eq!(
        today.first().map(|day| day.formatted.as_str()),
        Some("01:30:00")
    );
    assert_eq!(history.total, 2);
    assert_eq!(freelancer.task(freelancer.task).hours_worked(), dec!(1.5));

    let update = freelancer
        .engine
        .auto_billing()
        .update_task_status(freelancer.user, freelancer.task, TaskStatus::Completed)
        .await
        .expect("task completes");

    let billed = update.billing.expect("task was billed");
    assert!(billed.invoice_created);
    assert_eq!(billed.invoice.number().to_string(), "FAC-2026-001");
    assert_eq!(billed.item.quantity(), dec!(1.50));
    assert_eq!(billed.item.unit_price(), dec!(80));
    assert_eq!(billed.invoice.totals().total_ttc, dec!(120.00));
    assert!(freelancer.task(freelancer.task).is_billed());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn manual_lines_and_status_changes_keep_totals(freelancer: Freelancer) {
    track(&freelancer, 2_700).await;
    let billed = freelancer
        .engine
        .auto_billing()
        .update_task_status(freelancer.user, freelancer.task, TaskStatus::Completed)
        .await
        .expect("task completes")
        .billing
        .expect("task was billed");
    let invoices = freelancer.engine.invoices();
    let invoice_id = billed.invoice.id();

    let setup = invoices
        .create_item(
            CreateItemRequest::new(freelancer.user, invoice_id, dec!(35))
                .with_hours(dec!(1))
                .with_description("Hosting setup"),
        )
        .await
        .expect("manual line");
    let sent = invoices
        .set_invoice_status(freelancer.user, invoice_id, InvoiceStatus::Sent)
        .await
        .expect("invoice sent");

    assert_eq!(setup.total(), dec!(35.00));
    assert_eq!(sent.status(), InvoiceStatus::Sent);
    assert_eq!(sent.totals().total_ht, dec!(95.00));
    assert_eq!(
        invoices
            .items_for_invoice(freelancer.user, invoice_id)
            .await
            .expect("items")
            .len(),
        2
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completed_fixed_projects_are_invoiced_whole(freelancer: Freelancer) {
    let mut fixed = freelancer.add_project("Brand refresh", BillingType::Fixed);
    fixed.status = ProjectStatus::Completed;
    fixed.fixed_amount = Some(dec!(1200));
    freelancer
        .store
        .insert_project(fixed.clone())
        .expect("complete project");
    for title in ["Logo", "Palette"] {
        let seeded = Task::new(fixed.id, title, &*freelancer.clock);
        let now = seeded.created_at();
        let done = Task::from_persisted(PersistedTaskData {
            id: seeded.id(),
            project_id: fixed.id,
            title: title.to_owned(),
            status: TaskStatus::Completed,
            hours_worked: dec!(3),
            hourly_rate: None,
            is_billed: false,
            created_at: now,
            updated_at: now,
        });
        freelancer.store.insert_task(done).expect("seed task");
    }
    let open = freelancer.add_task(fixed.id, "Typography");

    let created = freelancer
        .engine
        .auto_billing()
        .create_project_invoice(freelancer.user, fixed.id)
        .await
        .expect("project invoice");

    assert_eq!(created.items.len(), 2);
    assert_eq!(created.invoice.totals().total_ht, dec!(1200.00));
    assert_eq!(created.invoice.project_id(), Some(fixed.id));
    assert!(!freelancer.task(open).is_billed());
}
