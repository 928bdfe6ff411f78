//! Running-timer uniqueness enforced by the partial unique index.

use crate::postgres::helpers::{PostgresCluster, billing_database, postgres_cluster};
use rstest::rstest;
use timebill::billing::{
    domain::TimeEntry,
    ports::{BillingStore, StoreError},
    services::{ErrorKind, StartTimerRequest},
};

#[rstest]
fn racing_starts_leave_one_running_row(postgres_cluster: PostgresCluster) {
    let db = billing_database(postgres_cluster).expect("billing database");
    let second_task = db.add_task("Signup flow");

    let outcomes = db.runtime.block_on(async {
        let mut handles = Vec::new();
        for task_id in [db.task, second_task, db.task, second_task] {
            let engine = db.engine.clone();
            let user = db.user;
            handles.push(tokio::spawn(async move {
                engine
                    .timer()
                    .start_timer(StartTimerRequest::new(user, task_id))
                    .await
            }));
        }
        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.expect("task joins"));
        }
        outcomes
    });

    let started = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(started, 1);
    for refused in outcomes.iter().filter_map(|outcome| outcome.as_ref().err()) {
        assert_eq!(refused.kind(), ErrorKind::Conflict, "{refused:?}");
    }
    assert_eq!(
        db.count("SELECT COUNT(*) AS n FROM time_entries WHERE is_running"),
        1
    );
}

#[rstest]
fn a_second_running_row_maps_to_running_timer_exists(postgres_cluster: PostgresCluster) {
    let db = billing_database(postgres_cluster).expect("billing database");
    let first = TimeEntry::start(db.user, db.task, None, &*db.clock).expect("entry starts");
    let second = TimeEntry::start(db.user, db.task, None, &*db.clock).expect("entry starts");

    db.runtime
        .block_on(db.store.transaction(move |tx| tx.insert_entry(&first)))
        .expect("first running entry");
    let result = db
        .runtime
        .block_on(db.store.transaction(move |tx| tx.insert_entry(&second)));

    assert!(
        matches!(result, Err(StoreError::RunningTimerExists(user)) if user == db.user),
        "expected RunningTimerExists, got: {result:?}"
    );
}

#[rstest]
fn a_stopped_timer_frees_the_slot(postgres_cluster: PostgresCluster) {
    let db = billing_database(postgres_cluster).expect("billing database");
    let timer = db.engine.timer();

    db.runtime
        .block_on(timer.start_timer(StartTimerRequest::new(db.user, db.task)))
        .expect("first start");
    db.clock.advance(1_800);
    let stopped = db
        .runtime
        .block_on(timer.stop_timer(db.user, db.task))
        .expect("stop");
    db.runtime
        .block_on(timer.start_timer(StartTimerRequest::new(db.user, db.task)))
        .expect("second start");

    assert_eq!(stopped.duration_seconds(), Some(1_800));
    assert_eq!(
        db.count("SELECT COUNT(*) AS n FROM time_entries WHERE is_running"),
        1
    );
    assert_eq!(db.count("SELECT COUNT(*) AS n FROM time_entries"), 2);
}
