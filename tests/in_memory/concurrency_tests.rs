//! Contention on shared engine state.

use std::collections::BTreeSet;

use super::helpers::{Freelancer, freelancer};
use rstest::rstest;
use timebill::billing::services::{ErrorKind, StartTimerRequest};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn racing_starts_leave_one_running_timer(freelancer: Freelancer) {
    let second_task = freelancer.add_task(freelancer.project.id, "Signup flow");
    let mut handles = Vec::new();
    for task_id in [freelancer.task, second_task, freelancer.task, second_task] {
        let engine = freelancer.engine.clone();
        let user = freelancer.user;
        handles.push(tokio::spawn(async move {
            engine
                .timer()
                .start_timer(StartTimerRequest::new(user, task_id))
                .await
        }));
    }

    let mut started = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.expect("task joins") {
            Ok(_) => started += 1,
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::Conflict);
                refused += 1;
            }
        }
    }

    assert_eq!((started, refused), (1, 3));
    let running: Vec<_> = freelancer
        .store
        .entries_for_user(freelancer.user)
        .expect("entries lookup")
        .into_iter()
        .filter(|entry| entry.is_running())
        .collect();
    assert_eq!(running.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn racing_number_requests_stay_gap_free(freelancer: Freelancer) {
    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = freelancer.engine.clone();
        let user = freelancer.user;
        handles.push(tokio::spawn(async move {
            engine.numbering().generate_invoice_number(user).await
        }));
    }

    let mut numbers = BTreeSet::new();
    for handle in handles {
        let number = handle
            .await
            .expect("task joins")
            .expect("number issued");
        numbers.insert(number.to_string());
    }

    let expected: BTreeSet<String> = (1..=16).map(|n| format!("FAC-2026-{n:03}")).collect();
    assert_eq!(numbers, expected);
}
