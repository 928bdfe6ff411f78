//! Invoice numbers issued from the `invoice_sequences` counter.

use std::collections::BTreeSet;

use crate::postgres::helpers::{
    BillingDatabase, PostgresCluster, billing_database, postgres_cluster,
};
use rstest::rstest;
use timebill::billing::{
    domain::{ClientId, Currency, Invoice, InvoiceKind, InvoiceNumber, NewDraftInvoice},
    ports::{BillingStore, StoreError},
};

fn manual_invoice(db: &BillingDatabase, sequence: u32) -> Invoice {
    Invoice::draft(
        NewDraftInvoice {
            user_id: db.user,
            client_id: ClientId::new(),
            project_id: None,
            number: InvoiceNumber::new("FAC", 2026, sequence).expect("valid number"),
            kind: InvoiceKind::Manual,
            currency: Currency::Eur,
            due_date: chrono::Utc::now(),
            notes: None,
        },
        &*db.clock,
    )
}

#[rstest]
fn concurrent_requests_get_distinct_consecutive_numbers(postgres_cluster: PostgresCluster) {
    let db = billing_database(postgres_cluster).expect("billing database");

    let numbers = db.runtime.block_on(async {
        let mut handles = Vec::new();
        for _ in 0..12 {
            let engine = db.engine.clone();
            let user = db.user;
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
        numbers
    });

    let expected: BTreeSet<String> = (1..=12).map(|n| format!("FAC-2026-{n:03}")).collect();
    assert_eq!(numbers, expected);
    assert_eq!(
        db.count("SELECT COUNT(*) AS n FROM invoice_sequences WHERE last_value = 12"),
        1
    );
}

#[rstest]
fn numbers_start_at_one_and_advance(postgres_cluster: PostgresCluster) {
    let db = billing_database(postgres_cluster).expect("billing database");
    let numbering = db.engine.numbering();

    let first = db
        .runtime
        .block_on(numbering.generate_invoice_number(db.user))
        .expect("first number");
    let second = db
        .runtime
        .block_on(numbering.generate_invoice_number(db.user))
        .expect("second number");

    assert_eq!(first.to_string(), "FAC-2026-001");
    assert_eq!(second.to_string(), "FAC-2026-002");
}

#[rstest]
fn duplicate_numbers_map_to_duplicate_invoice_number(postgres_cluster: PostgresCluster) {
    let db = billing_database(postgres_cluster).expect("billing database");
    let original = manual_invoice(&db, 7);
    let clash = manual_invoice(&db, 7);

    db.runtime
        .block_on(db.store.transaction(move |tx| tx.insert_invoice(&original)))
        .expect("first invoice");
    let result = db
        .runtime
        .block_on(db.store.transaction(move |tx| tx.insert_invoice(&clash)));

    assert!(
        matches!(
            &result,
            Err(StoreError::DuplicateInvoiceNumber(number)) if number == "FAC-2026-007"
        ),
        "expected DuplicateInvoiceNumber, got: {result:?}"
    );
    assert_eq!(db.count("SELECT COUNT(*) AS n FROM invoices"), 1);
}
