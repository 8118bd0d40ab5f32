//! Property-based tests for debit note generation.
//!
//! These tests use proptest to check the netting and rounding rules over a
//! wide range of quantities, amounts and serial lists.

mod common;

use common::{guest, sales_invoice, submit};
use debit_note_service::{
    config::AppConfig,
    models::TransactionDocument,
    services::{
        in_memory::InMemoryLedger,
        serial_no::{join_serial_nos, parse_serial_nos, remaining_serial_nos},
    },
    AppState,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::{collections::HashSet, sync::Arc};

fn serial_list_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[A-Z]{2}-[0-9]{1,4}", 0..20)
        .prop_map(|set| set.into_iter().collect())
}

/// Quantity with two decimal places.
fn qty_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime")
}

fn state_with(ledger: InMemoryLedger) -> (AppState, Arc<InMemoryLedger>) {
    let ledger = Arc::new(ledger);
    (AppState::new(AppConfig::default(), ledger.clone()), ledger)
}

fn invoice_with(qty: Decimal, amount: Decimal, conversion_rate: Decimal) -> TransactionDocument {
    let mut doc = sales_invoice();
    doc.items[0].qty = qty;
    doc.items[0].stock_qty = qty;
    doc.items[0].serial_no = None;
    doc.payments[0].amount = amount;
    doc.paid_amount = amount;
    doc.conversion_rate = conversion_rate;
    doc
}

// Property: the serial difference keeps source order and drops every returned serial
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn remaining_serials_preserve_order(
        source in serial_list_strategy(),
        mask in prop::collection::vec(any::<bool>(), 20),
    ) {
        let returned: Vec<String> = source
            .iter()
            .zip(mask.iter())
            .filter(|(_, returned)| **returned)
            .map(|(s, _)| s.clone())
            .collect();

        let remaining = remaining_serial_nos(&source, &returned);
        let expected: Vec<String> = source
            .iter()
            .filter(|s| !returned.contains(*s))
            .cloned()
            .collect();
        prop_assert_eq!(&remaining, &expected);

        let returned: HashSet<&String> = returned.iter().collect();
        prop_assert!(remaining.iter().all(|s| !returned.contains(s)));
    }

    #[test]
    fn joined_serials_parse_back(source in serial_list_strategy()) {
        prop_assert_eq!(parse_serial_nos(&join_serial_nos(&source)), source);
    }
}

// Property: note quantity is the source quantity minus what was already returned
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn note_qty_is_source_minus_returned(
        (source_qty, returned_qty) in qty_strategy().prop_flat_map(|src| {
            let returned = (0i64..=src.mantissa() as i64).prop_map(|c| Decimal::new(c, 2));
            (Just(src), returned)
        })
    ) {
        let ledger = InMemoryLedger::new();
        ledger.insert_document(invoice_with(source_qty, Decimal::new(53, 0), Decimal::ONE));
        let (state, ledger) = state_with(ledger);
        let service = state.debit_note_service();

        let note = runtime().block_on(async {
            let mut first = service
                .make_sales_debit(&guest(), "SINV-001", None)
                .await?;
            first.items[0].qty = returned_qty;
            first.items[0].stock_qty = returned_qty;
            submit(&ledger, first, "SINV-RET-001");
            service.make_sales_debit(&guest(), "SINV-001", None).await
        }).expect("note");

        prop_assert_eq!(note.items[0].qty, source_qty - returned_qty);
        prop_assert_eq!(note.items[0].stock_qty, source_qty - returned_qty);
    }

    #[test]
    fn payment_base_amount_is_rounded_conversion(
        amount in (1i64..10_000_000).prop_map(|c| Decimal::new(c, 2)),
        rate in (1i64..50_000).prop_map(|r| Decimal::new(r, 4)),
    ) {
        let ledger = InMemoryLedger::new();
        ledger.insert_document(invoice_with(Decimal::new(10, 0), amount, rate));
        let (state, _) = state_with(ledger);

        let note = runtime()
            .block_on(state.debit_note_service().make_sales_debit(&guest(), "SINV-001", None))
            .expect("note");

        prop_assert_eq!(note.payments.len(), 1);
        prop_assert_eq!(note.payments[0].amount, amount);
        prop_assert_eq!(note.payments[0].base_amount, (amount * rate).round_dp(2));
        prop_assert_eq!(note.paid_amount, amount);
    }
}
