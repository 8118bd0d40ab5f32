#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use debit_note_service::{
    app,
    config::AppConfig,
    models::{
        ChargeType, Doctype, ItemRow, PackedItem, PaymentRow, PaymentScheduleRow, TaxRow,
        TransactionDocument,
    },
    services::{
        in_memory::{CatalogTranslator, InMemoryLedger},
        RequestContext,
    },
    AppState,
};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Router plus the ledger behind it, seeded with a small set of documents.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub ledger: Arc<InMemoryLedger>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let ledger = Arc::new(seeded_ledger());
        let translator = CatalogTranslator::new().with_entry("de", "Credit Note", "Gutschrift");
        let state = AppState::with_translator(config, ledger.clone(), Arc::new(translator));
        let router = app(state.clone());

        Self {
            router,
            state,
            ledger,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn make_sales_debit(&self, name: &str, body: Option<Value>) -> Response {
        self.request(
            Method::POST,
            &format!("/api/v1/sales-invoices/{name}/debit-note"),
            body,
            &[],
        )
        .await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Decodes the `data` field of an `ApiResponse` envelope.
pub fn note_from(body: &Value) -> TransactionDocument {
    serde_json::from_value(body["data"].clone()).expect("document payload")
}

pub fn guest() -> RequestContext {
    RequestContext::guest("en")
}

/// Submitted POS sales invoice: 10 widgets at 5.00, freight 3.00, paid in cash.
pub fn sales_invoice() -> TransactionDocument {
    let mut doc = TransactionDocument::new(Doctype::SalesInvoice);
    doc.name = Some("SINV-001".into());
    doc.docstatus = 1;
    doc.company = Some("Acme Corp".into());
    doc.customer = Some("ACME".into());
    doc.currency = Some("USD".into());
    doc.is_pos = true;
    doc.paid_amount = dec!(53);
    doc.grand_total = dec!(53);
    doc.items = vec![ItemRow {
        name: Some("sinv-row-1".into()),
        idx: 1,
        item_code: Some("WIDGET".into()),
        qty: dec!(10),
        stock_qty: dec!(10),
        conversion_factor: dec!(1),
        rate: dec!(5),
        amount: dec!(50),
        warehouse: Some("Stores - AC".into()),
        serial_no: Some("W-1\nW-2\nW-3".into()),
        income_account: Some("Sales - AC".into()),
        ..Default::default()
    }];
    doc.taxes = vec![TaxRow {
        idx: 1,
        charge_type: ChargeType::Actual,
        account_head: Some("Freight - AC".into()),
        description: Some("Freight".into()),
        tax_amount: dec!(3),
        ..Default::default()
    }];
    doc.payments = vec![PaymentRow {
        idx: 1,
        mode_of_payment: Some("Cash".into()),
        payment_type: Some("Cash".into()),
        account: Some("Cash - AC".into()),
        default: true,
        amount: dec!(53),
        base_amount: dec!(53),
        ..Default::default()
    }];
    doc.payment_schedule = vec![PaymentScheduleRow {
        idx: 1,
        payment_term: Some("Immediate".into()),
        invoice_portion: dec!(100),
        payment_amount: dec!(53),
        ..Default::default()
    }];
    doc.packed_items = vec![PackedItem {
        idx: 1,
        parent_item: Some("WIDGET".into()),
        item_code: Some("WIDGET-PART".into()),
        qty: dec!(20),
        ..Default::default()
    }];
    doc
}

/// Submitted purchase receipt: 12 received, 2 rejected, 10 accepted bolts.
pub fn purchase_receipt() -> TransactionDocument {
    let mut doc = TransactionDocument::new(Doctype::PurchaseReceipt);
    doc.name = Some("PR-001".into());
    doc.docstatus = 1;
    doc.company = Some("Acme Corp".into());
    doc.supplier = Some("Globex".into());
    doc.items = vec![ItemRow {
        name: Some("pr-row-1".into()),
        idx: 1,
        item_code: Some("BOLT".into()),
        qty: dec!(10),
        stock_qty: dec!(10),
        received_qty: dec!(12),
        rejected_qty: dec!(2),
        received_stock_qty: dec!(12),
        rate: dec!(1.5),
        warehouse: Some("Stores - AC".into()),
        rejected_warehouse: Some("Rejects - AC".into()),
        purchase_order: Some("PO-001".into()),
        purchase_order_item: Some("po-row-1".into()),
        ..Default::default()
    }];
    doc
}

pub fn seeded_ledger() -> InMemoryLedger {
    let ledger = InMemoryLedger::new();
    ledger.insert_document(sales_invoice());
    ledger.insert_document(purchase_receipt());

    let mut draft = sales_invoice();
    draft.name = Some("SINV-DRAFT".into());
    draft.docstatus = 0;
    ledger.insert_document(draft);

    ledger.insert_record(
        "Company",
        "Acme Corp",
        json!({ "default_warehouse_for_sales_return": "Returns - AC" })
            .as_object()
            .cloned()
            .unwrap_or_default(),
    );
    ledger.insert_record("Print Heading", "Credit Note", Default::default());
    ledger.insert_record("Print Heading", "Gutschrift", Default::default());
    ledger
}

/// Marks a prepared note as submitted under `name` and stores it.
pub fn submit(ledger: &InMemoryLedger, mut note: TransactionDocument, name: &str) {
    note.name = Some(name.into());
    note.docstatus = 1;
    ledger.insert_document(note);
}
