//! In-memory document store used by the bundled server and tests.
//!
//! Returned quantities and serial numbers are aggregated from the submitted
//! notes held in the store, so raising a note and inserting it back makes the
//! next note see the reduced quantities.

use crate::{
    errors::ServiceError,
    models::{Doctype, ItemRow, ReturnedQuantities, TransactionDocument},
    services::{
        lookups::{DocumentStore, RecordLookup, ReturnLedger, Translator},
        serial_no::parse_serial_nos,
    },
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::{collections::HashMap, path::Path, str::FromStr};
use tracing::{debug, info};

/// A master record such as a Company or a Print Heading.
#[derive(Debug, Clone, Deserialize)]
pub struct MasterRecord {
    pub doctype: String,
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldPrecision {
    pub doctype: Doctype,
    pub field: String,
    pub precision: u32,
}

/// Fixture format accepted by [`InMemoryLedger::from_seed_file`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LedgerSeed {
    pub documents: Vec<TransactionDocument>,
    pub records: Vec<MasterRecord>,
    pub precisions: Vec<FieldPrecision>,
}

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    documents: DashMap<(Doctype, String), TransactionDocument>,
    records: DashMap<(String, String), Map<String, Value>>,
    precisions: DashMap<(Doctype, String), u32>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: LedgerSeed) -> Self {
        let ledger = Self::new();
        for doc in seed.documents {
            ledger.insert_document(doc);
        }
        for record in seed.records {
            ledger.insert_record(&record.doctype, &record.name, record.fields);
        }
        for p in seed.precisions {
            ledger.set_precision(p.doctype, &p.field, p.precision);
        }
        ledger
    }

    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::InvalidInput(format!("Cannot read seed file {}: {}", path.display(), e))
        })?;
        let seed: LedgerSeed = serde_json::from_str(&raw)?;
        info!(
            documents = seed.documents.len(),
            records = seed.records.len(),
            "loaded ledger seed from {}",
            path.display()
        );
        Ok(Self::from_seed(seed))
    }

    /// Stores a document under its name. Unnamed documents are ignored.
    pub fn insert_document(&self, doc: TransactionDocument) {
        if let Some(name) = doc.name.clone() {
            self.documents.insert((doc.doctype, name), doc);
        }
    }

    pub fn insert_record(&self, doctype: &str, name: &str, fields: Map<String, Value>) {
        self.records
            .insert((doctype.to_string(), name.to_string()), fields);
    }

    pub fn set_precision(&self, doctype: Doctype, field: &str, precision: u32) {
        self.precisions
            .insert((doctype, field.to_string()), precision);
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    fn document_field(
        &self,
        doctype: &str,
        name: &str,
        field: &str,
    ) -> Result<Option<Value>, ServiceError> {
        let Ok(doctype) = Doctype::from_str(doctype) else {
            return Ok(None);
        };
        let Some(doc) = self.documents.get(&(doctype, name.to_string())) else {
            return Ok(None);
        };
        let value = serde_json::to_value(doc.value())?;
        Ok(value.get(field).cloned())
    }

    fn record_field(&self, doctype: &str, name: &str, field: &str) -> Option<Value> {
        let record = self.records.get(&(doctype.to_string(), name.to_string()))?;
        if field == "name" {
            return Some(Value::String(name.to_string()));
        }
        record.get(field).cloned()
    }

    /// Submitted notes raised against `parent` for the given party.
    fn notes_against(
        &self,
        doctype: Doctype,
        parent: &str,
        counterparty: Option<&str>,
    ) -> Vec<TransactionDocument> {
        self.documents
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|doc| {
                doc.doctype == doctype
                    && doc.is_submitted()
                    && doc.debit_note
                    && doc.debit_against.as_deref() == Some(parent)
                    && counterparty.map_or(true, |party| doc.counterparty() == Some(party))
            })
            .collect()
    }
}

#[async_trait]
impl DocumentStore for InMemoryLedger {
    async fn get_doc(
        &self,
        doctype: Doctype,
        name: &str,
    ) -> Result<Option<TransactionDocument>, ServiceError> {
        Ok(self
            .documents
            .get(&(doctype, name.to_string()))
            .map(|doc| doc.value().clone()))
    }
}

#[async_trait]
impl RecordLookup for InMemoryLedger {
    async fn get_value(
        &self,
        doctype: &str,
        name: &str,
        field: &str,
    ) -> Result<Option<Value>, ServiceError> {
        match self.document_field(doctype, name, field)? {
            Some(value) => Ok(Some(value)),
            None => Ok(self.record_field(doctype, name, field)),
        }
    }

    async fn get_cached_value(
        &self,
        doctype: &str,
        name: &str,
        field: &str,
    ) -> Result<Option<Value>, ServiceError> {
        self.get_value(doctype, name, field).await
    }

    async fn field_precision(
        &self,
        doctype: Doctype,
        field: &str,
    ) -> Result<Option<u32>, ServiceError> {
        Ok(self
            .precisions
            .get(&(doctype, field.to_string()))
            .map(|p| *p.value()))
    }
}

#[async_trait]
impl ReturnLedger for InMemoryLedger {
    async fn returned_qty_map_for_row(
        &self,
        parent: &str,
        counterparty: Option<&str>,
        row_name: &str,
        doctype: Doctype,
    ) -> Result<ReturnedQuantities, ServiceError> {
        let Some(link_field) = doctype.return_item_link_field() else {
            return Ok(ReturnedQuantities::default());
        };

        let mut returned = ReturnedQuantities::default();
        for note in self.notes_against(doctype, parent, counterparty) {
            for row in note
                .items
                .iter()
                .filter(|row| row.link_value(link_field) == Some(row_name))
            {
                returned.qty += row.qty.abs();
                returned.stock_qty += row.stock_qty.abs();
                returned.received_qty += row.received_qty.abs();
                returned.rejected_qty += row.rejected_qty.abs();
                returned.received_stock_qty += row.received_stock_qty.abs();
            }
        }

        debug!(parent, row_name, ?returned, "returned quantities");
        Ok(returned)
    }

    async fn returned_serial_nos(
        &self,
        row: &ItemRow,
        parent: &TransactionDocument,
    ) -> Result<Vec<String>, ServiceError> {
        let (Some(link_field), Some(row_name), Some(parent_name)) = (
            parent.doctype.return_item_link_field(),
            row.name.as_deref(),
            parent.name.as_deref(),
        ) else {
            return Ok(Vec::new());
        };

        Ok(self
            .notes_against(parent.doctype, parent_name, parent.counterparty())
            .iter()
            .flat_map(|note| note.items.iter())
            .filter(|note_row| note_row.link_value(link_field) == Some(row_name))
            .filter_map(|note_row| note_row.serial_no.as_deref())
            .flat_map(parse_serial_nos)
            .collect())
    }
}

/// Translator backed by per-language catalogs; unknown labels pass through.
#[derive(Debug, Clone, Default)]
pub struct CatalogTranslator {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl CatalogTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, lang: &str, source: &str, translated: &str) -> Self {
        self.catalogs
            .entry(lang.to_string())
            .or_default()
            .insert(source.to_string(), translated.to_string());
        self
    }
}

impl Translator for CatalogTranslator {
    fn translate(&self, lang: &str, text: &str) -> String {
        self.catalogs
            .get(lang)
            .and_then(|catalog| catalog.get(text))
            .cloned()
            .unwrap_or_else(|| text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn invoice(name: &str) -> TransactionDocument {
        let mut doc = TransactionDocument::new(Doctype::SalesInvoice);
        doc.name = Some(name.into());
        doc.docstatus = 1;
        doc.customer = Some("ACME".into());
        doc.company = Some("Acme Corp".into());
        doc
    }

    fn note(
        name: &str,
        against: &str,
        qty: rust_decimal::Decimal,
        serials: &str,
    ) -> TransactionDocument {
        let mut doc = invoice(name);
        doc.debit_note = true;
        doc.debit_against = Some(against.into());
        doc.items = vec![ItemRow {
            qty,
            stock_qty: qty,
            serial_no: Some(serials.into()),
            sales_invoice_item: Some("row-1".into()),
            ..Default::default()
        }];
        doc
    }

    #[tokio::test]
    async fn aggregates_submitted_notes_only() {
        let ledger = InMemoryLedger::new();
        ledger.insert_document(invoice("SINV-001"));
        ledger.insert_document(note("SINV-RET-1", "SINV-001", dec!(2), "SN-1"));
        ledger.insert_document(note("SINV-RET-2", "SINV-001", dec!(-3), "sn-2"));
        let mut draft = note("SINV-RET-3", "SINV-001", dec!(4), "SN-3");
        draft.docstatus = 0;
        ledger.insert_document(draft);

        let returned = ledger
            .returned_qty_map_for_row("SINV-001", Some("ACME"), "row-1", Doctype::SalesInvoice)
            .await
            .unwrap();
        assert_eq!(returned.qty, dec!(5));
        assert_eq!(returned.stock_qty, dec!(5));
        assert_eq!(returned.received_qty, dec!(0));

        let other_party = ledger
            .returned_qty_map_for_row("SINV-001", Some("Globex"), "row-1", Doctype::SalesInvoice)
            .await
            .unwrap();
        assert!(other_party.is_empty());

        let source_row = ItemRow {
            name: Some("row-1".into()),
            ..Default::default()
        };
        let mut serials = ledger
            .returned_serial_nos(&source_row, &invoice("SINV-001"))
            .await
            .unwrap();
        serials.sort();
        assert_eq!(serials, vec!["SN-1", "SN-2"]);
    }

    #[tokio::test]
    async fn values_come_from_documents_then_records() {
        let ledger = InMemoryLedger::new();
        ledger.insert_document(invoice("SINV-001"));
        ledger.insert_record(
            "Company",
            "Acme Corp",
            json!({ "default_warehouse_for_sales_return": "Returns - AC" })
                .as_object()
                .cloned()
                .unwrap(),
        );
        ledger.insert_record("Print Heading", "Credit Note", Map::new());

        assert_eq!(
            ledger.get_value("Sales Invoice", "SINV-001", "company").await.unwrap(),
            Some(json!("Acme Corp"))
        );
        assert_eq!(
            ledger
                .get_cached_value("Company", "Acme Corp", "default_warehouse_for_sales_return")
                .await
                .unwrap(),
            Some(json!("Returns - AC"))
        );
        assert_eq!(
            ledger.get_cached_value("Print Heading", "Credit Note", "name").await.unwrap(),
            Some(json!("Credit Note"))
        );
        assert_eq!(
            ledger.get_cached_value("Print Heading", "Debit Note", "name").await.unwrap(),
            None
        );
    }

    #[test]
    fn seed_parses_documents_records_and_precisions() {
        let seed: LedgerSeed = serde_json::from_value(json!({
            "documents": [{ "doctype": "Sales Invoice", "name": "SINV-9", "docstatus": 1 }],
            "records": [{ "doctype": "Print Heading", "name": "Credit Note" }],
            "precisions": [
                { "doctype": "Sales Invoice", "field": "base_paid_amount", "precision": 3 }
            ]
        }))
        .unwrap();

        let ledger = InMemoryLedger::from_seed(seed);
        assert_eq!(ledger.document_count(), 1);
        assert_eq!(
            ledger.precisions.get(&(Doctype::SalesInvoice, "base_paid_amount".into())).map(|p| *p),
            Some(3)
        );
    }

    #[test]
    fn bundled_fixture_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/ledger.json");
        let ledger = InMemoryLedger::from_seed_file(path).unwrap();
        assert_eq!(ledger.document_count(), 2);
    }

    #[test]
    fn missing_seed_file_is_invalid_input() {
        let err = InMemoryLedger::from_seed_file("/nonexistent/ledger.json").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[test]
    fn translator_falls_back_to_source_text() {
        let translator = CatalogTranslator::new().with_entry("de", "Credit Note", "Gutschrift");
        assert_eq!(translator.translate("de", "Credit Note"), "Gutschrift");
        assert_eq!(translator.translate("fr", "Credit Note"), "Credit Note");
    }
}
