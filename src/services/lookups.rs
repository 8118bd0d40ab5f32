use crate::{
    errors::ServiceError,
    models::{Doctype, ItemRow, ReturnedQuantities, TransactionDocument},
};
use async_trait::async_trait;
use serde_json::Value;

/// Source of submitted transactional documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_doc(
        &self,
        doctype: Doctype,
        name: &str,
    ) -> Result<Option<TransactionDocument>, ServiceError>;
}

/// Field-level reads against documents and master records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordLookup: Send + Sync {
    /// Reads one field of a record straight from storage.
    async fn get_value(
        &self,
        doctype: &str,
        name: &str,
        field: &str,
    ) -> Result<Option<Value>, ServiceError>;

    /// Reads one field of a record, served from cache where possible.
    async fn get_cached_value(
        &self,
        doctype: &str,
        name: &str,
        field: &str,
    ) -> Result<Option<Value>, ServiceError>;

    /// Decimal places configured for a currency or float field, if any.
    async fn field_precision(
        &self,
        doctype: Doctype,
        field: &str,
    ) -> Result<Option<u32>, ServiceError>;
}

/// Aggregates what has already been reversed against a source document.
#[async_trait]
pub trait ReturnLedger: Send + Sync {
    async fn returned_qty_map_for_row(
        &self,
        parent: &str,
        counterparty: Option<&str>,
        row_name: &str,
        doctype: Doctype,
    ) -> Result<ReturnedQuantities, ServiceError>;

    async fn returned_serial_nos(
        &self,
        row: &ItemRow,
        parent: &TransactionDocument,
    ) -> Result<Vec<String>, ServiceError>;
}

pub trait Translator: Send + Sync {
    fn translate(&self, lang: &str, text: &str) -> String;
}

/// Recomputes item amounts, taxes and document totals in place.
pub trait TotalsCalculator: Send + Sync {
    fn calculate_taxes_and_totals(
        &self,
        doc: &mut TransactionDocument,
        precision: u32,
    ) -> Result<(), ServiceError>;
}

/// Value lookups hand back JSON; this narrows one to a non-empty string.
pub fn value_as_string(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
