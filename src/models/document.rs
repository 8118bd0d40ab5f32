use super::doctype::Doctype;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Submission state of a document: 0 draft, 1 submitted, 2 cancelled.
pub const DOCSTATUS_SUBMITTED: u8 = 1;

/// A transactional document (header plus child tables) as exchanged with the
/// document store and returned to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct TransactionDocument {
    pub doctype: Doctype,
    pub name: Option<String>,
    pub docstatus: u8,
    pub amended_from: Option<String>,
    pub company: Option<String>,
    pub customer: Option<String>,
    pub supplier: Option<String>,
    pub posting_date: Option<NaiveDate>,
    pub currency: Option<String>,
    pub conversion_rate: Decimal,
    pub is_pos: bool,
    pub debit_note: bool,
    pub debit_against: Option<String>,
    pub set_warehouse: Option<String>,
    pub select_print_heading: Option<String>,
    pub consolidated_invoice: Option<String>,
    pub discount_amount: Decimal,
    pub paid_amount: Decimal,
    pub base_paid_amount: Decimal,
    pub total_qty: Decimal,
    pub total: Decimal,
    pub base_total: Decimal,
    pub net_total: Decimal,
    pub base_net_total: Decimal,
    pub total_taxes_and_charges: Decimal,
    pub base_total_taxes_and_charges: Decimal,
    pub grand_total: Decimal,
    pub base_grand_total: Decimal,
    pub outstanding_amount: Decimal,
    pub items: Vec<ItemRow>,
    pub taxes: Vec<TaxRow>,
    pub payments: Vec<PaymentRow>,
    pub payment_schedule: Vec<PaymentScheduleRow>,
    pub packed_items: Vec<PackedItem>,
    /// Load-time annotations, never persisted.
    #[serde(rename = "__onload", skip_serializing_if = "BTreeMap::is_empty")]
    pub onload: BTreeMap<String, Value>,
}

impl TransactionDocument {
    pub fn new(doctype: Doctype) -> Self {
        Self {
            doctype,
            conversion_rate: Decimal::ONE,
            ..Default::default()
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.docstatus == DOCSTATUS_SUBMITTED
    }

    /// Customer for selling documents, supplier for buying documents.
    pub fn counterparty(&self) -> Option<&str> {
        if self.doctype.is_sales() {
            self.customer.as_deref()
        } else {
            self.supplier.as_deref()
        }
    }

    pub fn set_onload(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.onload.insert(key.into(), value.into());
    }

    pub fn get_onload(&self, key: &str) -> Option<&Value> {
        self.onload.get(key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ItemRow {
    pub name: Option<String>,
    pub idx: u32,
    pub item_code: Option<String>,
    pub item_name: Option<String>,
    pub uom: Option<String>,
    pub conversion_factor: Decimal,
    pub qty: Decimal,
    pub stock_qty: Decimal,
    pub received_qty: Decimal,
    pub rejected_qty: Decimal,
    pub received_stock_qty: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
    pub base_amount: Decimal,
    pub warehouse: Option<String>,
    pub rejected_warehouse: Option<String>,
    pub serial_no: Option<String>,
    pub batch_no: Option<String>,
    pub bom: Option<String>,
    pub expense_account: Option<String>,
    pub income_account: Option<String>,
    pub purchase_order: Option<String>,
    pub purchase_order_item: Option<String>,
    pub purchase_receipt_item: Option<String>,
    pub subcontracting_order: Option<String>,
    pub subcontracting_order_item: Option<String>,
    pub subcontracting_receipt_item: Option<String>,
    pub sales_order: Option<String>,
    pub so_detail: Option<String>,
    pub delivery_note: Option<String>,
    pub dn_detail: Option<String>,
    pub sales_invoice_item: Option<String>,
    pub pos_invoice_item: Option<String>,
}

impl ItemRow {
    /// Value of one of the return back-link fields.
    pub fn link_value(&self, field: &str) -> Option<&str> {
        match field {
            "sales_invoice_item" => self.sales_invoice_item.as_deref(),
            "pos_invoice_item" => self.pos_invoice_item.as_deref(),
            "purchase_receipt_item" => self.purchase_receipt_item.as_deref(),
            "subcontracting_receipt_item" => self.subcontracting_receipt_item.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ChargeType {
    #[default]
    Actual,
    #[serde(rename = "On Net Total")]
    OnNetTotal,
    #[serde(rename = "On Previous Row Amount")]
    OnPreviousRowAmount,
    #[serde(rename = "On Previous Row Total")]
    OnPreviousRowTotal,
    #[serde(rename = "On Item Quantity")]
    OnItemQuantity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct TaxRow {
    pub name: Option<String>,
    pub idx: u32,
    pub charge_type: ChargeType,
    pub account_head: Option<String>,
    pub description: Option<String>,
    pub rate: Decimal,
    /// 1-based index of the row an "On Previous Row" charge refers to.
    pub row_id: Option<u32>,
    pub tax_amount: Decimal,
    pub base_tax_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PaymentRow {
    pub name: Option<String>,
    pub idx: u32,
    pub mode_of_payment: Option<String>,
    #[serde(rename = "type")]
    pub payment_type: Option<String>,
    pub account: Option<String>,
    pub default: bool,
    pub amount: Decimal,
    pub base_amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PaymentScheduleRow {
    pub name: Option<String>,
    pub idx: u32,
    pub payment_term: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub invoice_portion: Decimal,
    pub payment_amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PackedItem {
    pub name: Option<String>,
    pub idx: u32,
    pub parent_item: Option<String>,
    pub item_code: Option<String>,
    pub qty: Decimal,
    pub warehouse: Option<String>,
    pub serial_no: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn deserializes_partial_documents() {
        let doc: TransactionDocument = serde_json::from_value(json!({
            "doctype": "Sales Invoice",
            "name": "SINV-001",
            "docstatus": 1,
            "customer": "ACME",
            "conversion_rate": "1.5",
            "items": [{ "name": "row-1", "qty": 10 }],
            "payments": [{ "mode_of_payment": "Cash", "type": "Cash", "amount": "25.00" }]
        }))
        .unwrap();

        assert!(doc.is_submitted());
        assert_eq!(doc.conversion_rate, dec!(1.5));
        assert_eq!(doc.items[0].qty, dec!(10));
        assert_eq!(doc.payments[0].payment_type.as_deref(), Some("Cash"));
        assert_eq!(doc.counterparty(), Some("ACME"));
    }

    #[test]
    fn onload_is_serialized_under_dunder_key() {
        let mut doc = TransactionDocument::new(Doctype::SalesInvoice);
        assert!(serde_json::to_value(&doc).unwrap().get("__onload").is_none());

        doc.set_onload("ignore_price_list", true);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["__onload"]["ignore_price_list"], json!(true));
        assert_eq!(doc.get_onload("ignore_price_list"), Some(&json!(true)));
    }

    #[test]
    fn purchase_side_counterparty_is_supplier() {
        let mut doc = TransactionDocument::new(Doctype::PurchaseReceipt);
        doc.customer = Some("ignored".into());
        doc.supplier = Some("Widgets Ltd".into());
        assert_eq!(doc.counterparty(), Some("Widgets Ltd"));
    }
}
