use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Transactional document types a debit/credit note can be raised against.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    ToSchema,
)]
pub enum Doctype {
    #[default]
    #[serde(rename = "Sales Invoice")]
    #[strum(serialize = "Sales Invoice")]
    SalesInvoice,
    #[serde(rename = "POS Invoice")]
    #[strum(serialize = "POS Invoice")]
    PosInvoice,
    #[serde(rename = "Purchase Invoice")]
    #[strum(serialize = "Purchase Invoice")]
    PurchaseInvoice,
    #[serde(rename = "Purchase Receipt")]
    #[strum(serialize = "Purchase Receipt")]
    PurchaseReceipt,
    #[serde(rename = "Subcontracting Receipt")]
    #[strum(serialize = "Subcontracting Receipt")]
    SubcontractingReceipt,
    #[serde(rename = "Delivery Note")]
    #[strum(serialize = "Delivery Note")]
    DeliveryNote,
}

impl Doctype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SalesInvoice => "Sales Invoice",
            Self::PosInvoice => "POS Invoice",
            Self::PurchaseInvoice => "Purchase Invoice",
            Self::PurchaseReceipt => "Purchase Receipt",
            Self::SubcontractingReceipt => "Subcontracting Receipt",
            Self::DeliveryNote => "Delivery Note",
        }
    }

    /// Child doctype of the `items` table, e.g. "Sales Invoice Item".
    pub fn item_doctype(&self) -> String {
        format!("{} Item", self.as_str())
    }

    pub fn is_invoice_like(&self) -> bool {
        matches!(self, Self::SalesInvoice | Self::PosInvoice)
    }

    pub fn is_sales(&self) -> bool {
        matches!(
            self,
            Self::SalesInvoice | Self::PosInvoice | Self::DeliveryNote
        )
    }

    pub fn has_packed_items(&self) -> bool {
        matches!(
            self,
            Self::SalesInvoice | Self::PosInvoice | Self::DeliveryNote
        )
    }

    /// Subcontracting receipt items carry no stock UOM quantities.
    pub fn item_has_stock_qty(&self) -> bool {
        !matches!(self, Self::SubcontractingReceipt)
    }

    pub fn taxes_doctype(&self) -> &'static str {
        if self.is_sales() {
            "Sales Taxes and Charges"
        } else {
            "Purchase Taxes and Charges"
        }
    }

    /// Mode-of-payment rows only exist on point-of-sale capable invoices.
    pub fn payments_doctype(&self) -> Option<&'static str> {
        self.is_invoice_like().then_some("Sales Invoice Payment")
    }

    /// Item field on a note row pointing back at the row it reverses.
    pub fn return_item_link_field(&self) -> Option<&'static str> {
        match self {
            Self::SalesInvoice => Some("sales_invoice_item"),
            Self::PosInvoice => Some("pos_invoice_item"),
            Self::PurchaseReceipt => Some("purchase_receipt_item"),
            Self::SubcontractingReceipt => Some("subcontracting_receipt_item"),
            Self::PurchaseInvoice | Self::DeliveryNote => None,
        }
    }
}
