// Document models shared by the mapper, the debit-note service and handlers
pub mod doctype;
pub mod document;
pub mod returned_qty;

pub use doctype::Doctype;
pub use document::{
    ChargeType, ItemRow, PackedItem, PaymentRow, PaymentScheduleRow, TaxRow, TransactionDocument,
    DOCSTATUS_SUBMITTED,
};
pub use returned_qty::ReturnedQuantities;
