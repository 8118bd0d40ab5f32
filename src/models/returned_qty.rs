use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Quantities of one source row already reversed by submitted notes.
/// Fields absent from the aggregation default to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ReturnedQuantities {
    pub qty: Decimal,
    pub stock_qty: Decimal,
    pub received_qty: Decimal,
    pub rejected_qty: Decimal,
    pub received_stock_qty: Decimal,
}

impl ReturnedQuantities {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
