use crate::{
    errors::ServiceError,
    models::{ChargeType, TransactionDocument},
    services::lookups::TotalsCalculator,
};
use rust_decimal::Decimal;

/// Item-level amounts, cascading tax rows and header totals.
///
/// Tax rows are evaluated in order and each row's `total` is the running
/// total after it. Discount is applied on the grand total.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTotalsCalculator;

impl StandardTotalsCalculator {
    pub fn new() -> Self {
        Self
    }
}

/// Unwraps a checked `Decimal` operation, reporting overflow as bad input.
pub(crate) fn checked(value: Option<Decimal>, field: &str) -> Result<Decimal, ServiceError> {
    value.ok_or_else(|| ServiceError::InvalidInput(format!("{} is out of range", field)))
}

fn checked_sum(
    mut values: impl Iterator<Item = Decimal>,
    field: &str,
) -> Result<Decimal, ServiceError> {
    values.try_fold(Decimal::ZERO, |acc, value| checked(acc.checked_add(value), field))
}

impl TotalsCalculator for StandardTotalsCalculator {
    fn calculate_taxes_and_totals(
        &self,
        doc: &mut TransactionDocument,
        precision: u32,
    ) -> Result<(), ServiceError> {
        let round = |value: Decimal| value.round_dp(precision);
        let conversion_rate = if doc.conversion_rate.is_zero() {
            Decimal::ONE
        } else {
            doc.conversion_rate
        };
        let to_base = |value: Decimal, field: &str| {
            checked(value.checked_mul(conversion_rate), field).map(round)
        };

        for item in doc.items.iter_mut() {
            item.amount = round(checked(item.qty.checked_mul(item.rate), "amount")?);
            item.base_amount = to_base(item.amount, "base_amount")?;
        }

        doc.total_qty = checked_sum(doc.items.iter().map(|item| item.qty), "total_qty")?;
        doc.total = checked_sum(doc.items.iter().map(|item| item.amount), "total")?;
        doc.base_total = to_base(doc.total, "base_total")?;
        doc.net_total = doc.total;
        doc.base_net_total = doc.base_total;

        let mut running_total = doc.net_total;
        for i in 0..doc.taxes.len() {
            let tax = &doc.taxes[i];
            let percent = |base: Decimal| {
                base.checked_mul(tax.rate)
                    .and_then(|value| value.checked_div(Decimal::ONE_HUNDRED))
            };
            let referenced = || -> Result<usize, ServiceError> {
                match tax.row_id {
                    Some(row) if row >= 1 && (row as usize) <= i => Ok(row as usize - 1),
                    other => Err(ServiceError::ValidationError(format!(
                        "Row {}: charge type {:?} needs a previous row reference, got {:?}",
                        i + 1,
                        tax.charge_type,
                        other
                    ))),
                }
            };

            let amount = match tax.charge_type {
                ChargeType::Actual => Some(tax.tax_amount),
                ChargeType::OnNetTotal => percent(doc.net_total),
                ChargeType::OnPreviousRowAmount => percent(doc.taxes[referenced()?].tax_amount),
                ChargeType::OnPreviousRowTotal => percent(doc.taxes[referenced()?].total),
                ChargeType::OnItemQuantity => doc.total_qty.checked_mul(tax.rate),
            };

            let amount = round(checked(amount, "tax_amount")?);
            running_total = checked(running_total.checked_add(amount), "total")?;
            let base_tax_amount = to_base(amount, "base_tax_amount")?;

            let tax = &mut doc.taxes[i];
            tax.tax_amount = amount;
            tax.base_tax_amount = base_tax_amount;
            tax.total = running_total;
        }

        doc.total_taxes_and_charges = checked(
            running_total.checked_sub(doc.net_total),
            "total_taxes_and_charges",
        )?;
        doc.base_total_taxes_and_charges =
            to_base(doc.total_taxes_and_charges, "base_total_taxes_and_charges")?;
        doc.grand_total = round(checked(
            running_total.checked_sub(doc.discount_amount),
            "grand_total",
        )?);
        doc.base_grand_total = to_base(doc.grand_total, "base_grand_total")?;
        doc.base_paid_amount = to_base(doc.paid_amount, "base_paid_amount")?;
        doc.outstanding_amount = if doc.is_pos {
            checked(
                doc.grand_total.checked_sub(doc.paid_amount),
                "outstanding_amount",
            )?
        } else {
            doc.grand_total
        };

        Ok(())
    }
}
