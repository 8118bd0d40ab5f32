use crate::{
    errors::ServiceError,
    models::{
        ChargeType, Doctype, ItemRow, PaymentRow, PaymentScheduleRow, TransactionDocument,
        DOCSTATUS_SUBMITTED,
    },
    services::{
        lookups::{value_as_string, RecordLookup, ReturnLedger, TotalsCalculator, Translator},
        mapper::{DocumentMapper, FieldCondition, MapperHooks, MappingSpec, TableRule, TargetDoc},
        serial_no::{join_serial_nos, parse_serial_nos, remaining_serial_nos},
        totals::checked,
    },
    tracing::with_metrics,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info, instrument, warn};

const PRINT_HEADING_LABEL: &str = "Credit Note";
const RETURN_WAREHOUSE_FIELD: &str = "default_warehouse_for_sales_return";

/// Sign applied to copied quantities and amounts.
///
/// The default keeps values as they are on the source document; with
/// `reverse_sign` they are negated. Payment terms are negated either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignPolicy {
    pub reverse_sign: bool,
}

impl SignPolicy {
    pub fn new(reverse_sign: bool) -> Self {
        Self { reverse_sign }
    }

    pub fn factor(&self) -> Decimal {
        if self.reverse_sign {
            Decimal::NEGATIVE_ONE
        } else {
            Decimal::ONE
        }
    }

    pub fn apply(&self, value: Decimal) -> Decimal {
        self.factor() * value
    }
}

/// Caller identity and locale for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user: String,
    pub lang: String,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn new(user: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            lang: lang.into(),
            request_id: None,
        }
    }

    pub fn guest(lang: impl Into<String>) -> Self {
        Self::new("Guest", lang)
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Builds reversing notes from submitted transactional documents.
#[derive(Clone)]
pub struct DebitNoteService {
    mapper: Arc<dyn DocumentMapper>,
    records: Arc<dyn RecordLookup>,
    returns: Arc<dyn ReturnLedger>,
    totals: Arc<dyn TotalsCalculator>,
    translator: Arc<dyn Translator>,
    policy: SignPolicy,
    currency_precision: u32,
}

impl DebitNoteService {
    pub fn new(
        mapper: Arc<dyn DocumentMapper>,
        records: Arc<dyn RecordLookup>,
        returns: Arc<dyn ReturnLedger>,
        totals: Arc<dyn TotalsCalculator>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            mapper,
            records,
            returns,
            totals,
            translator,
            policy: SignPolicy::default(),
            currency_precision: 2,
        }
    }

    pub fn with_sign_policy(mut self, policy: SignPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_currency_precision(mut self, precision: u32) -> Self {
        self.currency_precision = precision;
        self
    }

    /// Sales invoice entry point.
    pub async fn make_sales_debit(
        &self,
        ctx: &RequestContext,
        source_name: &str,
        target: Option<TargetDoc>,
    ) -> Result<TransactionDocument, ServiceError> {
        self.make_debit_note(ctx, Doctype::SalesInvoice, source_name, target)
            .await
    }

    /// Maps the submitted `source_name` of `doctype` into a new note of the
    /// same doctype. The returned document is not persisted.
    #[instrument(skip(self, ctx, target), fields(user = %ctx.user, lang = %ctx.lang))]
    pub async fn make_debit_note(
        &self,
        ctx: &RequestContext,
        doctype: Doctype,
        source_name: &str,
        target: Option<TargetDoc>,
    ) -> Result<TransactionDocument, ServiceError> {
        let tags = HashMap::from([
            ("doctype", doctype.to_string()),
            ("source", source_name.to_string()),
        ]);

        with_metrics("debit_notes", tags, || {
            self.build_note(ctx, doctype, source_name, target)
        })
        .await
    }

    async fn build_note(
        &self,
        ctx: &RequestContext,
        doctype: Doctype,
        source_name: &str,
        target: Option<TargetDoc>,
    ) -> Result<TransactionDocument, ServiceError> {
        let target = target.map(TargetDoc::into_document).transpose()?;

        let company = value_as_string(
            self.records
                .get_value(doctype.as_str(), source_name, "company")
                .await?,
        );
        let return_warehouse = match company.as_deref() {
            Some(company) => value_as_string(
                self.records
                    .get_cached_value("Company", company, RETURN_WAREHOUSE_FIELD)
                    .await?,
            ),
            None => {
                warn!(%doctype, source_name, "source has no company; no return warehouse applied");
                None
            }
        };

        let paid_precision = self
            .records
            .field_precision(doctype, "base_paid_amount")
            .await?
            .unwrap_or(self.currency_precision);

        let hooks = DebitNoteHooks {
            service: self,
            ctx,
            doctype,
            return_warehouse,
            paid_precision,
        };

        let mut note = self
            .mapper
            .get_mapped_doc(&mapping_spec(doctype), source_name, target, &hooks)
            .await?;
        note.set_onload("ignore_price_list", true);

        info!(
            %doctype,
            source_name,
            items = note.items.len(),
            grand_total = %note.grand_total,
            "debit note prepared"
        );
        Ok(note)
    }
}

/// Mapping rules for a note of `doctype` raised against the same doctype.
pub fn mapping_spec(doctype: Doctype) -> MappingSpec {
    let item_doctype = doctype.item_doctype();
    MappingSpec::new(doctype, doctype)
        .with_validation(FieldCondition::eq("docstatus", DOCSTATUS_SUBMITTED))
        .with_table(
            item_doctype.clone(),
            TableRule::new(item_doctype)
                .map_field("serial_no", "serial_no")
                .map_field("batch_no", "batch_no")
                .map_field("bom", "bom")
                .with_postprocess(),
        )
        .with_table(
            "Payment Schedule",
            TableRule::new("Payment Schedule").with_postprocess(),
        )
}

struct DebitNoteHooks<'a> {
    service: &'a DebitNoteService,
    ctx: &'a RequestContext,
    doctype: Doctype,
    return_warehouse: Option<String>,
    paid_precision: u32,
}

impl DebitNoteHooks<'_> {
    fn sign(&self, value: Decimal) -> Decimal {
        self.service.policy.apply(value)
    }

    async fn print_heading(&self) -> Result<Option<String>, ServiceError> {
        let label = self
            .service
            .translator
            .translate(&self.ctx.lang, PRINT_HEADING_LABEL);
        Ok(value_as_string(
            self.service
                .records
                .get_cached_value("Print Heading", &label, "name")
                .await?,
        ))
    }

    /// Signed `source - returned`.
    fn net(
        &self,
        source: Decimal,
        returned: Decimal,
        field: &str,
    ) -> Result<Decimal, ServiceError> {
        checked(source.checked_sub(returned), field).map(|value| self.sign(value))
    }

    fn rebuild_payments(
        &self,
        source: &TransactionDocument,
    ) -> Result<Vec<PaymentRow>, ServiceError> {
        source
            .payments
            .iter()
            .enumerate()
            .map(|(i, payment)| {
                let base_amount = checked(
                    payment.amount.checked_mul(source.conversion_rate),
                    "base_amount",
                )?
                .round_dp(self.paid_precision);
                Ok(PaymentRow {
                    idx: i as u32 + 1,
                    mode_of_payment: payment.mode_of_payment.clone(),
                    payment_type: payment.payment_type.clone(),
                    account: payment.account.clone(),
                    default: payment.default,
                    amount: self.sign(payment.amount),
                    base_amount: self.sign(base_amount),
                    ..Default::default()
                })
            })
            .collect()
    }
}

#[async_trait]
impl MapperHooks for DebitNoteHooks<'_> {
    async fn postprocess_item(
        &self,
        source: &ItemRow,
        target: &mut ItemRow,
        source_parent: &TransactionDocument,
    ) -> Result<(), ServiceError> {
        target.qty = self.sign(source.qty);

        if let Some(raw) = source.serial_no.as_deref().filter(|s| !s.trim().is_empty()) {
            let returned = self
                .service
                .returns
                .returned_serial_nos(source, source_parent)
                .await?;
            let remaining = remaining_serial_nos(&parse_serial_nos(raw), &returned);
            target.serial_no = (!remaining.is_empty()).then(|| join_serial_nos(&remaining));
        }

        let parent_name = source_parent.name.as_deref().unwrap_or_default();
        let row_name = source.name.as_deref().unwrap_or_default();

        match self.doctype {
            Doctype::PurchaseReceipt | Doctype::SubcontractingReceipt => {
                let returned = self
                    .service
                    .returns
                    .returned_qty_map_for_row(
                        parent_name,
                        source_parent.supplier.as_deref(),
                        row_name,
                        self.doctype,
                    )
                    .await?;

                if self.doctype == Doctype::SubcontractingReceipt {
                    target.received_qty = self.sign(source.qty);
                } else {
                    target.received_qty =
                        self.net(source.received_qty, returned.received_qty, "received_qty")?;
                    target.rejected_qty =
                        self.net(source.rejected_qty, returned.rejected_qty, "rejected_qty")?;
                }

                target.qty = self.net(source.qty, returned.qty, "qty")?;

                if self.doctype.item_has_stock_qty() {
                    target.stock_qty = self.net(source.stock_qty, returned.stock_qty, "stock_qty")?;
                    target.received_stock_qty = self.net(
                        source.received_stock_qty,
                        returned.received_stock_qty,
                        "received_stock_qty",
                    )?;
                }

                target.rejected_warehouse = source.rejected_warehouse.clone();
                if self.doctype == Doctype::SubcontractingReceipt {
                    target.subcontracting_order = source.subcontracting_order.clone();
                    target.subcontracting_order_item = source.subcontracting_order_item.clone();
                    target.subcontracting_receipt_item = source.name.clone();
                } else {
                    target.purchase_order = source.purchase_order.clone();
                    target.purchase_order_item = source.purchase_order_item.clone();
                    target.purchase_receipt_item = source.name.clone();
                }
            }
            Doctype::SalesInvoice | Doctype::PosInvoice => {
                let returned = self
                    .service
                    .returns
                    .returned_qty_map_for_row(
                        parent_name,
                        source_parent.customer.as_deref(),
                        row_name,
                        self.doctype,
                    )
                    .await?;

                target.qty = self.net(source.qty, returned.qty, "qty")?;
                target.stock_qty = self.net(source.stock_qty, returned.stock_qty, "stock_qty")?;

                target.sales_order = source.sales_order.clone();
                target.delivery_note = source.delivery_note.clone();
                target.so_detail = source.so_detail.clone();
                target.dn_detail = source.dn_detail.clone();
                target.expense_account = source.expense_account.clone();

                if self.doctype == Doctype::SalesInvoice {
                    target.sales_invoice_item = source.name.clone();
                } else {
                    target.pos_invoice_item = source.name.clone();
                }

                if let Some(warehouse) = &self.return_warehouse {
                    target.warehouse = Some(warehouse.clone());
                }
            }
            Doctype::PurchaseInvoice | Doctype::DeliveryNote => {}
        }

        debug!(row = row_name, qty = %target.qty, "item row prepared");
        Ok(())
    }

    fn postprocess_payment_term(
        &self,
        source: &PaymentScheduleRow,
        target: &mut PaymentScheduleRow,
        _source_parent: &TransactionDocument,
    ) {
        target.payment_amount = -source.payment_amount;
    }

    async fn postprocess(
        &self,
        source: &TransactionDocument,
        target: &mut TransactionDocument,
    ) -> Result<(), ServiceError> {
        target.debit_note = true;
        target.debit_against = source.name.clone();
        target.payment_schedule.clear();
        target.set_warehouse = None;

        if self.doctype.is_invoice_like() {
            target.is_pos = source.is_pos;
            if target.select_print_heading.as_deref().map_or(true, str::is_empty) {
                target.select_print_heading = self.print_heading().await?;
            }
        }

        for tax in target
            .taxes
            .iter_mut()
            .filter(|tax| tax.charge_type == ChargeType::Actual)
        {
            tax.tax_amount = self.sign(tax.tax_amount);
        }

        if target.debit_note {
            if target.doctype.is_invoice_like() {
                target.consolidated_invoice = None;
                target.payments = self.rebuild_payments(source)?;
                if target.is_pos {
                    target.paid_amount = self.sign(source.paid_amount);
                }
            }

            if target.doctype.has_packed_items() {
                for packed in target.packed_items.iter_mut() {
                    packed.qty = self.sign(packed.qty);
                }
            }
        }

        if !target.discount_amount.is_zero() {
            target.discount_amount = self.sign(source.discount_amount);
        }

        if self.doctype != Doctype::SubcontractingReceipt {
            self.service
                .totals
                .calculate_taxes_and_totals(target, self.service.currency_precision)?;
        }

        Ok(())
    }
}
