//! Declarative document mapping.
//!
//! A [`MappingSpec`] describes how a source document becomes a target document:
//! which conditions the source must satisfy, and per child doctype which field
//! renames apply and whether the caller's row hook runs. Tables without an
//! explicit rule are copied when both sides carry the same child doctype.
//! Field copying works on the serialized form of a row, so any field that
//! exists on both sides is carried over unless it is on the no-copy list.

use crate::{
    errors::ServiceError,
    models::{
        Doctype, ItemRow, PackedItem, PaymentRow, PaymentScheduleRow, TaxRow, TransactionDocument,
    },
    services::lookups::DocumentStore,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::BTreeMap, fmt, sync::Arc};
use tracing::{debug, instrument};
use utoipa::ToSchema;

const HEADER_NO_COPY: &[&str] = &[
    "doctype",
    "name",
    "docstatus",
    "amended_from",
    "__onload",
    "items",
    "taxes",
    "payments",
    "payment_schedule",
    "packed_items",
];
const ITEM_NO_COPY: &[&str] = &["name", "idx", "serial_no", "batch_no", "bom"];
const ROW_NO_COPY: &[&str] = &["name", "idx"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOp {
    Eq,
    Ne,
}

/// A condition the source document must satisfy before it can be mapped.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub field: String,
    pub op: ConditionOp,
    pub value: Value,
}

impl FieldCondition {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: ConditionOp::Eq,
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: ConditionOp::Ne,
            value: value.into(),
        }
    }

    fn holds(&self, fields: &Map<String, Value>) -> bool {
        let actual = fields.get(&self.field).unwrap_or(&Value::Null);
        match self.op {
            ConditionOp::Eq => actual == &self.value,
            ConditionOp::Ne => actual != &self.value,
        }
    }
}

impl fmt::Display for FieldCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            ConditionOp::Eq => "=",
            ConditionOp::Ne => "!=",
        };
        write!(f, "{}{}{}", self.field, op, self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRule {
    pub source_doctype: Doctype,
    pub target_doctype: Doctype,
    pub validation: Vec<FieldCondition>,
}

/// Copy rule for one child doctype.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRule {
    pub target_doctype: String,
    /// `(source_field, target_field)` pairs copied after the same-name fields.
    pub field_map: Vec<(String, String)>,
    /// Whether the row hook for this table is invoked.
    pub postprocess: bool,
}

impl TableRule {
    pub fn new(target_doctype: impl Into<String>) -> Self {
        Self {
            target_doctype: target_doctype.into(),
            field_map: Vec::new(),
            postprocess: false,
        }
    }

    pub fn map_field(mut self, source: &str, target: &str) -> Self {
        self.field_map.push((source.to_string(), target.to_string()));
        self
    }

    pub fn with_postprocess(mut self) -> Self {
        self.postprocess = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingSpec {
    pub header: HeaderRule,
    /// Keyed by source child doctype, e.g. "Sales Invoice Item".
    pub tables: BTreeMap<String, TableRule>,
}

impl MappingSpec {
    pub fn new(source_doctype: Doctype, target_doctype: Doctype) -> Self {
        Self {
            header: HeaderRule {
                source_doctype,
                target_doctype,
                validation: Vec::new(),
            },
            tables: BTreeMap::new(),
        }
    }

    pub fn with_validation(mut self, condition: FieldCondition) -> Self {
        self.header.validation.push(condition);
        self
    }

    pub fn with_table(mut self, source_child_doctype: impl Into<String>, rule: TableRule) -> Self {
        self.tables.insert(source_child_doctype.into(), rule);
        self
    }

    fn plan(&self, source_child: Option<String>, target_child: Option<String>) -> TablePlan<'_> {
        let Some(source_child) = source_child else {
            return TablePlan::Skip;
        };
        if let Some(rule) = self.tables.get(&source_child) {
            return TablePlan::Explicit(rule);
        }
        match target_child {
            Some(target_child) if target_child == source_child => TablePlan::Implicit,
            _ => TablePlan::Skip,
        }
    }
}

enum TablePlan<'a> {
    Skip,
    Implicit,
    Explicit(&'a TableRule),
}

impl TablePlan<'_> {
    fn field_map(&self) -> &[(String, String)] {
        match self {
            TablePlan::Explicit(rule) => &rule.field_map,
            _ => &[],
        }
    }

    fn runs_postprocess(&self) -> bool {
        matches!(self, TablePlan::Explicit(rule) if rule.postprocess)
    }
}

/// Typed callbacks invoked while a document is mapped. Row hooks run as each
/// row is copied; `postprocess` runs once after all tables are copied.
#[async_trait]
pub trait MapperHooks: Send + Sync {
    async fn postprocess_item(
        &self,
        _source: &ItemRow,
        _target: &mut ItemRow,
        _source_parent: &TransactionDocument,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    fn postprocess_payment_term(
        &self,
        _source: &PaymentScheduleRow,
        _target: &mut PaymentScheduleRow,
        _source_parent: &TransactionDocument,
    ) {
    }

    async fn postprocess(
        &self,
        _source: &TransactionDocument,
        _target: &mut TransactionDocument,
    ) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Hooks that leave every copied row untouched.
pub struct NoHooks;

impl MapperHooks for NoHooks {}

#[async_trait]
pub trait DocumentMapper: Send + Sync {
    async fn get_mapped_doc(
        &self,
        spec: &MappingSpec,
        source_name: &str,
        target: Option<TransactionDocument>,
        hooks: &dyn MapperHooks,
    ) -> Result<TransactionDocument, ServiceError>;
}

/// Caller-supplied target shell, either structured or as serialized JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum TargetDoc {
    Document(Box<TransactionDocument>),
    Serialized(String),
}

impl TargetDoc {
    pub fn into_document(self) -> Result<TransactionDocument, ServiceError> {
        match self {
            TargetDoc::Document(doc) => Ok(*doc),
            TargetDoc::Serialized(raw) => serde_json::from_str(&raw)
                .map_err(|e| ServiceError::InvalidInput(format!("Invalid target document: {}", e))),
        }
    }
}

trait ChildRow: Serialize + DeserializeOwned + Default {
    fn set_idx(&mut self, idx: u32);
}

macro_rules! child_row {
    ($($row:ty),*) => {
        $(impl ChildRow for $row {
            fn set_idx(&mut self, idx: u32) {
                self.idx = idx;
            }
        })*
    };
}

child_row!(ItemRow, TaxRow, PaymentRow, PaymentScheduleRow, PackedItem);

fn to_fields<T: Serialize>(value: &T) -> Result<Map<String, Value>, ServiceError> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(ServiceError::InternalError(format!(
            "expected an object while mapping, got {}",
            other
        ))),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Overwrites target fields with every non-blank source field outside
/// `no_copy`, then applies the field map under the same rule.
fn map_fields<T>(
    source: &T,
    target: &mut T,
    no_copy: &[&str],
    field_map: &[(String, String)],
) -> Result<(), ServiceError>
where
    T: Serialize + DeserializeOwned,
{
    let source_fields = to_fields(source)?;
    let mut target_fields = to_fields(target)?;

    for (key, value) in &source_fields {
        if no_copy.contains(&key.as_str()) || is_blank(value) {
            continue;
        }
        target_fields.insert(key.clone(), value.clone());
    }

    for (source_key, target_key) in field_map {
        if let Some(value) = source_fields.get(source_key).filter(|v| !is_blank(v)) {
            target_fields.insert(target_key.clone(), value.clone());
        }
    }

    *target = serde_json::from_value(Value::Object(target_fields))?;
    Ok(())
}

fn new_row<R: ChildRow>(
    source: &R,
    no_copy: &[&str],
    plan: &TablePlan<'_>,
) -> Result<R, ServiceError> {
    let mut row = R::default();
    map_fields(source, &mut row, no_copy, plan.field_map())?;
    Ok(row)
}

fn append_row<R: ChildRow>(rows: &mut Vec<R>, mut row: R) {
    row.set_idx(rows.len() as u32 + 1);
    rows.push(row);
}

/// Copies a child table whose rule carries no asynchronous hook.
fn map_table<R, F>(
    plan: TablePlan<'_>,
    source_rows: &[R],
    target_rows: &mut Vec<R>,
    no_copy: &[&str],
    mut hook: F,
) -> Result<(), ServiceError>
where
    R: ChildRow,
    F: FnMut(&R, &mut R),
{
    if matches!(plan, TablePlan::Skip) {
        return Ok(());
    }
    for source_row in source_rows {
        let mut row = new_row(source_row, no_copy, &plan)?;
        if plan.runs_postprocess() {
            hook(source_row, &mut row);
        }
        append_row(target_rows, row);
    }
    Ok(())
}

/// Mapper reading its source documents from a [`DocumentStore`].
#[derive(Clone)]
pub struct StoreBackedMapper {
    store: Arc<dyn DocumentStore>,
}

impl StoreBackedMapper {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DocumentMapper for StoreBackedMapper {
    #[instrument(
        skip(self, spec, target, hooks),
        fields(source_doctype = %spec.header.source_doctype)
    )]
    async fn get_mapped_doc(
        &self,
        spec: &MappingSpec,
        source_name: &str,
        target: Option<TransactionDocument>,
        hooks: &dyn MapperHooks,
    ) -> Result<TransactionDocument, ServiceError> {
        let source_doctype = spec.header.source_doctype;
        let target_doctype = spec.header.target_doctype;

        let source = self
            .store
            .get_doc(source_doctype, source_name)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("{} {} not found", source_doctype, source_name))
            })?;

        let source_fields = to_fields(&source)?;
        if let Some(failed) = spec
            .header
            .validation
            .iter()
            .find(|condition| !condition.holds(&source_fields))
        {
            return Err(ServiceError::ValidationError(format!(
                "Cannot map because following condition fails: {}",
                failed
            )));
        }

        let mut target = target.unwrap_or_else(|| TransactionDocument::new(target_doctype));
        target.doctype = target_doctype;
        map_fields(&source, &mut target, HEADER_NO_COPY, &[])?;

        let items = spec.plan(
            Some(source_doctype.item_doctype()),
            Some(target_doctype.item_doctype()),
        );
        if !matches!(items, TablePlan::Skip) {
            for source_row in &source.items {
                let mut row = new_row(source_row, ITEM_NO_COPY, &items)?;
                if items.runs_postprocess() {
                    hooks
                        .postprocess_item(source_row, &mut row, &source)
                        .await?;
                }
                debug!(row = ?source_row.name, qty = %row.qty, "mapped item row");
                append_row(&mut target.items, row);
            }
        }

        map_table(
            spec.plan(
                Some(source_doctype.taxes_doctype().to_string()),
                Some(target_doctype.taxes_doctype().to_string()),
            ),
            &source.taxes,
            &mut target.taxes,
            ROW_NO_COPY,
            |_, _| {},
        )?;

        map_table(
            spec.plan(
                source_doctype.payments_doctype().map(str::to_string),
                target_doctype.payments_doctype().map(str::to_string),
            ),
            &source.payments,
            &mut target.payments,
            ROW_NO_COPY,
            |_, _| {},
        )?;

        map_table(
            spec.plan(
                Some("Payment Schedule".to_string()),
                Some("Payment Schedule".to_string()),
            ),
            &source.payment_schedule,
            &mut target.payment_schedule,
            ROW_NO_COPY,
            |source_row, row| hooks.postprocess_payment_term(source_row, row, &source),
        )?;

        let packed =
            |doctype: Doctype| doctype.has_packed_items().then(|| "Packed Item".to_string());
        map_table(
            spec.plan(packed(source_doctype), packed(target_doctype)),
            &source.packed_items,
            &mut target.packed_items,
            ROW_NO_COPY,
            |_, _| {},
        )?;

        hooks.postprocess(&source, &mut target).await?;

        Ok(target)
    }
}
