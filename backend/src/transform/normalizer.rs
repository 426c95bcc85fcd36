//! Header Normalizer
//!
//! Turns a decoder [`RawRow`] into a closed record type by alias
//! resolution and value coercion. Missing fields default to empty text or
//! zero; nothing here fails.

use once_cell::sync::Lazy;
use regex::Regex;

use super::aliases::{self, AliasSet};
use crate::models::{AccountingRecord, DocType, RawRow, ReconciliationRecord, WebRecord};

static NON_SKU_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Z0-9-]").unwrap());

/// Record type tag for [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Web,
    Accounting,
    Reconciliation,
}

/// A normalized row of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedRecord {
    Web(WebRecord),
    Accounting(AccountingRecord),
    Reconciliation(ReconciliationRecord),
}

/// Normalize one row. `index` is the row position in its file.
pub fn normalize(row: &RawRow, kind: RecordKind, index: usize) -> NormalizedRecord {
    match kind {
        RecordKind::Web => NormalizedRecord::Web(normalize_web(row)),
        RecordKind::Accounting => NormalizedRecord::Accounting(normalize_accounting(row, index)),
        RecordKind::Reconciliation => {
            NormalizedRecord::Reconciliation(normalize_reconciliation(row))
        }
    }
}

/// Upper-case and drop every character outside `[A-Z0-9-]`.
///
/// Idempotent and case-insensitive.
pub fn normalize_sku(raw: &str) -> String {
    NON_SKU_CHARS
        .replace_all(&raw.to_uppercase(), "")
        .into_owned()
}

/// Best-effort integer: integer text, else float text truncated, else 0.
pub fn coerce_qty(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return n;
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => f.trunc() as i64,
        _ => 0,
    }
}

/// First alias present in the row, even when that cell is empty.
pub fn resolve<'a>(row: &'a RawRow, set: &AliasSet) -> Option<&'a str> {
    set.aliases.iter().find_map(|alias| row.get(alias))
}

fn text(row: &RawRow, set: &AliasSet) -> String {
    resolve(row, set).unwrap_or_default().to_string()
}

pub fn normalize_web(row: &RawRow) -> WebRecord {
    WebRecord {
        doc_number: text(row, &aliases::web::DOC_NUMBER),
        sku: normalize_sku(resolve(row, &aliases::web::SKU).unwrap_or_default()),
        product_name: text(row, &aliases::web::PRODUCT_NAME),
        qty: coerce_qty(resolve(row, &aliases::web::QTY).unwrap_or_default()),
    }
}

pub fn normalize_accounting(row: &RawRow, index: usize) -> AccountingRecord {
    use aliases::accounting as a;

    AccountingRecord {
        id: format!("row-{}", index),
        date: text(row, &a::DATE),
        doc_type: DocType::parse(resolve(row, &a::DOC_TYPE).unwrap_or_default()),
        doc_number: text(row, &a::DOC_NUMBER),
        customer: text(row, &a::CUSTOMER),
        sku: normalize_sku(resolve(row, &a::SKU).unwrap_or_default()),
        product_label: text(row, &a::PRODUCT_LABEL),
        description: text(row, &a::DESCRIPTION),
        qty: coerce_qty(resolve(row, &a::QTY).unwrap_or_default()),
        ship_to: text(row, &a::SHIP_TO),
    }
}

/// Read back a row of an exported reconciliation report.
pub fn normalize_reconciliation(row: &RawRow) -> ReconciliationRecord {
    use aliases::reconciliation as r;

    ReconciliationRecord {
        sku: normalize_sku(resolve(row, &r::SKU).unwrap_or_default()),
        web_product_name: text(row, &r::WEB_NAME),
        accounting_product_name: text(row, &r::QBO_NAME),
        accounting_description: text(row, &r::QBO_DESCRIPTION),
    }
}

/// Fields of `table` that no header in `keys` can supply.
pub fn unresolved_fields<'a, I>(keys: I, table: &[AliasSet]) -> Vec<&'static str>
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    table
        .iter()
        .filter(|set| set.resolve_in(keys.clone()).is_none())
        .map(|set| set.field)
        .collect()
}
