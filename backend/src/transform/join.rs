//! Join Engine
//!
//! Streams the accounting records against the [`SkuIndex`] and emits one
//! [`ReconciliationRecord`] per hit. Inner join: accounting rows without a
//! WEB counterpart are dropped. Output keeps accounting input order.

use super::chunked::ChunkPlan;
use super::index::SkuIndex;
use crate::models::{AccountingRecord, ReconciliationRecord};
use crate::progress::Cancelled;

/// Join accounting records against the index, chunk by chunk.
pub async fn join(
    accounting: &[AccountingRecord],
    index: &SkuIndex,
    plan: ChunkPlan<'_>,
) -> Result<Vec<ReconciliationRecord>, Cancelled> {
    let mut results = Vec::new();

    plan.run(accounting, |_, chunk| {
        results.extend(chunk.iter().filter_map(|record| match_record(record, index)));
    })
    .await?;

    Ok(results)
}

/// Pair one accounting record with its WEB counterpart, if indexed.
pub fn match_record(record: &AccountingRecord, index: &SkuIndex) -> Option<ReconciliationRecord> {
    if record.sku.is_empty() {
        return None;
    }
    index
        .get(&record.sku)
        .map(|web| ReconciliationRecord::pair(record, web))
}
