//! SKU index over the WEB record set.
//!
//! Duplicate SKUs are last-write-wins: a later WEB row replaces an
//! earlier one with the same normalized SKU. Records without a SKU are
//! not indexed.

use std::collections::HashMap;

use super::chunked::ChunkPlan;
use crate::models::WebRecord;
use crate::progress::Cancelled;

/// Lookup from normalized SKU to WEB record.
#[derive(Debug, Clone, Default)]
pub struct SkuIndex {
    by_sku: HashMap<String, WebRecord>,
    overwritten: usize,
}

impl SkuIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one record. Returns `false` when it has no SKU.
    pub fn insert(&mut self, record: &WebRecord) -> bool {
        if record.sku.is_empty() {
            return false;
        }
        if self
            .by_sku
            .insert(record.sku.clone(), record.clone())
            .is_some()
        {
            self.overwritten += 1;
        }
        true
    }

    pub fn get(&self, sku: &str) -> Option<&WebRecord> {
        self.by_sku.get(sku)
    }

    /// Distinct SKUs indexed.
    pub fn len(&self) -> usize {
        self.by_sku.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sku.is_empty()
    }

    /// WEB rows replaced by a later row with the same SKU.
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }
}

/// Build the index chunk by chunk.
///
/// Zero records resolve to an empty index without any progress report.
pub async fn build_index(records: &[WebRecord], plan: ChunkPlan<'_>) -> Result<SkuIndex, Cancelled> {
    let mut index = SkuIndex::new();

    plan.run(records, |_, chunk| {
        for record in chunk {
            index.insert(record);
        }
    })
    .await?;

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{CancelFlag, NoProgress, Stage};
    use std::sync::Mutex;

    fn web(sku: &str, name: &str) -> WebRecord {
        WebRecord {
            doc_number: String::new(),
            sku: sku.to_string(),
            product_name: name.to_string(),
            qty: 1,
        }
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let records = vec![
            web("WM-101", "Old Mouse"),
            web("LP-404", "Laptop"),
            web("WM-101", "New Mouse"),
        ];
        let cancel = CancelFlag::new();
        let index = build_index(&records, ChunkPlan::new(Stage::BuildingIndex, 2, &NoProgress, &cancel))
            .await
            .unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("WM-101").unwrap().product_name, "New Mouse");
        assert_eq!(index.overwritten(), 1);
    }

    #[tokio::test]
    async fn test_empty_sku_not_indexed() {
        let records = vec![web("", "No SKU"), web("A-1", "Alpha")];
        let cancel = CancelFlag::new();
        let index = build_index(&records, ChunkPlan::new(Stage::BuildingIndex, 10, &NoProgress, &cancel))
            .await
            .unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.get("").is_none());
    }

    #[tokio::test]
    async fn test_empty_input_no_progress() {
        let seen = Mutex::new(Vec::new());
        let sink = |stage: Stage, p: u8| seen.lock().unwrap().push((stage, p));
        let cancel = CancelFlag::new();
        let index = build_index(&[], ChunkPlan::new(Stage::BuildingIndex, 10, &sink, &cancel))
            .await
            .unwrap();

        assert!(index.is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_progress_reaches_100() {
        let records: Vec<WebRecord> = (0..25).map(|i| web(&format!("S-{}", i), "x")).collect();
        let seen = Mutex::new(Vec::new());
        let sink = |_: Stage, p: u8| seen.lock().unwrap().push(p);
        let cancel = CancelFlag::new();
        build_index(&records, ChunkPlan::new(Stage::BuildingIndex, 10, &sink, &cancel))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![40, 80, 100]);
    }
}
