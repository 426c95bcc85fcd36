//! Transformation module.
//!
//! This module turns decoded rows into the reconciliation result:
//! - Aliases: per-field header alias tables
//! - Normalizer: raw rows to typed records
//! - Chunked: cooperative chunk loop with progress and cancellation
//! - Index: WEB records keyed by SKU
//! - Join: accounting records matched against the index
//! - Pipeline: end-to-end run

pub mod aliases;
pub mod chunked;
pub mod index;
pub mod join;
pub mod normalizer;
pub mod pipeline;

pub use index::{build_index, SkuIndex};
pub use join::join;
pub use normalizer::{normalize, normalize_sku, NormalizedRecord, RecordKind};
pub use pipeline::*;
