//! Run summary: counts plus the sets of names nothing could be resolved to.
//!
//! The report only grows. Every `record_*` call adds to it and none of them
//! can fail, so the engine can keep going through any amount of bad input.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::model::StoreId;
use crate::resolver::MatchMethod;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UnresolvedProduct {
    pub raw: String,
    /// Set when the alias table knew the name but the catalog had no such slug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl fmt::Display for UnresolvedProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slug {
            Some(slug) => write!(f, "{} (slug: {slug})", self.raw),
            None => write!(f, "{}", self.raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UnresolvedChain {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl fmt::Display for UnresolvedChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slug {
            Some(slug) => write!(f, "{} (slug: {slug})", self.label),
            None => write!(f, "{}", self.label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UnresolvedStore {
    pub sheet: String,
    pub raw: String,
}

impl fmt::Display for UnresolvedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.sheet, self.raw)
    }
}

/// A store column matched by something other than an exact name lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeuristicMatch {
    pub sheet: String,
    pub raw: String,
    pub store_id: StoreId,
    pub matched_name: String,
    pub method: MatchMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub batch: usize,
    pub records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SheetSummary {
    pub label: String,
    pub chain: Option<String>,
    pub matched_stores: usize,
    pub unmatched_stores: usize,
    pub rows: usize,
    /// Quantity cells accepted from this sheet, before aggregation.
    pub observations: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationReport {
    planned: usize,
    written: usize,
    batches: usize,
    failed_batches: Vec<BatchFailure>,
    unresolved_products: BTreeSet<UnresolvedProduct>,
    unresolved_stores: BTreeSet<UnresolvedStore>,
    unmapped_sheets: BTreeSet<UnresolvedChain>,
    heuristic_matches: Vec<HeuristicMatch>,
    dropped_quantities: usize,
    skipped_rows: usize,
    rows_outside_window: usize,
    sheets: Vec<SheetSummary>,
}

impl ReconciliationReport {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Recording ───────────────────────────────────────────────────

    pub fn record_planned(&mut self, records: usize, batches: usize) {
        self.planned += records;
        self.batches += batches;
    }

    pub fn record_written(&mut self, records: usize) {
        self.written += records;
    }

    pub fn record_batch_failure(&mut self, failure: BatchFailure) {
        self.failed_batches.push(failure);
    }

    pub fn record_unresolved_product(&mut self, product: UnresolvedProduct) {
        self.unresolved_products.insert(product);
    }

    pub fn record_unresolved_store(&mut self, store: UnresolvedStore) {
        self.unresolved_stores.insert(store);
    }

    pub fn record_unmapped_sheet(&mut self, chain: UnresolvedChain) {
        self.unmapped_sheets.insert(chain);
    }

    pub fn record_heuristic_match(&mut self, m: HeuristicMatch) {
        self.heuristic_matches.push(m);
    }

    pub fn record_dropped_quantity(&mut self) {
        self.dropped_quantities += 1;
    }

    pub fn record_skipped_row(&mut self) {
        self.skipped_rows += 1;
    }

    pub fn record_row_outside_window(&mut self) {
        self.rows_outside_window += 1;
    }

    pub fn record_sheet(&mut self, sheet: SheetSummary) {
        self.sheets.push(sheet);
    }

    // ── Reading ─────────────────────────────────────────────────────

    pub fn planned(&self) -> usize {
        self.planned
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn failed_batches(&self) -> &[BatchFailure] {
        &self.failed_batches
    }

    pub fn unresolved_products(&self) -> &BTreeSet<UnresolvedProduct> {
        &self.unresolved_products
    }

    pub fn unresolved_stores(&self) -> &BTreeSet<UnresolvedStore> {
        &self.unresolved_stores
    }

    pub fn unmapped_sheets(&self) -> &BTreeSet<UnresolvedChain> {
        &self.unmapped_sheets
    }

    pub fn heuristic_matches(&self) -> &[HeuristicMatch] {
        &self.heuristic_matches
    }

    pub fn dropped_quantities(&self) -> usize {
        self.dropped_quantities
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Rows dated before `date_from` or after `date_to`.
    pub fn rows_outside_window(&self) -> usize {
        self.rows_outside_window
    }

    pub fn sheets(&self) -> &[SheetSummary] {
        &self.sheets
    }

    pub fn has_unresolved(&self) -> bool {
        !self.unresolved_products.is_empty()
            || !self.unresolved_stores.is_empty()
            || !self.unmapped_sheets.is_empty()
    }

    pub fn has_write_failures(&self) -> bool {
        !self.failed_batches.is_empty()
    }
}
