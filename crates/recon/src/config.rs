use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::alias::AliasTable;
use crate::error::ReconError;
use crate::model::OrderType;
use crate::normalize::normalize;
use crate::planner::DEFAULT_BATCH_SIZE;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    #[serde(default)]
    pub order_type: OrderType,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Destination table for upserts.
    #[serde(default = "default_table")]
    pub table: String,
    /// Product cells that are silently ignored (total rows and the like).
    #[serde(default)]
    pub skip_products: Vec<String>,
    /// First sales day imported (inclusive, "YYYY-MM-DD").
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    /// Last sales day imported (inclusive).
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub layout: SheetLayout,
    /// Raw product name -> product slug.
    pub products: BTreeMap<String, String>,
    /// Sheet label -> chain slug.
    pub sheets: BTreeMap<String, String>,
    #[serde(default)]
    pub stores: StoreMatching,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_table() -> String {
    "daily_sales".into()
}

// ---------------------------------------------------------------------------
// Sheet layout
// ---------------------------------------------------------------------------

/// Zero-based positions of the header row and the fixed columns.
///
/// Every column from `first_store_col` on is a store column whose header
/// cell holds the store's display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SheetLayout {
    #[serde(default)]
    pub header_row: usize,
    #[serde(default)]
    pub date_col: usize,
    #[serde(default = "default_product_col")]
    pub product_col: usize,
    #[serde(default = "default_first_store_col")]
    pub first_store_col: usize,
}

fn default_product_col() -> usize {
    1
}

fn default_first_store_col() -> usize {
    2
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            header_row: 0,
            date_col: 0,
            product_col: default_product_col(),
            first_store_col: default_first_store_col(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct StoreMatching {
    /// Splits "SubBrand-Location" style headers.
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Minimum shared leading characters for the prefix fallback.
    #[serde(default = "default_prefix_min_len")]
    pub prefix_min_len: usize,
    #[serde(default)]
    pub synonyms: Vec<SubBrandSynonym>,
}

fn default_separator() -> String {
    "-".into()
}

fn default_prefix_min_len() -> usize {
    4
}

impl Default for StoreMatching {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            prefix_min_len: default_prefix_min_len(),
            synonyms: Vec::new(),
        }
    }
}

/// Sub-brand abbreviation rewrite, e.g. "Kjörbúð-Dalvík" -> "Kjörbúðin Dalvík".
#[derive(Debug, Clone, Deserialize)]
pub struct SubBrandSynonym {
    /// Matched against the start of the normalized sub-brand.
    pub prefix: String,
    pub replacement: String,
}

// ---------------------------------------------------------------------------
// Resolver tables
// ---------------------------------------------------------------------------

/// The immutable lookup configuration an `EntityResolver` is built from.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub products: AliasTable,
    pub sheets: AliasTable,
    pub stores: StoreMatching,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        if self.batch_size == 0 {
            return Err(ReconError::ConfigValidation(
                "batch_size must be at least 1".into(),
            ));
        }

        if self.table.trim().is_empty() {
            return Err(ReconError::ConfigValidation("table must not be empty".into()));
        }

        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(ReconError::ConfigValidation(format!(
                    "date_from ({from}) is after date_to ({to})"
                )));
            }
        }

        if self.products.is_empty() {
            return Err(ReconError::ConfigValidation(
                "[products] needs at least one alias".into(),
            ));
        }

        if self.sheets.is_empty() {
            return Err(ReconError::ConfigValidation(
                "[sheets] needs at least one alias".into(),
            ));
        }

        let layout = &self.layout;
        if layout.date_col == layout.product_col {
            return Err(ReconError::ConfigValidation(
                "layout.date_col and layout.product_col must differ".into(),
            ));
        }
        if layout.first_store_col <= layout.date_col.max(layout.product_col) {
            return Err(ReconError::ConfigValidation(format!(
                "layout.first_store_col ({}) must come after the date and product columns",
                layout.first_store_col
            )));
        }

        if self.stores.separator.is_empty() {
            return Err(ReconError::ConfigValidation(
                "stores.separator must not be empty".into(),
            ));
        }
        if self.stores.prefix_min_len == 0 {
            return Err(ReconError::ConfigValidation(
                "stores.prefix_min_len must be at least 1".into(),
            ));
        }
        for synonym in &self.stores.synonyms {
            if normalize(&synonym.prefix).is_empty() || normalize(&synonym.replacement).is_empty() {
                return Err(ReconError::ConfigValidation(
                    "stores.synonyms entries need a prefix and a replacement".into(),
                ));
            }
        }

        // Alias tables are rebuilt by the resolver; building them here
        // surfaces blank keys and conflicts at load time.
        self.resolver_config()?;

        Ok(())
    }

    pub fn resolver_config(&self) -> Result<ResolverConfig, ReconError> {
        Ok(ResolverConfig {
            products: AliasTable::build("products", &self.products)?,
            sheets: AliasTable::build("sheets", &self.sheets)?,
            stores: self.stores.clone(),
        })
    }

    /// True when `date` falls inside the optional `date_from..=date_to` window.
    pub fn in_date_window(&self, date: NaiveDate) -> bool {
        self.date_from.map_or(true, |from| date >= from)
            && self.date_to.map_or(true, |to| date <= to)
    }

    /// True for product cells that mark non-product rows (e.g. "Samtals").
    pub fn is_skipped_product(&self, raw: &str) -> bool {
        let needle = normalize(raw);
        self.skip_products.iter().any(|s| normalize(s) == needle)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
