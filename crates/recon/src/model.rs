use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::report::ReconciliationReport;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Catalog product id (a UUID in the remote store, opaque here).
    ProductId
);
opaque_id!(
    /// Catalog retail chain id.
    ChainId
);
opaque_id!(
    /// Catalog store id. Stores always belong to exactly one chain.
    StoreId
);

// ---------------------------------------------------------------------------
// Order type
// ---------------------------------------------------------------------------

/// Sales channel tag; part of the fact identity key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    Retail,
    Subscription,
    OneTime,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retail => "retail",
            Self::Subscription => "subscription",
            Self::OneTime => "one_time",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Input: tabular source
// ---------------------------------------------------------------------------

/// Earliest and latest Excel serials accepted as dates (2009-07-06 .. 2064-04-08).
const EXCEL_SERIAL_MIN: f64 = 40000.0;
const EXCEL_SERIAL_MAX: f64 = 60000.0;

/// A single cell as delivered by a tabular source, independent of file format.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl RawCell {
    /// Empty, or text that is only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Cell rendered as text, the way a spreadsheet would display it.
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Interpret the cell as a calendar day.
    ///
    /// Text takes its first ten characters as `YYYY-MM-DD` (so
    /// `"2024-01-05 00:00:00"` works). Numbers are read as Excel 1900-system
    /// serials, but only inside a plausible range so that quantities are
    /// never mistaken for dates.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Text(s) => {
                let s = s.trim();
                let head = s.get(..10).unwrap_or(s);
                NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
            }
            Self::Number(n) if (EXCEL_SERIAL_MIN..EXCEL_SERIAL_MAX).contains(n) => {
                date_from_excel_serial(*n)
            }
            _ => None,
        }
    }
}

/// Calendar day of an Excel 1900-system serial; the time part is dropped.
pub fn date_from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(chrono::Days::new(serial.floor() as u64))
}

/// One data row of a sales sheet.
#[derive(Debug, Clone)]
pub struct SalesRow {
    /// 1-based row number in the source, for diagnostics.
    pub row: usize,
    pub date: RawCell,
    pub product: RawCell,
    /// One cell per entry of [`SalesSheet::stores`], same order.
    pub quantities: Vec<RawCell>,
}

/// A chain sheet: store names across the header, one row per (date, product).
#[derive(Debug, Clone)]
pub struct SalesSheet {
    pub label: String,
    pub stores: Vec<String>,
    pub rows: Vec<SalesRow>,
}

// ---------------------------------------------------------------------------
// Facts
// ---------------------------------------------------------------------------

/// Identity of a fact. Two observations with equal keys are the same fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactKey {
    pub date: NaiveDate,
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub order_type: OrderType,
}

/// A resolved, pre-aggregation quantity from one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FactObservation {
    pub date: NaiveDate,
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub quantity: u64,
    pub order_type: OrderType,
}

impl FactObservation {
    pub fn key(&self) -> FactKey {
        FactKey {
            date: self.date,
            store_id: self.store_id.clone(),
            product_id: self.product_id.clone(),
            order_type: self.order_type,
        }
    }
}

/// Aggregated fact; serializes to the row shape of the sales table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRecord {
    pub date: NaiveDate,
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub quantity: u64,
    pub order_type: OrderType,
}

impl FactRecord {
    pub fn from_key(key: FactKey, quantity: u64) -> Self {
        Self {
            date: key.date,
            store_id: key.store_id,
            product_id: key.product_id,
            quantity,
            order_type: key.order_type,
        }
    }

    pub fn key(&self) -> FactKey {
        FactKey {
            date: self.date,
            store_id: self.store_id.clone(),
            product_id: self.product_id.clone(),
            order_type: self.order_type,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub table: String,
    pub order_type: OrderType,
    pub dry_run: bool,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub meta: ReconMeta,
    pub report: ReconciliationReport,
}
