//! `tally-recon`: sales fact reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded sheets and a catalog, resolves
//! free-text names to canonical ids, aggregates quantities per fact key and
//! plans idempotent upsert batches. No CLI, file or network dependencies.

pub mod aggregate;
pub mod alias;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod planner;
pub mod report;
pub mod resolver;
pub mod writer;

pub use catalog::{Catalog, CatalogSource};
pub use config::ReconConfig;
pub use engine::run;
pub use error::ReconError;
pub use model::{FactRecord, RawCell, RunResult, SalesRow, SalesSheet};
pub use report::ReconciliationReport;
pub use resolver::EntityResolver;
pub use writer::{FactWriter, WriteFailure};
