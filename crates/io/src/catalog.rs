// Local catalog snapshot (JSON)

use std::path::{Path, PathBuf};

use tally_recon::catalog::{Catalog, CatalogSource};
use tally_recon::error::ReconError;

/// A catalog exported to disk, read fresh on every fetch.
#[derive(Debug, Clone)]
pub struct CatalogFile {
    path: PathBuf,
}

impl CatalogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for CatalogFile {
    fn fetch_catalog(&self) -> Result<Catalog, ReconError> {
        load_catalog(&self.path)
    }
}

pub fn load_catalog(path: &Path) -> Result<Catalog, ReconError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ReconError::Catalog(format!("{}: {e}", path.display())))?;
    let catalog = Catalog::from_json(&content).map_err(|e| match e {
        ReconError::Catalog(msg) => ReconError::Catalog(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    log::debug!(
        "{}: {} products, {} chains, {} stores",
        path.display(),
        catalog.products.len(),
        catalog.chains.len(),
        catalog.stores.len()
    );
    Ok(catalog)
}
