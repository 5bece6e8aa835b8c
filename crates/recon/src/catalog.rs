//! Canonical entities as fetched from the remote store.

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{ChainId, ProductId, StoreId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    /// Explicit slug when the catalog carries one; otherwise derived from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogChain {
    pub id: ChainId,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogStore {
    pub id: StoreId,
    pub name: String,
    pub chain_id: ChainId,
}

/// Read-only snapshot of products, chains and stores for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub products: Vec<CatalogProduct>,
    #[serde(default)]
    pub chains: Vec<CatalogChain>,
    #[serde(default)]
    pub stores: Vec<CatalogStore>,
}

impl Catalog {
    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        serde_json::from_str(input).map_err(|e| ReconError::Catalog(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.chains.is_empty() && self.stores.is_empty()
    }
}

/// Collaborator that delivers the catalog at the start of a run.
///
/// A failure here is the one condition that aborts a run: nothing can be
/// resolved without it.
pub trait CatalogSource {
    fn fetch_catalog(&self) -> Result<Catalog, ReconError>;
}

impl CatalogSource for Catalog {
    fn fetch_catalog(&self) -> Result<Catalog, ReconError> {
        Ok(self.clone())
    }
}
