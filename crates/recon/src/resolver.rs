//! Free-text name -> catalog id resolution.
//!
//! Products and chains resolve through alias tables only. Stores go through
//! an ordered fallback chain; the first step that finds a store wins:
//!
//! 1. exact `(chain, normalized name)` lookup
//! 2. split "SubBrand-Location" headers and retry as "subbrand location",
//!    then "location", then with configured sub-brand synonyms
//! 3. shared-prefix scan over the chain's stores in catalog order
//!
//! Step 3 has no scoring. Two stores sharing a prefix can be confused; such
//! matches are tagged [`MatchMethod::Prefix`] so the report can surface them.

use std::collections::HashMap;

use serde::Serialize;

use crate::alias::AliasTable;
use crate::catalog::Catalog;
use crate::config::{ResolverConfig, StoreMatching};
use crate::model::{ChainId, ProductId, StoreId};
use crate::normalize::{normalize, slugify};
use crate::report::{UnresolvedChain, UnresolvedProduct};

/// How a store header was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    /// "Nettó-Borgarnes" found as "nettó borgarnes".
    SplitSubBrand,
    /// "Nettó-Borgarnes" found as "borgarnes".
    SplitLocation,
    /// Sub-brand rewritten through a configured synonym.
    Synonym,
    /// First store in the chain sharing a leading substring.
    Prefix,
}

impl MatchMethod {
    pub fn is_heuristic(&self) -> bool {
        !matches!(self, Self::Exact)
    }
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::SplitSubBrand => write!(f, "split_sub_brand"),
            Self::SplitLocation => write!(f, "split_location"),
            Self::Synonym => write!(f, "synonym"),
            Self::Prefix => write!(f, "prefix"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreMatch {
    pub store_id: StoreId,
    /// Normalized catalog name of the matched store.
    pub matched_name: String,
    pub method: MatchMethod,
}

/// Composite lookup key. Kept as two fields so that e.g. chain "ab" +
/// store "c" can never collide with chain "a" + store "bc".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StoreKey {
    chain: ChainId,
    name: String,
}

#[derive(Debug, Clone)]
struct Synonym {
    prefix: String,
    replacement: String,
}

pub struct EntityResolver {
    products: AliasTable,
    sheets: AliasTable,
    separator: String,
    prefix_min_len: usize,
    synonyms: Vec<Synonym>,
    product_ids: HashMap<String, ProductId>,
    chain_ids: HashMap<String, ChainId>,
    stores: HashMap<StoreKey, StoreId>,
    /// Per chain, in catalog order, for the prefix scan.
    stores_by_chain: HashMap<ChainId, Vec<(String, StoreId)>>,
}

impl EntityResolver {
    /// Build all lookup maps once. The catalog is only read.
    pub fn new(tables: ResolverConfig, catalog: &Catalog) -> Self {
        let mut product_ids: HashMap<String, ProductId> = HashMap::new();
        for product in &catalog.products {
            if let Some(slug) = product.slug.as_deref().map(slugify) {
                if !slug.is_empty() {
                    product_ids.entry(slug).or_insert_with(|| product.id.clone());
                }
            }
            let derived = slugify(&product.name);
            if !derived.is_empty() {
                product_ids.entry(derived).or_insert_with(|| product.id.clone());
            }
        }

        let chain_ids: HashMap<String, ChainId> = catalog
            .chains
            .iter()
            .map(|c| (slugify(&c.slug), c.id.clone()))
            .collect();

        let mut stores: HashMap<StoreKey, StoreId> = HashMap::new();
        let mut stores_by_chain: HashMap<ChainId, Vec<(String, StoreId)>> = HashMap::new();
        for store in &catalog.stores {
            let name = normalize(&store.name);
            if name.is_empty() {
                continue;
            }
            let key = StoreKey {
                chain: store.chain_id.clone(),
                name: name.clone(),
            };
            if stores.contains_key(&key) {
                log::debug!(
                    "catalog: duplicate store name '{}' in chain {}, keeping first",
                    store.name,
                    store.chain_id
                );
                continue;
            }
            stores.insert(key, store.id.clone());
            stores_by_chain
                .entry(store.chain_id.clone())
                .or_default()
                .push((name, store.id.clone()));
        }

        let StoreMatching {
            separator,
            prefix_min_len,
            synonyms,
        } = tables.stores;

        Self {
            products: tables.products,
            sheets: tables.sheets,
            separator,
            prefix_min_len: prefix_min_len.max(1),
            synonyms: synonyms
                .into_iter()
                .map(|s| Synonym {
                    prefix: normalize(&s.prefix),
                    replacement: s.replacement,
                })
                .collect(),
            product_ids,
            chain_ids,
            stores,
            stores_by_chain,
        }
    }

    // ── Products ────────────────────────────────────────────────────

    pub fn resolve_product(&self, raw: &str) -> Result<&ProductId, UnresolvedProduct> {
        let slug = self.products.lookup(raw).ok_or_else(|| UnresolvedProduct {
            raw: raw.trim().to_string(),
            slug: None,
        })?;
        self.product_ids.get(slug).ok_or_else(|| UnresolvedProduct {
            raw: raw.trim().to_string(),
            slug: Some(slug.to_string()),
        })
    }

    // ── Chains ──────────────────────────────────────────────────────

    pub fn resolve_chain(&self, sheet_label: &str) -> Result<&ChainId, UnresolvedChain> {
        let slug = self.sheets.lookup(sheet_label).ok_or_else(|| UnresolvedChain {
            label: sheet_label.trim().to_string(),
            slug: None,
        })?;
        self.chain_ids.get(slug).ok_or_else(|| UnresolvedChain {
            label: sheet_label.trim().to_string(),
            slug: Some(slug.to_string()),
        })
    }

    // ── Stores ──────────────────────────────────────────────────────

    pub fn resolve_store(&self, chain: &ChainId, raw: &str) -> Option<StoreMatch> {
        let name = normalize(raw);
        if name.is_empty() {
            return None;
        }

        if let Some(m) = self.lookup_store(chain, &name, MatchMethod::Exact) {
            return Some(m);
        }

        if let Some(m) = self.resolve_split(chain, raw) {
            return Some(m);
        }

        self.resolve_prefix(chain, &name)
    }

    fn lookup_store(&self, chain: &ChainId, name: &str, method: MatchMethod) -> Option<StoreMatch> {
        let key = StoreKey {
            chain: chain.clone(),
            name: name.to_string(),
        };
        self.stores.get(&key).map(|id| StoreMatch {
            store_id: id.clone(),
            matched_name: key.name,
            method,
        })
    }

    fn resolve_split(&self, chain: &ChainId, raw: &str) -> Option<StoreMatch> {
        let (sub_brand, location) = raw.split_once(self.separator.as_str())?;
        let sub_brand = normalize(sub_brand);
        let location = normalize(location);
        if sub_brand.is_empty() || location.is_empty() {
            return None;
        }

        let joined = format!("{sub_brand} {location}");
        if let Some(m) = self.lookup_store(chain, &joined, MatchMethod::SplitSubBrand) {
            return Some(m);
        }

        if let Some(m) = self.lookup_store(chain, &location, MatchMethod::SplitLocation) {
            return Some(m);
        }

        self.synonyms
            .iter()
            .filter(|s| sub_brand.starts_with(&s.prefix))
            .find_map(|s| {
                let candidate = normalize(&format!("{} {location}", s.replacement));
                self.lookup_store(chain, &candidate, MatchMethod::Synonym)
            })
    }

    fn resolve_prefix(&self, chain: &ChainId, name: &str) -> Option<StoreMatch> {
        let candidates = self.stores_by_chain.get(chain)?;
        let name_len = name.chars().count();
        candidates.iter().find_map(|(store_name, id)| {
            let need = self
                .prefix_min_len
                .min(name_len)
                .min(store_name.chars().count());
            (common_prefix_len(name, store_name) >= need).then(|| StoreMatch {
                store_id: id.clone(),
                matched_name: store_name.clone(),
                method: MatchMethod::Prefix,
            })
        })
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}
