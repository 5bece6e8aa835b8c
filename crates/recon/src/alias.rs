use std::collections::{BTreeMap, HashMap};

use crate::error::ReconError;
use crate::normalize::{normalize, slugify};

/// Immutable many-to-one map from raw name variants to a slug.
///
/// Keys are stored normalized, so lookups are case, accent and whitespace
/// insensitive. Slugs are stored in [`slugify`] form.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    /// Build a table, rejecting empty keys and keys whose normalized forms
    /// collide with different slugs. Collisions that agree are merged.
    pub fn build(table: &str, raw: &BTreeMap<String, String>) -> Result<Self, ReconError> {
        let mut entries: HashMap<String, String> = HashMap::with_capacity(raw.len());
        for (key, slug) in raw {
            let normalized = normalize(key);
            if normalized.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "[{table}] alias key '{key}' is blank"
                )));
            }
            let slug = slugify(slug);
            if slug.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "[{table}] alias '{key}' has a blank slug"
                )));
            }
            if let Some(existing) = entries.get(&normalized) {
                if *existing != slug {
                    return Err(ReconError::AliasConflict {
                        table: table.to_string(),
                        key: normalized,
                        slugs: (existing.clone(), slug),
                    });
                }
                continue;
            }
            entries.insert(normalized, slug);
        }
        Ok(Self { entries })
    }

    /// Convenience for tests and programmatic callers.
    pub fn from_pairs(table: &str, pairs: &[(&str, &str)]) -> Result<Self, ReconError> {
        let raw = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::build(table, &raw)
    }

    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.entries.get(&normalize(raw)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
