use std::fmt;

/// Fatal errors. Everything else a run encounters lands in the report.
#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty alias table, conflicting aliases, etc.).
    ConfigValidation(String),
    /// Two alias keys normalize to the same text but point at different slugs.
    AliasConflict { table: String, key: String, slugs: (String, String) },
    /// The catalog collaborator could not deliver products, chains or stores.
    Catalog(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::AliasConflict { table, key, slugs } => write!(
                f,
                "[{table}] alias '{key}' maps to both '{}' and '{}'",
                slugs.0, slugs.1
            ),
            Self::Catalog(msg) => write!(f, "catalog unavailable: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
