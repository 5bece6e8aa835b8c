//! Store credential storage.
//!
//! Reads/writes ~/.config/tally/store.json (0600 on Unix). Explicit values
//! (flags or environment) always win over the saved file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::client::StoreError;

/// Base URL and service key of the sales store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCredentials {
    /// Project URL, e.g. "https://abcd.supabase.co"; `/rest/v1` is appended.
    pub url: String,
    /// Sent as both the `apikey` header and the bearer token.
    pub key: String,
}

impl StoreCredentials {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
        }
    }
}

/// Returns the path to the credentials file.
pub fn credentials_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("tally/store.json"))
}

/// Load saved credentials. None if nothing is saved or the file is invalid.
pub fn load_credentials() -> Option<StoreCredentials> {
    load_credentials_from(&credentials_file_path()?)
}

pub fn load_credentials_from(path: &Path) -> Option<StoreCredentials> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Save credentials, creating the config directory if needed.
pub fn save_credentials(creds: &StoreCredentials) -> Result<PathBuf, String> {
    let path = credentials_file_path().ok_or("Could not determine config directory")?;
    save_credentials_to(&path, creds)?;
    Ok(path)
}

pub fn save_credentials_to(path: &Path, creds: &StoreCredentials) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }

    let contents = serde_json::to_string_pretty(creds)
        .map_err(|e| format!("Failed to serialize credentials: {}", e))?;

    std::fs::write(path, &contents)
        .map_err(|e| format!("Failed to write credentials file: {}", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)
            .map_err(|e| format!("Failed to set file permissions: {}", e))?;
    }

    Ok(())
}

/// Combine explicit values with the saved file, field by field.
pub fn resolve_credentials(
    url: Option<String>,
    key: Option<String>,
    saved: Option<StoreCredentials>,
) -> Result<StoreCredentials, StoreError> {
    let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
    let (saved_url, saved_key) = match saved {
        Some(c) => (Some(c.url), Some(c.key)),
        None => (None, None),
    };

    let url = non_empty(url).or(non_empty(saved_url));
    let key = non_empty(key).or(non_empty(saved_key));
    match (url, key) {
        (Some(url), Some(key)) => Ok(StoreCredentials { url, key }),
        _ => Err(StoreError::MissingCredentials),
    }
}
