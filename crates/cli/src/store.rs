//! `tally login` and store client construction shared by commands.

use tally_store_client::{
    load_credentials, resolve_credentials, save_credentials, StoreClient, StoreCredentials,
    StoreError,
};

use crate::exit_codes::{EXIT_CATALOG, EXIT_ERROR, EXIT_NO_CREDENTIALS};
use crate::CliError;

/// Build a client from flags/env, falling back to the saved credentials file.
pub fn client_from(url: Option<String>, key: Option<String>) -> Result<StoreClient, CliError> {
    let creds = resolve_credentials(url, key, load_credentials()).map_err(|e| match e {
        StoreError::MissingCredentials => CliError::new(EXIT_NO_CREDENTIALS, e.to_string())
            .with_hint("pass --url/--key, set TALLY_STORE_URL/TALLY_STORE_KEY, or run `tally login`"),
        other => CliError::new(EXIT_ERROR, other.to_string()),
    })?;
    StoreClient::new(creds).map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))
}

pub fn cmd_login(url: String, key: String, no_verify: bool) -> Result<(), CliError> {
    let creds = StoreCredentials::new(url.trim(), key.trim());
    if creds.url.is_empty() || creds.key.is_empty() {
        return Err(CliError::new(EXIT_NO_CREDENTIALS, "URL and key must not be empty"));
    }

    if !no_verify {
        let client = StoreClient::new(creds.clone())
            .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
        let chains = client.fetch_chains().map_err(|e| match e {
            StoreError::Http(401, _) | StoreError::Http(403, _) => {
                CliError::new(EXIT_NO_CREDENTIALS, "Store rejected the key")
                    .with_hint("use the service key from the project settings")
            }
            other => CliError::new(EXIT_CATALOG, other.to_string())
                .with_hint("pass --no-verify to save anyway"),
        })?;
        eprintln!("verified: {} retail chains visible", chains.len());
    }

    let path = save_credentials(&creds).map_err(|e| CliError::new(EXIT_ERROR, e))?;
    eprintln!("saved {}", path.display());
    Ok(())
}
