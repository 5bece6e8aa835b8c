//! PostgREST HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required).

use std::time::Duration;

use serde::de::DeserializeOwned;

use tally_recon::catalog::{Catalog, CatalogChain, CatalogProduct, CatalogSource, CatalogStore};
use tally_recon::error::ReconError;
use tally_recon::planner::UpsertBatch;
use tally_recon::writer::{FactWriter, WriteFailure};

use crate::auth::StoreCredentials;

/// Rows requested per catalog page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Longest response body kept in a write failure.
const MAX_ERROR_BODY: usize = 200;

const PRODUCTS_TABLE: &str = "products";
const CHAINS_TABLE: &str = "retail_chains";
const STORES_TABLE: &str = "stores";

/// Error type for store operations.
#[derive(Debug)]
pub enum StoreError {
    /// No URL or key from flags, environment or the saved file
    MissingCredentials,
    /// Network error
    Network(String),
    /// HTTP error with status code and (truncated) body
    Http(u16, String),
    /// JSON parsing error
    Parse(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::MissingCredentials => write!(f, "Store URL and key are not configured"),
            StoreError::Network(msg) => write!(f, "Network error: {}", msg),
            StoreError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            StoreError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for WriteFailure {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Http(status, body) => WriteFailure::new(Some(status), body),
            other => WriteFailure::new(None, other.to_string()),
        }
    }
}

/// Sales store client (blocking).
#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::blocking::Client,
    rest_base: String,
    key: String,
    page_size: usize,
}

impl StoreClient {
    pub fn new(creds: StoreCredentials) -> Result<Self, StoreError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("tally/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| StoreError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            rest_base: format!("{}/rest/v1", creds.url.trim_end_matches('/')),
            key: creds.key,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    // ── Catalog ─────────────────────────────────────────────────────

    pub fn fetch_products(&self) -> Result<Vec<CatalogProduct>, StoreError> {
        self.fetch_all(PRODUCTS_TABLE, "id,name")
    }

    pub fn fetch_chains(&self) -> Result<Vec<CatalogChain>, StoreError> {
        self.fetch_all(CHAINS_TABLE, "id,slug")
    }

    pub fn fetch_stores(&self) -> Result<Vec<CatalogStore>, StoreError> {
        self.fetch_all(STORES_TABLE, "id,name,chain_id")
    }

    /// Read a whole table, one `limit`/`offset` page at a time.
    ///
    /// The server may cap a page below `limit` (`db-max-rows`), so a short
    /// page is not the end. Paging stops once the `Content-Range` total is
    /// reached, or at the first empty page when no total is sent.
    fn fetch_all<T: DeserializeOwned>(&self, table: &str, select: &str) -> Result<Vec<T>, StoreError> {
        let url = format!("{}/{}", self.rest_base, table);
        let limit = self.page_size.to_string();
        let mut rows: Vec<T> = Vec::new();
        let mut offset = 0usize;

        loop {
            let offset_str = offset.to_string();
            let response = self.send(
                self.http
                    .get(&url)
                    .header("Prefer", "count=exact")
                    .query(&[
                        ("select", select),
                        ("limit", limit.as_str()),
                        ("offset", offset_str.as_str()),
                    ]),
            )?;
            let total = content_range_total(response.headers());
            let page: Vec<T> = response
                .json()
                .map_err(|e| StoreError::Parse(format!("{table}: {e}")))?;
            let count = page.len();
            rows.extend(page);
            log::debug!("{table}: fetched {count} rows at offset {offset}");
            offset += count;

            if count == 0 || total.is_some_and(|total| offset >= total) {
                break;
            }
        }

        Ok(rows)
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Upsert one batch. Rows with an existing conflict key are overwritten.
    pub fn upsert(&self, table: &str, batch: &UpsertBatch) -> Result<(), StoreError> {
        let url = format!("{}/{}", self.rest_base, table);
        let conflict = batch.conflict_key_param();
        self.send(
            self.http
                .post(&url)
                .query(&[("on_conflict", conflict.as_str())])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(&batch.records),
        )?;
        Ok(())
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<reqwest::blocking::Response, StoreError> {
        let response = request
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .send()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Http(status, truncate(&body, MAX_ERROR_BODY)));
        }

        Ok(response)
    }
}

/// Row total from a PostgREST `Content-Range` header ("0-999/2400", "*/0").
fn content_range_total(headers: &reqwest::header::HeaderMap) -> Option<usize> {
    let value = headers.get(reqwest::header::CONTENT_RANGE)?.to_str().ok()?;
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

impl CatalogSource for StoreClient {
    fn fetch_catalog(&self) -> Result<Catalog, ReconError> {
        let wrap = |e: StoreError| ReconError::Catalog(e.to_string());
        Ok(Catalog {
            products: self.fetch_products().map_err(wrap)?,
            chains: self.fetch_chains().map_err(wrap)?,
            stores: self.fetch_stores().map_err(wrap)?,
        })
    }
}

impl FactWriter for StoreClient {
    fn write_batch(&mut self, table: &str, batch: &UpsertBatch) -> Result<(), WriteFailure> {
        self.upsert(table, batch).map_err(WriteFailure::from)
    }
}
