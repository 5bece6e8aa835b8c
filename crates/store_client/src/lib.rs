//! Sales store client, shared by every command that talks to the store.
//!
//! Speaks the PostgREST dialect: paginated reads of the catalog tables and
//! idempotent upserts into the fact table.
//!
//! Blocking, no retries. A failed batch is reported, never resent.

mod auth;
mod client;

pub use auth::{
    credentials_file_path, load_credentials, load_credentials_from, resolve_credentials,
    save_credentials, save_credentials_to, StoreCredentials,
};
pub use client::{StoreClient, StoreError, DEFAULT_PAGE_SIZE};
