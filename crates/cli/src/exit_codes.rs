//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scheduled imports branch on these; do not renumber.
//!
//! # Exit Codes
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | CLI usage error (bad args)                           |
//! | 3    | Run config missing, unparseable or invalid           |
//! | 4    | Catalog could not be loaded; nothing was resolved    |
//! | 5    | Sales input could not be read                        |
//! | 6    | One or more upsert batches failed                    |
//! | 7    | Unresolved names present and `--strict` was given    |
//! | 8    | Store URL or key missing                             |
//!
//! When a run has both failed batches and unresolved names under
//! `--strict`, the write failure wins (6).
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use tally_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Run (3-8)
// =============================================================================

/// Config file unreadable, bad TOML, or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Catalog fetch failed (store unreachable, auth rejected, bad catalog file).
pub const EXIT_CATALOG: u8 = 4;

/// Workbook or delimited input could not be opened or parsed.
pub const EXIT_INPUT: u8 = 5;

/// At least one batch was refused by the store. Other batches may have landed.
pub const EXIT_WRITE_FAILED: u8 = 6;

/// `--strict` run that left product, store or sheet names unresolved.
pub const EXIT_UNRESOLVED: u8 = 7;

/// No store URL/key from flags, environment or the saved credentials file.
pub const EXIT_NO_CREDENTIALS: u8 = 8;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_)
        | ReconError::ConfigValidation(_)
        | ReconError::AliasConflict { .. } => EXIT_INVALID_CONFIG,
        ReconError::Catalog(_) => EXIT_CATALOG,
    }
}
