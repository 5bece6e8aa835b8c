//! `tally run`, `tally validate`, `tally resolve`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Args;

use tally_io::catalog::{load_catalog, CatalogFile};
use tally_recon::catalog::CatalogSource;
use tally_recon::writer::FactWriter;
use tally_recon::{EntityResolver, ReconConfig, ReconciliationReport, RunResult};

use crate::exit_codes::{
    recon_exit_code, EXIT_ERROR, EXIT_INPUT, EXIT_INVALID_CONFIG, EXIT_UNRESOLVED, EXIT_USAGE,
    EXIT_WRITE_FAILED,
};
use crate::store::client_from;
use crate::CliError;

#[derive(Args)]
pub struct RunArgs {
    /// Path to the run config (.toml)
    pub config: PathBuf,

    /// Sales workbook (.xlsx/.xls/.ods) or delimited export (.csv/.tsv/.txt)
    pub input: PathBuf,

    /// Sheet label for a delimited input; for a workbook, read only this sheet
    #[arg(long)]
    pub sheet_label: Option<String>,

    /// Read the catalog from a JSON snapshot instead of the store
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Store project URL
    #[arg(long, env = "TALLY_STORE_URL")]
    pub url: Option<String>,

    /// Store service key
    #[arg(long, env = "TALLY_STORE_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Plan batches without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output JSON to stdout instead of human summary
    #[arg(long)]
    pub json: bool,

    /// Write JSON output to file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Exit 7 when any product, store or sheet name stayed unresolved
    #[arg(long)]
    pub strict: bool,

    /// Override the config's batch size
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Import only sales on or after this day (YYYY-MM-DD); overrides date_from
    #[arg(long, value_name = "DATE")]
    pub from: Option<NaiveDate>,

    /// Import only sales on or before this day (YYYY-MM-DD); overrides date_to
    #[arg(long, value_name = "DATE")]
    pub to: Option<NaiveDate>,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Path to the run config (.toml)
    pub config: PathBuf,

    /// Catalog snapshot (.json)
    #[arg(long)]
    pub catalog: PathBuf,

    /// Treat names as store headers on this sheet
    #[arg(long)]
    pub chain: Option<String>,

    /// Output JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Names to resolve
    #[arg(required = true)]
    pub names: Vec<String>,
}

fn load_config(path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_INVALID_CONFIG, format!("cannot read config {}: {e}", path.display()))
    })?;
    ReconConfig::from_toml(&config_str).map_err(|e| CliError::new(EXIT_INVALID_CONFIG, e.to_string()))
}

// ── run ─────────────────────────────────────────────────────────────

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let mut config = load_config(&args.config)?;
    if let Some(size) = args.batch_size {
        if size == 0 {
            return Err(CliError::new(EXIT_USAGE, "--batch-size must be at least 1"));
        }
        config.batch_size = size;
    }
    if args.from.is_some() {
        config.date_from = args.from;
    }
    if args.to.is_some() {
        config.date_to = args.to;
    }
    if let (Some(from), Some(to)) = (config.date_from, config.date_to) {
        if from > to {
            return Err(CliError::new(
                EXIT_USAGE,
                format!("date window is empty: {from} is after {to}"),
            ));
        }
    }

    let sheets = tally_io::read_sales(&args.input, args.sheet_label.as_deref(), &config.layout)
        .map_err(|e| CliError::new(EXIT_INPUT, e))?;
    log::info!(
        "{}: {} sheets",
        args.input.display(),
        sheets.len()
    );

    // The store is needed unless both reads and writes are local.
    let store = if args.catalog.is_none() || !args.dry_run {
        Some(client_from(args.url, args.key).map_err(|e| {
            if args.catalog.is_some() {
                e.with_hint("pass --dry-run to plan against the catalog file without writing")
            } else {
                e
            }
        })?)
    } else {
        None
    };

    let catalog_file = args.catalog.as_ref().map(CatalogFile::new);
    let catalog: &dyn CatalogSource = match (&catalog_file, &store) {
        (Some(file), _) => file,
        (None, Some(client)) => client,
        (None, None) => return Err(CliError::new(EXIT_ERROR, "no catalog source")),
    };

    let mut writer = if args.dry_run { None } else { store.clone() };
    let result = tally_recon::run(
        &config,
        catalog,
        &sheets,
        writer.as_mut().map(|w| w as &mut dyn FactWriter),
    )
    .map_err(|e| CliError::new(recon_exit_code(&e), e.to_string()))?;

    // Output
    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    print_summary(&result);
    run_exit(&result.report, args.strict)
}

fn run_exit(report: &ReconciliationReport, strict: bool) -> Result<(), CliError> {
    if report.has_write_failures() {
        let failed: usize = report.failed_batches().iter().map(|b| b.records).sum();
        return Err(CliError::new(
            EXIT_WRITE_FAILED,
            format!(
                "{} of {} batches failed ({failed} records not written)",
                report.failed_batches().len(),
                report.batches()
            ),
        )
        .with_hint("re-run the same input; upserts make it safe"));
    }
    if strict && report.has_unresolved() {
        return Err(CliError::new(EXIT_UNRESOLVED, "unresolved names (--strict)")
            .with_hint("add aliases to [products]/[sheets] or check the catalog"));
    }
    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &RunResult) {
    let r = &result.report;
    if result.meta.dry_run {
        eprintln!(
            "{}: dry run, {} facts planned in {} batches, nothing written",
            result.meta.config_name,
            r.planned(),
            r.batches()
        );
    } else {
        eprintln!(
            "{}: {} facts planned in {} batches, {} written to {}",
            result.meta.config_name,
            r.planned(),
            r.batches(),
            r.written(),
            result.meta.table
        );
    }

    for sheet in r.sheets() {
        match &sheet.chain {
            Some(_) => eprintln!(
                "  sheet '{}': {}/{} stores matched, {} quantities",
                sheet.label,
                sheet.matched_stores,
                sheet.matched_stores + sheet.unmatched_stores,
                sheet.observations
            ),
            None => eprintln!("  sheet '{}': no chain mapping, skipped", sheet.label),
        }
    }

    if !r.unresolved_products().is_empty() {
        let names: Vec<String> = r.unresolved_products().iter().map(|p| p.to_string()).collect();
        eprintln!("  unresolved products ({}): {}", names.len(), names.join(", "));
    }
    if !r.unresolved_stores().is_empty() {
        let names: Vec<String> = r.unresolved_stores().iter().map(|s| s.to_string()).collect();
        eprintln!("  unresolved stores ({}): {}", names.len(), names.join(", "));
    }
    if !r.heuristic_matches().is_empty() {
        eprintln!("  heuristic store matches: {}", r.heuristic_matches().len());
    }
    if r.rows_outside_window() > 0 {
        eprintln!("  rows outside date window: {}", r.rows_outside_window());
    }
    if r.dropped_quantities() > 0 || r.skipped_rows() > 0 {
        eprintln!(
            "  dropped quantities: {}, skipped rows: {}",
            r.dropped_quantities(),
            r.skipped_rows()
        );
    }
    for failure in r.failed_batches() {
        let status = failure
            .status
            .map(|s| format!("HTTP {s}: "))
            .unwrap_or_default();
        eprintln!(
            "  batch {} ({} records) failed: {status}{}",
            failure.batch, failure.records, failure.message
        );
    }
}

// ── validate ────────────────────────────────────────────────────────

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "{}: valid ({} product aliases, {} sheet aliases, order type {}, batch size {})",
        config.name,
        config.products.len(),
        config.sheets.len(),
        config.order_type,
        config.batch_size
    );
    Ok(())
}

// ── resolve ─────────────────────────────────────────────────────────

pub fn cmd_resolve(args: ResolveArgs) -> Result<(), CliError> {
    let config = load_config(&args.config)?;
    let tables = config
        .resolver_config()
        .map_err(|e| CliError::new(EXIT_INVALID_CONFIG, e.to_string()))?;
    let catalog =
        load_catalog(&args.catalog).map_err(|e| CliError::new(recon_exit_code(&e), e.to_string()))?;
    let resolver = EntityResolver::new(tables, &catalog);

    let rows: Vec<serde_json::Value> = match args.chain.as_deref() {
        None => args
            .names
            .iter()
            .map(|name| match resolver.resolve_product(name) {
                Ok(id) => serde_json::json!({ "name": name, "product_id": id }),
                Err(miss) => serde_json::json!({ "name": name, "unresolved": miss }),
            })
            .collect(),
        Some(sheet) => {
            let chain = resolver.resolve_chain(sheet).map_err(|miss| {
                CliError::new(EXIT_UNRESOLVED, format!("sheet '{miss}' has no chain mapping"))
            })?;
            args.names
                .iter()
                .map(|name| match resolver.resolve_store(chain, name) {
                    Some(m) => serde_json::json!({
                        "name": name,
                        "store_id": m.store_id,
                        "matched_name": m.matched_name,
                        "method": m.method,
                    }),
                    None => serde_json::json!({ "name": name, "unresolved": true }),
                })
                .collect()
        }
    };

    if args.json {
        let out = serde_json::to_string_pretty(&rows)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    for row in &rows {
        let name = row["name"].as_str().unwrap_or_default();
        if let Some(id) = row["product_id"].as_str() {
            println!("{name}\t{id}");
        } else if let Some(id) = row["store_id"].as_str() {
            println!(
                "{name}\t{id}\t{}\t{}",
                row["method"].as_str().unwrap_or_default(),
                row["matched_name"].as_str().unwrap_or_default()
            );
        } else {
            println!("{name}\tunresolved");
        }
    }
    Ok(())
}
