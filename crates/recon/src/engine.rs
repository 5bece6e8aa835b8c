use crate::aggregate::{parse_quantity, FactAggregator};
use crate::catalog::CatalogSource;
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::model::{ChainId, FactObservation, FactRecord, ReconMeta, RunResult, SalesSheet, StoreId};
use crate::planner::{plan, UpsertPlan};
use crate::report::{
    BatchFailure, HeuristicMatch, ReconciliationReport, SheetSummary, UnresolvedStore,
};
use crate::resolver::EntityResolver;
use crate::writer::FactWriter;

/// Run one reconciliation: fetch the catalog, resolve and aggregate every
/// sheet, plan batches and, unless `writer` is `None` (dry run), write them.
///
/// Only a config or catalog failure returns `Err`. Everything else ends up
/// in the report.
pub fn run(
    config: &ReconConfig,
    catalog: &dyn CatalogSource,
    sheets: &[SalesSheet],
    writer: Option<&mut dyn FactWriter>,
) -> Result<RunResult, ReconError> {
    let tables = config.resolver_config()?;
    let catalog = catalog.fetch_catalog()?;
    log::info!(
        "catalog: {} products, {} chains, {} stores",
        catalog.products.len(),
        catalog.chains.len(),
        catalog.stores.len()
    );
    let resolver = EntityResolver::new(tables, &catalog);

    let mut report = ReconciliationReport::new();
    let records = reconcile(config, &resolver, sheets, &mut report);
    let upserts = plan(records, config.batch_size);
    report.record_planned(upserts.total_records, upserts.batches.len());

    let dry_run = writer.is_none();
    match writer {
        Some(writer) => write_plan(&upserts, &config.table, writer, &mut report),
        None => log::info!(
            "dry run: {} records in {} batches not written",
            upserts.total_records,
            upserts.batches.len()
        ),
    }

    Ok(RunResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            table: config.table.clone(),
            order_type: config.order_type,
            dry_run,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        report,
    })
}

/// Resolve and aggregate all sheets into one set of facts.
///
/// Sheets share a single aggregator, so the same store/product/day seen on
/// two sheets is summed too.
pub fn reconcile(
    config: &ReconConfig,
    resolver: &EntityResolver,
    sheets: &[SalesSheet],
    report: &mut ReconciliationReport,
) -> Vec<FactRecord> {
    let mut aggregator = FactAggregator::new();
    for sheet in sheets {
        reconcile_sheet(config, resolver, sheet, &mut aggregator, report);
    }
    aggregator.finalize()
}

fn reconcile_sheet(
    config: &ReconConfig,
    resolver: &EntityResolver,
    sheet: &SalesSheet,
    aggregator: &mut FactAggregator,
    report: &mut ReconciliationReport,
) {
    let mut summary = SheetSummary {
        label: sheet.label.clone(),
        rows: sheet.rows.len(),
        ..SheetSummary::default()
    };

    let chain = match resolver.resolve_chain(&sheet.label) {
        Ok(chain) => chain.clone(),
        Err(unmapped) => {
            log::warn!("sheet '{}': no chain mapping, skipped", unmapped);
            report.record_unmapped_sheet(unmapped);
            report.record_sheet(summary);
            return;
        }
    };
    summary.chain = Some(chain.to_string());

    let columns = resolve_columns(resolver, &chain, sheet, &mut summary, report);

    for row in &sheet.rows {
        if row.date.is_blank() && row.product.is_blank() && row.quantities.iter().all(|c| c.is_blank()) {
            continue;
        }

        let product_text = row.product.to_text();
        if !row.product.is_blank() && config.is_skipped_product(&product_text) {
            continue;
        }

        let Some(date) = row.date.as_date() else {
            log::debug!("sheet '{}' row {}: no usable date", sheet.label, row.row);
            report.record_skipped_row();
            continue;
        };
        if !config.in_date_window(date) {
            report.record_row_outside_window();
            continue;
        }
        if row.product.is_blank() {
            log::debug!("sheet '{}' row {}: no product", sheet.label, row.row);
            report.record_skipped_row();
            continue;
        }

        let product_id = match resolver.resolve_product(&product_text) {
            Ok(id) => id.clone(),
            Err(unresolved) => {
                log::debug!("sheet '{}' row {}: unknown product {}", sheet.label, row.row, unresolved);
                report.record_unresolved_product(unresolved);
                continue;
            }
        };

        for (cell, store) in row.quantities.iter().zip(&columns) {
            let Some(store_id) = store else {
                continue;
            };
            let added = parse_quantity(cell).and_then(|quantity| {
                aggregator.add(FactObservation {
                    date,
                    store_id: store_id.clone(),
                    product_id: product_id.clone(),
                    quantity,
                    order_type: config.order_type,
                })
            });
            match added {
                Ok(()) => summary.observations += 1,
                Err(rejection) if rejection.is_malformed() => {
                    log::debug!(
                        "sheet '{}' row {}: dropped quantity ({})",
                        sheet.label,
                        row.row,
                        rejection
                    );
                    report.record_dropped_quantity();
                }
                Err(_) => {}
            }
        }
    }

    log::info!(
        "sheet '{}': {} stores matched, {} unmatched, {} observations",
        summary.label,
        summary.matched_stores,
        summary.unmatched_stores,
        summary.observations
    );
    report.record_sheet(summary);
}

/// One entry per store column; `None` for columns that will be skipped.
fn resolve_columns(
    resolver: &EntityResolver,
    chain: &ChainId,
    sheet: &SalesSheet,
    summary: &mut SheetSummary,
    report: &mut ReconciliationReport,
) -> Vec<Option<StoreId>> {
    sheet
        .stores
        .iter()
        .map(|raw| {
            if raw.trim().is_empty() {
                return None;
            }
            match resolver.resolve_store(chain, raw) {
                Some(m) => {
                    summary.matched_stores += 1;
                    if m.method.is_heuristic() {
                        log::info!(
                            "sheet '{}': store '{}' matched '{}' by {}",
                            sheet.label,
                            raw.trim(),
                            m.matched_name,
                            m.method
                        );
                        report.record_heuristic_match(HeuristicMatch {
                            sheet: sheet.label.clone(),
                            raw: raw.trim().to_string(),
                            store_id: m.store_id.clone(),
                            matched_name: m.matched_name,
                            method: m.method,
                        });
                    }
                    Some(m.store_id)
                }
                None => {
                    summary.unmatched_stores += 1;
                    log::warn!("sheet '{}': store '{}' not found, column skipped", sheet.label, raw.trim());
                    report.record_unresolved_store(UnresolvedStore {
                        sheet: sheet.label.clone(),
                        raw: raw.trim().to_string(),
                    });
                    None
                }
            }
        })
        .collect()
}

/// Send every batch in order. A refused batch is recorded and the rest
/// still go out.
pub fn write_plan(
    upserts: &UpsertPlan,
    table: &str,
    writer: &mut dyn FactWriter,
    report: &mut ReconciliationReport,
) {
    for batch in &upserts.batches {
        match writer.write_batch(table, batch) {
            Ok(()) => {
                log::info!("batch {}: {} records written", batch.index, batch.len());
                report.record_written(batch.len());
            }
            Err(failure) => {
                log::error!("batch {}: {} records failed: {}", batch.index, batch.len(), failure);
                report.record_batch_failure(BatchFailure {
                    batch: batch.index,
                    records: batch.len(),
                    status: failure.status,
                    message: failure.message,
                });
            }
        }
    }
}
