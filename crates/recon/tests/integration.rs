use std::path::PathBuf;

use tally_recon::config::ReconConfig;
use tally_recon::engine::run;
use tally_recon::model::{OrderType, RawCell, SalesRow, SalesSheet};
use tally_recon::resolver::MatchMethod;
use tally_recon::writer::MemoryWriter;
use tally_recon::{Catalog, RunResult};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn config() -> ReconConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join("innslegnar.recon.toml")).unwrap();
    ReconConfig::from_toml(&toml).unwrap()
}

fn catalog() -> Catalog {
    let json = std::fs::read_to_string(fixtures_dir().join("catalog.json")).unwrap();
    Catalog::from_json(&json).unwrap()
}

fn text(s: &str) -> RawCell {
    if s.is_empty() {
        RawCell::Empty
    } else {
        RawCell::Text(s.into())
    }
}

fn sheet(label: &str, stores: &[&str], rows: &[(&str, &str, &[&str])]) -> SalesSheet {
    SalesSheet {
        label: label.into(),
        stores: stores.iter().map(|s| s.to_string()).collect(),
        rows: rows
            .iter()
            .enumerate()
            .map(|(i, (date, product, qty))| SalesRow {
                row: i + 2,
                date: text(date),
                product: text(product),
                quantities: qty.iter().map(|q| text(q)).collect(),
            })
            .collect(),
    }
}

fn run_with_writer(sheets: &[SalesSheet]) -> (RunResult, MemoryWriter) {
    let mut writer = MemoryWriter::default();
    let result = run(&config(), &catalog(), sheets, Some(&mut writer)).unwrap();
    (result, writer)
}

// -------------------------------------------------------------------------
// Aggregation
// -------------------------------------------------------------------------

#[test]
fn duplicate_rows_sum_into_one_fact() {
    let sheets = vec![sheet(
        "Bónus",
        &["Bónus Kringlan"],
        &[
            ("2024-01-05", "Peach", &["3"]),
            ("2024-01-05", "Peach", &["5"]),
            ("2024-01-06", "Peach", &["4"]),
        ],
    )];
    let (result, writer) = run_with_writer(&sheets);

    assert_eq!(result.report.planned(), 2);
    assert_eq!(result.report.written(), 2);
    let records: Vec<_> = writer.batches.iter().flat_map(|b| &b.records).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].date.to_string(), "2024-01-05");
    assert_eq!(records[0].quantity, 8);
    assert_eq!(records[0].store_id.as_str(), "st-bo-kringlan");
    assert_eq!(records[0].product_id.as_str(), "9b1c0f4e-0002");
    assert_eq!(records[0].order_type, OrderType::Retail);
    assert_eq!(records[1].date.to_string(), "2024-01-06");
    assert_eq!(records[1].quantity, 4);
}

#[test]
fn rerun_plans_identical_batches() {
    let sheets = vec![sheet(
        "Krónan ",
        &["Akrabraut", "Grandi"],
        &[
            ("2024-01-05 00:00:00", "Lemon Lime", &["1", "2"]),
            ("2024-01-05", "Jóli", &["", "7"]),
        ],
    )];
    let (_, first) = run_with_writer(&sheets);
    let (_, second) = run_with_writer(&sheets);
    assert_eq!(first.batches, second.batches);
    assert_eq!(first.batches[0].len(), 3);
}

// -------------------------------------------------------------------------
// Resolution
// -------------------------------------------------------------------------

#[test]
fn unresolved_product_never_fails_and_adds_nothing() {
    let sheets = vec![sheet(
        "Bónus",
        &["Bónus Kringlan"],
        &[
            ("2024-01-05", "Banana Bonanza", &["10"]),
            ("2024-01-05", "Kids Mixed Berries", &["10"]),
            ("2024-01-05", "Peach", &["1"]),
        ],
    )];
    let (result, _) = run_with_writer(&sheets);

    assert_eq!(result.report.planned(), 1);
    let unresolved: Vec<String> = result
        .report
        .unresolved_products()
        .iter()
        .map(|p| p.to_string())
        .collect();
    assert_eq!(
        unresolved,
        vec![
            "Banana Bonanza".to_string(),
            "Kids Mixed Berries (slug: krakka-mixed-berry)".to_string(),
        ]
    );
}

#[test]
fn samkaup_sub_brand_headers() {
    let sheets = vec![sheet(
        "Samkaup",
        &["Nettó-Borgarnes", "Kjörbúð-Dalvík", "Nettó-Hvergi", "Hvergi"],
        &[("2024-01-05", "Peach", &["2", "3", "4", "5"])],
    )];
    let (result, writer) = run_with_writer(&sheets);

    // "Nettó-Hvergi" falls through to the prefix scan. Borgarnes and Mjódd both
    // share "netto"; Borgarnes comes first in the catalog.
    assert_eq!(result.report.planned(), 2);
    let borgarnes = writer.batches[0]
        .records
        .iter()
        .find(|r| r.store_id.as_str() == "st-sk-borgarnes")
        .unwrap();
    assert_eq!(borgarnes.quantity, 6);
    assert!(writer.batches[0].records.iter().all(|r| r.store_id.as_str() != "st-sk-mjodd"));
    let methods: Vec<MatchMethod> = result
        .report
        .heuristic_matches()
        .iter()
        .map(|m| m.method)
        .collect();
    assert_eq!(
        methods,
        vec![MatchMethod::SplitSubBrand, MatchMethod::Synonym, MatchMethod::Prefix]
    );

    let unresolved: Vec<_> = result.report.unresolved_stores().iter().collect();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].raw, "Hvergi");

    let summary = &result.report.sheets()[0];
    assert_eq!(summary.matched_stores, 3);
    assert_eq!(summary.unmatched_stores, 1);
}

#[test]
fn unknown_sheet_is_reported_not_fatal() {
    let sheets = vec![
        sheet("Hagkaup", &["Skeifan"], &[("2024-01-05", "Peach", &["2"])]),
        sheet("Bónus", &["Bónus Skeifan"], &[("2024-01-05", "Peach", &["2"])]),
    ];
    let (result, _) = run_with_writer(&sheets);
    assert_eq!(result.report.planned(), 1);
    assert_eq!(result.report.unmapped_sheets().len(), 1);
    assert!(result.report.has_unresolved());
}

// -------------------------------------------------------------------------
// Report
// -------------------------------------------------------------------------

#[test]
fn run_result_serializes() {
    let sheets = vec![sheet(
        "Bónus",
        &["Bónus Kringlan"],
        &[("2024-01-05", "Peach", &["-3"]), ("2024-01-06", "Samtals", &["99"])],
    )];
    let result = run(&config(), &catalog(), &sheets, None).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["meta"]["config_name"], "Innslegnar");
    assert_eq!(json["meta"]["table"], "daily_sales");
    assert_eq!(json["meta"]["dry_run"], true);
    assert_eq!(json["report"]["planned"], 0);
    assert_eq!(json["report"]["dropped_quantities"], 1);
    assert_eq!(json["report"]["skipped_rows"], 0);
}
