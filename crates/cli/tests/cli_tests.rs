// End-to-end tests driving the built `tally` binary.
// Run with: cargo test -p tally-cli --test cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use httpmock::prelude::*;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use serde_json::json;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Binary with no store credentials reachable from the environment.
fn tally(config_home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tally"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_remove("TALLY_STORE_URL")
        .env_remove("TALLY_STORE_KEY")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", config_home.path())
        .env("HOME", config_home.path());
    cmd
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn stdout_json(out: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&out.stdout);
    serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be JSON: {e}\n{stdout}"))
}

fn dry_run(home: &tempfile::TempDir, extra: &[&str]) -> Output {
    tally(home)
        .arg("run")
        .arg(fixture("innslegnar.toml"))
        .arg(fixture("kronan.csv"))
        .args(["--sheet-label", "Krónan", "--dry-run", "--catalog"])
        .arg(fixture("catalog.json"))
        .args(extra)
        .output()
        .unwrap()
}

// ===========================================================================
// validate
// ===========================================================================

#[test]
fn validate_accepts_good_config() {
    let home = tempfile::tempdir().unwrap();
    let out = tally(&home)
        .arg("validate")
        .arg(fixture("innslegnar.toml"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    assert!(stderr(&out).contains("innslegnar: valid"));
}

#[test]
fn validate_rejects_zero_batch_size() {
    let home = tempfile::tempdir().unwrap();
    let out = tally(&home)
        .arg("validate")
        .arg(fixture("broken.toml"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("batch_size"));
}

// ===========================================================================
// run --dry-run
// ===========================================================================

#[test]
fn dry_run_plans_without_credentials() {
    let home = tempfile::tempdir().unwrap();
    let out = dry_run(&home, &["--json"]);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));

    let json = stdout_json(&out);
    assert_eq!(json["meta"]["dry_run"], true);
    assert_eq!(json["meta"]["config_name"], "innslegnar");
    assert_eq!(json["report"]["planned"], 3);
    assert_eq!(json["report"]["written"], 0);
    assert_eq!(json["report"]["batches"], 2);
    assert_eq!(json["report"]["unresolved_products"][0]["raw"], "Banana");
    assert_eq!(json["report"]["unresolved_stores"][0]["raw"], "Hvergi");
    assert!(stderr(&out).contains("dry run, 3 facts planned in 2 batches"));
}

#[test]
fn strict_fails_on_unresolved_names() {
    let home = tempfile::tempdir().unwrap();
    let out = dry_run(&home, &["--strict"]);
    assert_eq!(out.status.code(), Some(7));
    assert!(stderr(&out).contains("unresolved products (1): Banana"));
}

#[test]
fn output_file_gets_the_json() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("result.json");
    let out = dry_run(&home, &["--output", path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["report"]["planned"], 3);
    assert!(out.stdout.is_empty());
}

#[test]
fn date_window_flags_limit_the_import() {
    let home = tempfile::tempdir().unwrap();
    let out = dry_run(&home, &["--json", "--from", "2024-01-06", "--to", "2024-01-06"]);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));

    let json = stdout_json(&out);
    // Only the Lemon Lime row on 01-06 lands; both 01-05 rows and the 01-07 row fall outside.
    assert_eq!(json["report"]["planned"], 1);
    assert_eq!(json["report"]["rows_outside_window"], 3);
    assert_eq!(json["report"]["unresolved_products"], serde_json::json!([]));
    assert!(stderr(&out).contains("rows outside date window: 3"));
}

#[test]
fn reversed_date_window_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let out = dry_run(&home, &["--from", "2024-01-07", "--to", "2024-01-05"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("date window is empty"));
}

#[test]
fn unreadable_input_exits_5() {
    let home = tempfile::tempdir().unwrap();
    let out = tally(&home)
        .arg("run")
        .arg(fixture("innslegnar.toml"))
        .arg(fixture("missing.xlsx"))
        .args(["--dry-run", "--catalog"])
        .arg(fixture("catalog.json"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(5));
}

fn kronan_workbook(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("sala.xlsx");
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Krónan").unwrap();
    sheet.write_string(0, 0, "Dagsetning").unwrap();
    sheet.write_string(0, 1, "Vara").unwrap();
    sheet.write_string(0, 2, "Akrabraut").unwrap();
    sheet.write_string(0, 3, "Grandi").unwrap();
    let day = ExcelDateTime::from_ymd(2024, 1, 5).unwrap();
    sheet.write_datetime_with_format(1, 0, &day, &date_format).unwrap();
    sheet.write_string(1, 1, "Peach").unwrap();
    sheet.write_number(1, 2, 3).unwrap();
    sheet.write_number(1, 3, 1).unwrap();
    workbook.save(&path).unwrap();
    path
}

fn workbook_dry_run(home: &tempfile::TempDir, workbook: &Path, label: &str) -> Output {
    tally(home)
        .arg("run")
        .arg(fixture("innslegnar.toml"))
        .arg(workbook)
        .args(["--sheet-label", label, "--dry-run", "--json", "--catalog"])
        .arg(fixture("catalog.json"))
        .output()
        .unwrap()
}

#[test]
fn workbook_sheet_label_matches_like_an_alias() {
    let home = tempfile::tempdir().unwrap();
    let workbook = kronan_workbook(&home);
    let out = workbook_dry_run(&home, &workbook, "kronan");
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let json = stdout_json(&out);
    assert_eq!(json["report"]["planned"], 2);
    assert_eq!(json["report"]["sheets"][0]["label"], "Krónan");
}

#[test]
fn workbook_without_the_sheet_exits_5() {
    let home = tempfile::tempdir().unwrap();
    let workbook = kronan_workbook(&home);
    let out = workbook_dry_run(&home, &workbook, "Hagkaup");
    assert_eq!(out.status.code(), Some(5));
    assert!(stderr(&out).contains("no sheet named 'Hagkaup'"));
}

#[test]
fn missing_catalog_exits_4() {
    let home = tempfile::tempdir().unwrap();
    let out = tally(&home)
        .arg("run")
        .arg(fixture("innslegnar.toml"))
        .arg(fixture("kronan.csv"))
        .args(["--sheet-label", "Krónan", "--dry-run", "--catalog"])
        .arg(fixture("no-such-catalog.json"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("catalog unavailable"));
}

#[test]
fn writing_without_credentials_exits_8() {
    let home = tempfile::tempdir().unwrap();
    let out = tally(&home)
        .arg("run")
        .arg(fixture("innslegnar.toml"))
        .arg(fixture("kronan.csv"))
        .args(["--sheet-label", "Krónan", "--catalog"])
        .arg(fixture("catalog.json"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(8));
    assert!(stderr(&out).contains("--dry-run"));
}

// ===========================================================================
// run against a store
// ===========================================================================

fn mock_catalog(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/rest/v1/products");
        then.status(200).header("Content-Range", "0-1/2").json_body(json!([
            {"id": "p-lemon-lime", "name": "Lemon Lime"},
            {"id": "p-peach", "name": "Peach"}
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/rest/v1/retail_chains");
        then.status(200)
            .header("Content-Range", "0-0/1")
            .json_body(json!([{"id": "c-kronan", "slug": "kronan"}]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/rest/v1/stores");
        then.status(200).header("Content-Range", "0-1/2").json_body(json!([
            {"id": "s-akrabraut", "name": "Akrabraut", "chain_id": "c-kronan"},
            {"id": "s-grandi", "name": "Grandi", "chain_id": "c-kronan"}
        ]));
    });
}

fn live_run(server: &MockServer, home: &tempfile::TempDir) -> Output {
    tally(home)
        .arg("run")
        .arg(fixture("innslegnar.toml"))
        .arg(fixture("kronan.csv"))
        .args(["--sheet-label", "Krónan", "--json"])
        .env("TALLY_STORE_URL", server.base_url())
        .env("TALLY_STORE_KEY", "service-key")
        .output()
        .unwrap()
}

#[test]
fn run_upserts_every_batch() {
    let server = MockServer::start();
    mock_catalog(&server);
    let upsert = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/daily_sales")
            .query_param("on_conflict", "date,store_id,product_id,order_type");
        then.status(201);
    });

    let home = tempfile::tempdir().unwrap();
    let out = live_run(&server, &home);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    upsert.assert_hits(2);

    let json = stdout_json(&out);
    assert_eq!(json["meta"]["dry_run"], false);
    assert_eq!(json["report"]["written"], 3);
    assert!(stderr(&out).contains("3 written to daily_sales"));
}

#[test]
fn refused_batches_exit_6() {
    let server = MockServer::start();
    mock_catalog(&server);
    server.mock(|when, then| {
        when.method(POST).path("/rest/v1/daily_sales");
        then.status(500).body("internal error");
    });

    let home = tempfile::tempdir().unwrap();
    let out = live_run(&server, &home);
    assert_eq!(out.status.code(), Some(6));

    let json = stdout_json(&out);
    assert_eq!(json["report"]["written"], 0);
    assert_eq!(json["report"]["failed_batches"][0]["status"], 500);
    assert!(stderr(&out).contains("2 of 2 batches failed"));
}

#[test]
fn store_catalog_failure_exits_4() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/rest/v1/products");
        then.status(401).body("{\"message\":\"Invalid API key\"}");
    });

    let home = tempfile::tempdir().unwrap();
    let out = live_run(&server, &home);
    assert_eq!(out.status.code(), Some(4));
}

// ===========================================================================
// resolve / login
// ===========================================================================

#[test]
fn resolve_products_and_stores() {
    let home = tempfile::tempdir().unwrap();
    let out = tally(&home)
        .arg("resolve")
        .arg(fixture("innslegnar.toml"))
        .arg("--catalog")
        .arg(fixture("catalog.json"))
        .args(["--json", "PEACH", "Banana"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let json = stdout_json(&out);
    assert_eq!(json[0]["product_id"], "p-peach");
    assert_eq!(json[1]["unresolved"]["raw"], "Banana");

    let out = tally(&home)
        .arg("resolve")
        .arg(fixture("innslegnar.toml"))
        .arg("--catalog")
        .arg(fixture("catalog.json"))
        .args(["--json", "--chain", "Samkaup", "Kjörbúð-Dalvík"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let json = stdout_json(&out);
    assert_eq!(json[0]["store_id"], "s-dalvik");
    assert_eq!(json[0]["method"], "synonym");
}

#[test]
fn login_saves_credentials() {
    let server = MockServer::start();
    let check = server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/retail_chains")
            .header("apikey", "service-key");
        then.status(200).json_body(json!([]));
    });

    let home = tempfile::tempdir().unwrap();
    let out = tally(&home)
        .args(["login", "--url", &server.base_url(), "--key", "service-key"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    check.assert();
    assert!(stderr(&out).contains("store.json"));
}
