//! End-to-end CLI tests for tendies.
//!
//! These tests run the actual binary and verify:
//! - Help, version and completions output
//! - Argument and configuration errors fail before any network call
//! - Offline commands (chart, html, clean, config) against temp folders
//!
//! # Test Organization
//!
//! - `test_cli_*` - General CLI tests (flags, help, version)
//! - `test_run_*` - Run command validation
//! - `test_chart_*`, `test_html_*`, `test_clean_*` - Offline commands
//! - `test_config_*` - Config command

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

/// Log a test event with timestamp
macro_rules! test_log {
    ($($arg:tt)*) => {
        let timestamp = chrono::Utc::now().format("%H:%M:%S%.3f");
        eprintln!("[TEST {}] {}", timestamp, format!($($arg)*));
    };
}

fn tendies_cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("tendies");
    cmd.env("NO_COLOR", "1")
        .env_remove("TENDIES_OUTPUT")
        .env_remove("TENDIES_CREDENTIALS")
        .env_remove("TENDIES_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

const NYSE_LISTED: &str = "ACT Symbol,Company Name\nGME,GameStop\nBB,BlackBerry\nALL,Allstate\n";
const NASDAQ_LISTED: &str = "Symbol,Security Name\nAMC,AMC Entertainment\nTSLA,Tesla\n";

const LEGACY_DD: &str = "\
id|title|score|created|last_updated|submission_text|title_ticker|submission_text_ticker
d1|GME DD|30|2021-01-25 08:00:00|2021-01-27 12:00:00|more GME|['GME']|['ALL', 'GME']
d2|GME again|20|2021-01-26 08:00:00|2021-01-27 12:00:00||[\"GME\"]|[]
d3|AMC thoughts|5|2021-01-26 09:00:00|2021-01-27 12:00:00||['AMC']|[]
";

/// Workspace with ticker listings and a config file pointing at them.
struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(dir.path().join("nyse-listed.csv"), NYSE_LISTED).unwrap();
        fs::write(dir.path().join("nasdaq-listed.csv"), NASDAQ_LISTED).unwrap();
        let config = write_config(dir.path(), &dir.path().join("nyse-listed.csv"));
        Self { dir, config }
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn curated(&self, name: &str, content: &str) {
        let curated = self.output().join("curated");
        fs::create_dir_all(&curated).unwrap();
        fs::write(curated.join(format!("{name}.csv")), content).unwrap();
    }

    fn cmd(&self) -> Command {
        let mut cmd = tendies_cmd();
        cmd.arg("--config").arg(&self.config);
        cmd
    }
}

fn write_config(dir: &Path, nyse: &Path) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(
        &path,
        format!(
            "[paths]\noutput = \"{}\"\ncredentials = \"{}\"\nnyse_tickers = \"{}\"\nnasdaq_tickers = \"{}\"\n",
            dir.join("out").display(),
            dir.join("credentials.json").display(),
            nyse.display(),
            dir.join("nasdaq-listed.csv").display(),
        ),
    )
    .unwrap();
    path
}

// =============================================================================
// General CLI
// =============================================================================

#[test]
fn test_cli_help() {
    test_log!("Starting test_cli_help");
    let start = Instant::now();

    tendies_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tendies"))
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("run"));

    test_log!("test_cli_help completed in {:?}", start.elapsed());
}

#[test]
fn test_cli_version() {
    tendies_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_run_help_lists_categories() {
    tendies_cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--due-diligence"))
        .stdout(predicate::str::contains("--daily-discussion"))
        .stdout(predicate::str::contains("--stock-ticker"))
        .stdout(predicate::str::contains("--timefilter"));
}

#[test]
fn test_cli_completions() {
    tendies_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tendies"));
}

// =============================================================================
// Run validation
// =============================================================================

#[test]
fn test_run_without_category_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no categories selected"));
}

#[test]
fn test_run_with_bad_timefilter_fails() {
    tendies_cmd()
        .args(["run", "--all", "--timefilter", "decade"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("decade"));
}

#[test]
fn test_run_missing_reference_list_fails_before_network() {
    let ws = Workspace::new();
    let config = write_config(ws.dir.path(), &ws.dir.path().join("missing-nyse.csv"));

    tendies_cmd()
        .arg("--config")
        .arg(&config)
        .args(["run", "--all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Ticker reference list not found"))
        .stderr(predicate::str::contains("missing-nyse.csv"));
}

#[test]
fn test_run_missing_credentials_fails_before_network() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["run", "--stock-ticker"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid credentials"));
}

// =============================================================================
// Offline commands
// =============================================================================

#[test]
fn test_chart_from_curated_table() {
    test_log!("Starting test_chart_from_curated_table");
    let start = Instant::now();

    let ws = Workspace::new();
    ws.curated("DueDiligence", LEGACY_DD);

    ws.cmd()
        .args(["chart", "--due-diligence"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DueDiligence"))
        .stdout(predicate::str::contains("GME (2)"));

    let spec = fs::read_to_string(ws.output().join("semantic/DueDiligence.json")).unwrap();
    let spec: serde_json::Value = serde_json::from_str(&spec).unwrap();
    let mentions = spec["datasets"]["mentions"].as_array().unwrap();
    assert_eq!(mentions.len(), 2);
    assert!(mentions.iter().all(|m| m["ticker"] == "GME"));

    let page = fs::read_to_string(ws.output().join("index.html")).unwrap();
    assert!(page.contains("due_diligence: {"));
    assert!(page.contains("daily_discussion: null"));

    test_log!("test_chart_from_curated_table completed in {:?}", start.elapsed());
}

#[test]
fn test_chart_missing_table_reports_failure() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["chart", "--stock-ticker"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("categories failed"));
}

#[test]
fn test_html_without_charts() {
    let ws = Workspace::new();
    ws.cmd().arg("html").assert().success();

    let page = fs::read_to_string(ws.output().join("index.html")).unwrap();
    assert!(page.contains("stock_ticker: null"));
    assert!(page.contains("Last updated:"));
    assert!(!page.contains("{{ last_updated }}"));
}

#[test]
fn test_clean_rewrites_table() {
    let ws = Workspace::new();
    ws.curated("DueDiligence", LEGACY_DD);

    ws.cmd()
        .args(["clean", "--due-diligence"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 rows"));

    let cleaned = fs::read_to_string(ws.output().join("curated/DueDiligence.csv")).unwrap();
    assert!(cleaned.contains("body_ticker"));
    assert!(!cleaned.contains("'ALL'"));
}

#[test]
fn test_output_flag_overrides_config() {
    let ws = Workspace::new();
    let other = ws.dir.path().join("elsewhere");

    ws.cmd()
        .arg("--output")
        .arg(&other)
        .arg("html")
        .assert()
        .success();

    assert!(other.join("index.html").exists());
    assert!(!ws.output().join("index.html").exists());
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn test_config_show_prints_toml() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[paths]"))
        .stdout(predicate::str::contains("wallstreetbets"));
}

#[test]
fn test_config_bad_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[paths\noutput = ").unwrap();

    tendies_cmd()
        .arg("--config")
        .arg(&path)
        .arg("html")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}
