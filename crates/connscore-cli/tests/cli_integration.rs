//! CLI integration tests.
//!
//! These run the built binary against temporary data directories. Nothing
//! here reaches the network: collection tests point the fetcher at a closed
//! local port.

use std::fs;
use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, Output};

fn connscore(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_connscore"))
        .args(args)
        .env_remove("APIFY_PROXY_PASSWORD")
        .env_remove("CONNSCORE_DATA_DIR")
        .env_remove("CONNSCORE_CONFIG")
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to run connscore binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// A config file pointing the fetcher at a port nothing listens on.
fn offline_config(dir: &Path) -> String {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let path = dir.join("config.toml");
    fs::write(
        &path,
        format!(
            "[fetch]\nbase_url = \"http://127.0.0.1:{port}\"\ntimeout_secs = 5\n\n\
             [historical]\ndelay_secs = 0.0\njitter = false\n"
        ),
    )
    .unwrap();
    path.display().to_string()
}

// =============================================================================
// Help and argument handling
// =============================================================================

#[test]
fn help_lists_subcommands() {
    let output = connscore(&["--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["daily", "date", "historical", "generate-json", "migrate"] {
        assert!(text.contains(command), "missing {command} in help:\n{text}");
    }
}

#[test]
fn version_flag() {
    let output = connscore(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("connscore "));
}

#[test]
fn invalid_date_is_rejected() {
    let output = connscore(&["date", "2024-13-01"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid date"));
}

#[test]
fn reversed_range_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let output = connscore(&[
        "historical",
        "--start-date",
        "2024-01-05",
        "--end-date",
        "2024-01-01",
        "--data-dir",
        data.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("after end date"), "{}", stderr(&output));
}

#[test]
fn oversized_delay_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let output = connscore(&[
        "historical",
        "--start-date",
        "2024-01-01",
        "--end-date",
        "2024-01-01",
        "--delay",
        "1e20",
        "--data-dir",
        data.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1), "{}", stderr(&output));
    assert!(stderr(&output).contains("historical.delay_secs"));
    assert!(!stderr(&output).contains("panicked"));
}

#[test]
fn invalid_config_reports_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[daily]\nretries = 0\n\n[historical]\nbatch_size = 0\n").unwrap();

    let output = connscore(&["generate-json", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("daily.retries"), "{err}");
    assert!(err.contains("historical.batch_size"), "{err}");
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let output = connscore(&["generate-json", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to load configuration"));
}

// =============================================================================
// Maintenance commands
// =============================================================================

#[test]
fn generate_json_from_history_table() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(
        data.join("connections_difficulty_history.csv"),
        "date,rating,max_score\n2024-01-02,3.5,5\n2024-01-01,2,5\n",
    )
    .unwrap();

    let output = connscore(&["generate-json", "--data-dir", data.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("Wrote 2 history records"));

    let history: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(data.join("connections_difficulty_history.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(history["metadata"]["total_puzzles"], 2);
    assert_eq!(history["metadata"]["last_updated"], "2024-01-02");
    assert_eq!(history["puzzles"][0]["date"], "2024-01-01");

    let latest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(data.join("connections_difficulty_data_latest.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(latest["puzzles"][0]["rating"], 3.5);
    assert!(data.join("connections_difficulty_four_day.csv").exists());
}

#[test]
fn migrate_legacy_table() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    let table = data.join("connections_difficulty_history.csv");
    fs::write(&table, "date,rating\n2023-05-01,2\n").unwrap();

    let output = connscore(&["migrate", "--data-dir", data.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        fs::read_to_string(&table).unwrap(),
        "date,rating,day_of_week,month\n2023-05-01,2,Monday,May\n"
    );
    assert!(data.join("connections_difficulty_history.json").exists());
}

#[test]
fn quiet_suppresses_summary() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let output = connscore(&["-q", "generate-json", "--data-dir", data.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
}

// =============================================================================
// Collection without network
// =============================================================================

#[test]
fn unreachable_source_leaves_gap_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let config = offline_config(dir.path());

    let output = connscore(&[
        "date",
        "2024-01-01",
        "--config",
        &config,
        "--data-dir",
        data.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("No rating collected for 2024-01-01"));
    assert!(!data.join("connections_difficulty_history.csv").exists());
}

#[test]
fn historical_run_continues_past_failures() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let config = offline_config(dir.path());

    let output = connscore(&[
        "historical",
        "--start-date",
        "2024-01-01",
        "--end-date",
        "2024-01-03",
        "--config",
        &config,
        "--data-dir",
        data.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Requested 3, collected 0"), "{text}");
    assert!(text.contains("2024-01-01, 2024-01-02, 2024-01-03"), "{text}");
}
