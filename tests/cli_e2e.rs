//! End-to-end CLI tests for the review-trends binary.
//!
//! Runs fully offline: no `GEMINI_API_KEY` (keyword labels) and the lexical
//! embedder.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const REVIEWS_JSON: &str = r#"[
  {"reviewId": "1", "content": "Delivery was late again", "at": "2024-06-29 10:00:00"},
  {"reviewId": "2", "content": "Huge delay, delivery took forever", "at": "2024-06-30 08:00:00"},
  {"reviewId": "3", "content": "App crash every time I pay", "at": "2024-06-30 09:00:00"},
  {"reviewId": "4", "content": "Food was stale", "at": "2024-06-30"},
  {"reviewId": "5", "content": "Old news", "at": "2023-01-01"}
]"#;

/// Command isolated from the user's config, API key and log settings.
fn command(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("review-trends").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env_remove("GEMINI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn write_reviews(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("reviews.json");
    fs::write(&path, REVIEWS_JSON).unwrap();
    path
}

#[test]
fn test_binary_help_displays_usage() {
    let dir = TempDir::new().unwrap();
    command(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Label product reviews"))
        .stdout(predicate::str::contains("--target-date"))
        .stdout(predicate::str::contains("CSV is not accepted"));
}

#[test]
fn test_binary_version_displays_version() {
    let dir = TempDir::new().unwrap();
    command(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("review-trends"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let dir = TempDir::new().unwrap();
    command(dir.path())
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_missing_required_args_fails() {
    let dir = TempDir::new().unwrap();
    command(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--reviews"));
}

#[test]
fn test_binary_writes_trend_report_and_ontology() {
    let dir = TempDir::new().unwrap();
    let reviews = write_reviews(dir.path());

    command(dir.path())
        .arg("-q")
        .arg("--reviews")
        .arg(&reviews)
        .args(["--target-date", "2024-06-30", "--embedder", "lexical"])
        .args(["--rate-limit-pause-ms", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Top topics 2024-05-31 to 2024-06-30"))
        .stdout(predicate::str::contains("1. Delivery issue (2)"));

    let report = fs::read_to_string(dir.path().join("output/trend_report_2024-06-30.csv")).unwrap();
    let mut lines = report.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("topic,2024-05-31,"));
    assert!(header.ends_with(",2024-06-29,2024-06-30"));
    assert_eq!(header.split(',').count(), 32);

    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].starts_with("Delivery issue,"));
    assert!(rows[0].ends_with(",1,1"));
    assert!(rows.iter().any(|r| r.starts_with("App crashes,")));
    assert!(rows.iter().any(|r| r.starts_with("Food stale,")));

    let ontology: Vec<String> =
        serde_json::from_str(&fs::read_to_string(dir.path().join("data/topics.json")).unwrap())
            .unwrap();
    assert_eq!(ontology.len(), 11);
    assert_eq!(ontology[0], "Delivery issue");
    assert_eq!(ontology[10], "General complaint");
}

#[test]
fn test_binary_respects_window_output_dir_and_labeled_output() {
    let dir = TempDir::new().unwrap();
    let reviews = write_reviews(dir.path());

    command(dir.path())
        .arg("-q")
        .arg("-i")
        .arg(&reviews)
        .args(["-t", "2024-06-30", "-w", "2", "-o", "reports"])
        .args(["--embedder", "lexical", "--rate-limit-pause-ms", "0"])
        .args(["--ontology", "state/topics.json", "--write-labeled"])
        .assert()
        .success();

    let report = fs::read_to_string(dir.path().join("reports/trend_report_2024-06-30.csv")).unwrap();
    assert!(report.starts_with("topic,2024-06-29,2024-06-30\n"));
    assert!(report.contains("Delivery issue,1,1\n"));
    assert!(dir.path().join("state/topics.json").exists());

    let labeled = fs::read_to_string(dir.path().join("reports/labeled_reviews_2024-06-30.jsonl")).unwrap();
    assert_eq!(labeled.lines().count(), 5);
    assert!(labeled.contains(r#""date":"2023-01-01""#));
}

#[test]
fn test_binary_uses_persisted_ontology() {
    let dir = TempDir::new().unwrap();
    let reviews = write_reviews(dir.path());
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(dir.path().join("data/topics.json"), r#"["Food stale"]"#).unwrap();

    command(dir.path())
        .arg("-q")
        .arg("-i")
        .arg(&reviews)
        .args(["-t", "2024-06-30", "--embedder", "lexical", "--rate-limit-pause-ms", "0"])
        .assert()
        .success();

    let ontology: Vec<String> =
        serde_json::from_str(&fs::read_to_string(dir.path().join("data/topics.json")).unwrap())
            .unwrap();
    assert_eq!(ontology[0], "Food stale");
    assert!(ontology.contains(&"Delivery issue".to_string()));
    assert!(ontology.contains(&"App crashes".to_string()));
}

#[test]
fn test_binary_reads_config_file_defaults() {
    let dir = TempDir::new().unwrap();
    let reviews = write_reviews(dir.path());
    let config_dir = dir.path().join("config/review-trends");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        "embedder = \"lexical\"\noutput_dir = \"from-config\"\nrate_limit_pause_ms = 0\n",
    )
    .unwrap();

    command(dir.path())
        .arg("-q")
        .arg("-i")
        .arg(&reviews)
        .args(["-t", "2024-06-30"])
        .assert()
        .success();

    assert!(dir.path().join("from-config/trend_report_2024-06-30.csv").exists());
}

#[test]
fn test_binary_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let reviews = write_reviews(dir.path());
    let config_dir = dir.path().join("config/review-trends");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "similarity_threshold = 3\n").unwrap();

    command(dir.path())
        .arg("-i")
        .arg(&reviews)
        .args(["-t", "2024-06-30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("similarity_threshold"));
}

#[test]
fn test_binary_missing_timestamp_field_fails_fast() {
    let dir = TempDir::new().unwrap();
    let reviews = dir.path().join("reviews.jsonl");
    fs::write(&reviews, "{\"content\": \"no date here\", \"when\": \"yesterday\"}\n").unwrap();

    command(dir.path())
        .arg("-i")
        .arg(&reviews)
        .args(["-t", "2024-06-30", "--embedder", "lexical"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reviews.jsonl"));

    assert!(!dir.path().join("output").exists());
}

#[test]
fn test_binary_missing_reviews_file_fails() {
    let dir = TempDir::new().unwrap();
    command(dir.path())
        .args(["-i", "nope.json", "-t", "2024-06-30", "--embedder", "lexical"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.json"));
}

#[test]
fn test_binary_window_without_reviews_prints_notice() {
    let dir = TempDir::new().unwrap();
    let reviews = write_reviews(dir.path());

    command(dir.path())
        .arg("-q")
        .arg("-i")
        .arg(&reviews)
        .args(["-t", "2020-01-01", "--embedder", "lexical", "--rate-limit-pause-ms", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No reviews fall within the trend window"));

    let report = fs::read_to_string(dir.path().join("output/trend_report_2020-01-01.csv")).unwrap();
    assert_eq!(report.lines().count(), 1);
}
