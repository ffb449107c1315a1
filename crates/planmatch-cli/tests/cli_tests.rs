//! Integration tests for the offline commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn planmatch_cmd() -> Command {
    Command::cargo_bin("planmatch").unwrap()
}

const PRICE_TABLE: &str = "\
# Tabela 2024

| Plano | Operadora | 0-18 | 19-38 | 39-59 | 60-75 | 76+ |
|---|---|---|---|---|---|---|
| Essencial | Amil | R$ 320,00 | R$ 450,00 | R$ 780,00 | R$ 1.250,00 | - |
";

#[test]
fn test_band_boundaries() {
    planmatch_cmd()
        .args(["band", "18"])
        .assert()
        .success()
        .stdout(predicate::str::contains("faixa 1"));

    planmatch_cmd()
        .args(["band", "19"])
        .assert()
        .success()
        .stdout(predicate::str::contains("faixa 2 (19-38 anos)"));
}

#[test]
fn test_band_json() {
    planmatch_cmd()
        .args(["band", "80", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"band\": 5"))
        .stdout(predicate::str::contains("\"maxAge\": null"));
}

#[test]
fn test_band_rejects_non_numeric_age() {
    planmatch_cmd().args(["band", "abc"]).assert().failure();
}

#[test]
fn test_prices_table() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("tabela.md");
    fs::write(&file, PRICE_TABLE).unwrap();

    planmatch_cmd()
        .arg("prices")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Essencial"))
        .stdout(predicate::str::contains("R$ 1.250,00"));
}

#[test]
fn test_prices_json() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("tabela.md");
    fs::write(&file, PRICE_TABLE).unwrap();

    planmatch_cmd()
        .arg("prices")
        .arg(&file)
        .args(["--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"planName\": \"Essencial\""))
        .stdout(predicate::str::contains("450.0"));
}

#[test]
fn test_prices_without_table() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("texto.md");
    fs::write(&file, "Carência de 180 dias para internações.").unwrap();

    planmatch_cmd()
        .arg("prices")
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("No price table found"));
}

#[test]
fn test_prices_missing_file() {
    planmatch_cmd()
        .args(["prices", "/nonexistent/tabela.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_recommend_rejects_invalid_profile() {
    let dir = TempDir::new().unwrap();
    let profile = dir.path().join("profile.json");
    let corpus = dir.path().join("corpus.json");
    let config = dir.path().join("config.yml");
    fs::write(&profile, "{ not json").unwrap();
    fs::write(&corpus, "[]").unwrap();

    planmatch_cmd()
        .arg("recommend")
        .arg("--profile")
        .arg(&profile)
        .arg("--corpus")
        .arg(&corpus)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid profile"));
}

#[test]
fn test_recommend_empty_corpus_needs_no_model() {
    let dir = TempDir::new().unwrap();
    let profile = dir.path().join("profile.json");
    let corpus = dir.path().join("corpus.json");
    let config = dir.path().join("config.yml");
    fs::write(&profile, r#"{"age": 35, "city": "São Paulo", "state": "SP", "budget": 800}"#)
        .unwrap();
    fs::write(&corpus, "[]").unwrap();

    planmatch_cmd()
        .arg("recommend")
        .arg("--profile")
        .arg(&profile)
        .arg("--corpus")
        .arg(&corpus)
        .arg("--config")
        .arg(&config)
        .args(["--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"queryCount\": 0"));
}

#[test]
fn test_recommend_invalid_config_exit_code() {
    let dir = TempDir::new().unwrap();
    let profile = dir.path().join("profile.json");
    let corpus = dir.path().join("corpus.json");
    let config = dir.path().join("config.yml");
    fs::write(&profile, "{}").unwrap();
    fs::write(&corpus, "[]").unwrap();
    fs::write(&config, "pipeline:\n  grading:\n    batch_size: 0\n").unwrap();

    planmatch_cmd()
        .arg("recommend")
        .arg("--profile")
        .arg(&profile)
        .arg("--corpus")
        .arg(&corpus)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("batch_size"));
}
