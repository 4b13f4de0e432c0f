//! Binary smoke tests

use assert_cmd::Command;
use predicates::prelude::*;

fn keyword_miner() -> Command {
    let mut cmd = Command::cargo_bin("keyword-miner").unwrap();
    cmd.env_remove("MARKET_API_KEY").env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_help_lists_commands() {
    keyword_miner()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze <keyword>"))
        .stdout(predicate::str::contains("blue-ocean"));
}

#[test]
fn test_types_lists_registry() {
    keyword_miner()
        .arg("types")
        .assert()
        .success()
        .stdout(predicate::str::contains("question_which"))
        .stdout(predicate::str::contains("common_suffix"));
}

#[test]
fn test_score_uses_estimates_without_key() {
    keyword_miner()
        .args(["score", "减肥药哪个牌子好多少钱"])
        .assert()
        .success()
        .stdout(predicate::str::contains("transactional"))
        .stdout(predicate::str::contains("estimate"));
}

#[test]
fn test_unknown_command_fails() {
    keyword_miner()
        .arg("dig")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown command"));
}

#[test]
fn test_unknown_variant_type_rejected() {
    let dir = tempfile::tempdir().unwrap();
    keyword_miner()
        .env("STORE_PATH", dir.path().join("k.jsonl"))
        .args(["analyze", "减肥", "--types", "alpha,beta"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown variant type"));
}
