//! Command-line tests for the readgraph binary

use assert_cmd::Command;
use predicates::prelude::*;

const SAM: &str = "@HD\tVN:1.6\tSO:coordinate
@SQ\tSN:chr1\tLN:1000
r1\t0\tchr1\t11\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII
r2\t16\tchr1\t15\t60\t10M\t*\t0\t0\tACGTACGTAC\tIIIIIIIIII
r3\t0\tchr1\t21\t60\t5M2D5M\t*\t0\t0\tACGTAACGTA\tIIIIIIIIII
r1\t0\tchr1\t41\t60\t4M\t*\t0\t0\tACGT\tIIII
";

fn sam_file() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.sam");
    std::fs::write(&path, SAM).unwrap();
    (dir, path)
}

fn readgraph() -> Command {
    Command::cargo_bin("readgraph").unwrap()
}

#[test]
fn test_help_lists_commands() {
    readgraph()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("layout"))
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_layout_text() {
    let (_dir, path) = sam_file();
    readgraph()
        .arg("layout")
        .arg(&path)
        .arg("chr1:1-60")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tracks: 2"))
        .stdout(predicate::str::contains("acgtacgtac"))
        .stdout(predicate::str::contains("ACGTA--ACGTA"));
}

#[test]
fn test_layout_tsv() {
    let (_dir, path) = sam_file();
    readgraph()
        .args(["layout", "--format", "tsv"])
        .arg(&path)
        .arg("1:1-60")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "id\tname\tposition\tend\tstrand\ttrack\tcigar",
        ))
        .stdout(predicate::str::contains("\t-\t1\t10M"));
}

#[test]
fn test_layout_json() {
    let (_dir, path) = sam_file();
    let output = readgraph()
        .args(["layout", "--format", "json"])
        .arg(&path)
        .arg("chr1:11-20")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["region"]["start"], 10);
    assert_eq!(json["region"]["end"], 20);
    assert_eq!(json["trackCount"], 2);
    assert_eq!(json["reads"][0]["pieces"][0]["x"], 10);
    assert_eq!(json["reads"][0]["pieces"][0]["quality"], 40);
}

#[test]
fn test_layout_unknown_sequence() {
    let (_dir, path) = sam_file();
    readgraph()
        .arg("layout")
        .arg(&path)
        .arg("chr7:1-100")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_layout_invalid_region() {
    let (_dir, path) = sam_file();
    readgraph()
        .arg("layout")
        .arg(&path)
        .arg("chr1:200-100")
        .assert()
        .failure();
}

#[test]
fn test_fetch_requires_readset() {
    readgraph()
        .args(["fetch", "--sequence", "chr1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--readset"));
}

#[test]
fn test_serve_missing_data_dir() {
    readgraph()
        .args(["serve", "/nonexistent/readgraph-data", "--port", "0"])
        .assert()
        .failure();
}
