//! Binary-level checks: argument surface and the no-terminal failure path.

use assert_cmd::Command;

#[test]
fn help_succeeds() {
    Command::cargo_bin("tscript")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("transcript"));
}

#[test]
fn version_succeeds() {
    Command::cargo_bin("tscript")
        .unwrap()
        .arg("--version")
        .assert()
        .success();
}

#[test]
fn fails_without_a_controlling_terminal() {
    // Under the test harness stdin is not a terminal, so the snapshot
    // capture must refuse before any mode change or file creation.
    let dir = tempfile::tempdir().unwrap();
    let transcript = dir.path().join("typescript");

    Command::cargo_bin("tscript")
        .unwrap()
        .arg(&transcript)
        .assert()
        .failure()
        .stderr(predicates::str::contains("tscript:"));

    assert!(!transcript.exists(), "no transcript on failed setup");
}
