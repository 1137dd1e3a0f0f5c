use assert_cmd::Command;
use predicates::prelude::*;

fn trend_tui() -> Command {
    Command::cargo_bin("trend-tui").expect("binary built")
}

#[test]
fn prints_version() {
    trend_tui()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")))
        .stdout(predicate::str::starts_with("TREND-TUI"));
}

#[test]
fn prints_help() {
    trend_tui()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("TREND-TUI"))
        .stdout(predicate::str::contains("--version"))
        .stdout(predicate::str::contains("--variant <phone|desktop|tv>"));
}

#[test]
fn rejects_unknown_variant() {
    trend_tui()
        .args(["--variant", "watch"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown variant"));
}

#[test]
fn rejects_unknown_flag() {
    trend_tui()
        .arg("--frobnicate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--frobnicate"));
}

#[test]
fn flag_values_are_required() {
    trend_tui()
        .arg("--preset")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--preset needs a file"));
}
