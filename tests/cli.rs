use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("decisionwise").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: decisionwise [OPTIONS] <COMMAND>"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("decide"))
        .stdout(predicate::str::contains("summarize"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("--ollama-url <OLLAMA_URL>"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_cli_serve_help() {
    let mut cmd = Command::cargo_bin("decisionwise").unwrap();
    cmd.arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: decisionwise serve"))
        .stdout(predicate::str::contains("--port <PORT>"))
        .stdout(predicate::str::contains("--static-dir <STATIC_DIR>"));
}

#[test]
fn test_cli_decide_help() {
    let mut cmd = Command::cargo_bin("decisionwise").unwrap();
    cmd.arg("decide")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: decisionwise decide"))
        .stdout(predicate::str::contains("<OPTIONS>..."));
}

#[test]
fn test_cli_decide_needs_two_options() {
    // Rejected locally, the unreachable URL is never contacted
    let mut cmd = Command::cargo_bin("decisionwise").unwrap();
    cmd.args(["--ollama-url", "http://127.0.0.1:1", "decide", "OnlyOne", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Not enough options: Please provide at least two options to choose from.",
        ));
}

#[test]
fn test_cli_unreachable_model_is_generic_failure() {
    let mut cmd = Command::cargo_bin("decisionwise").unwrap();
    cmd.args(["--ollama-url", "http://127.0.0.1:1", "summarize", "Soup", "Salad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "An error occurred: Something went wrong. Please try again later.",
        ));
}

#[test]
fn test_cli_no_command() {
    let mut cmd = Command::cargo_bin("decisionwise").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage: decisionwise [OPTIONS] <COMMAND>"));
}
