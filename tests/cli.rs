use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn care_assistant(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("care-assistant").unwrap();
    // Run away from any .env in the source tree.
    cmd.current_dir(workdir.path()).env_remove("GEMINI_API_KEY");
    cmd
}

#[test]
fn test_cli_help() {
    let workdir = TempDir::new().unwrap();
    care_assistant(&workdir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: care-assistant"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("--docs-dir <DOCS_DIR>"))
        .stdout(predicate::str::contains("--help"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_cli_serve_help() {
    let workdir = TempDir::new().unwrap();
    care_assistant(&workdir)
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: care-assistant serve"))
        .stdout(predicate::str::contains("--port <PORT>"))
        .stdout(predicate::str::contains("[default: 8501]"));
}

#[test]
fn test_cli_no_command() {
    let workdir = TempDir::new().unwrap();
    care_assistant(&workdir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_missing_api_key_is_reported() {
    let workdir = TempDir::new().unwrap();
    care_assistant(&workdir)
        .args(["ask", "How can I improve communication?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to initialize agent"))
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}

#[test]
fn test_zero_max_turns_is_rejected() {
    let workdir = TempDir::new().unwrap();
    care_assistant(&workdir)
        .args(["--max-turns", "0", "ask", "Hi"])
        .env("GEMINI_API_KEY", "test-key")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max turns must be at least 1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_prints_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Speak slowly and use pictures." },
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let base_url = server.uri();
    let assert = tokio::task::spawn_blocking(move || {
        let workdir = TempDir::new().unwrap();
        care_assistant(&workdir)
            .args(["--base-url", base_url.as_str(), "ask", "How can I improve communication?"])
            .env("GEMINI_API_KEY", "test-key")
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::diff("Speak slowly and use pictures.\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_failure_prints_apology() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let base_url = server.uri();
    let assert = tokio::task::spawn_blocking(move || {
        let workdir = TempDir::new().unwrap();
        care_assistant(&workdir)
            .args(["--base-url", base_url.as_str(), "ask", "Hi", "--stream"])
            .env("GEMINI_API_KEY", "test-key")
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::starts_with("Sorry, I encountered an error: "))
        .stdout(predicate::str::contains("500"));
}
