//! CLI integration tests

use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the CLI with an isolated home directory
fn run(home: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_itsm-priority"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("ITSM_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = run(&home, &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("ITSM Ticket Priority"), "Should show app name");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("batch"), "Should show batch command");
    assert!(stdout.contains("model"), "Should show model command");
    assert!(stdout.contains("health"), "Should show health command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = run(&home, &["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("itsm-priority"), "Should show binary name");
}

/// Test predict subcommand help lists every ticket field
#[test]
fn test_predict_help() {
    let home = TempDir::new().unwrap();
    let output = run(&home, &["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for flag in [
        "--impact",
        "--urgency",
        "--reassignments",
        "--handle-time",
        "--related-interactions",
        "--related-incidents",
        "--related-changes",
        "--status",
        "--category",
        "--closure-code",
    ] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

/// Out-of-range impact is rejected before any request is made
#[test]
fn test_predict_rejects_impact_out_of_range() {
    let home = TempDir::new().unwrap();
    let output = run(
        &home,
        &["--api-url", "http://127.0.0.1:9", "predict", "--impact", "7"],
    );

    assert!(!output.status.success());
}

#[test]
fn test_predict_against_mock_server() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/v1/predict")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "impact": 1,
            "urgency": 2,
            "status": "Closed"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"label":"1-High","raw":1,"confidence":0.91,"model_version":"1.2.0"}"#,
        )
        .create();

    let home = TempDir::new().unwrap();
    let output = run(
        &home,
        &[
            "--api-url",
            &server.url(),
            "--format",
            "json",
            "predict",
            "--impact",
            "1",
            "--status",
            "Closed",
        ],
    );

    mock.assert();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["label"], "1-High");
}

#[test]
fn test_predict_surfaces_server_error() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/api/v1/predict")
        .with_status(422)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"error":"schema_mismatch","message":"Prediction failed. Ensure your model was trained with these feature names.\nmissing feature"}"#,
        )
        .create();

    let home = TempDir::new().unwrap();
    let output = run(&home, &["--api-url", &server.url(), "predict"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Prediction failed."));
}

#[test]
fn test_batch_writes_scored_csv() {
    let mut server = mockito::Server::new();
    let scored = "Impact,Urgency,Predicted_Priority\n1,1,1\n4,4,4\n";
    let mock = server
        .mock("POST", "/api/v1/predict/batch")
        .match_header("content-type", "text/csv")
        .match_body("Impact,Urgency\n1,1\n4,4\n")
        .with_status(200)
        .with_header("content-type", "text/csv")
        .with_body(scored)
        .create();

    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let input = work.path().join("tickets.csv");
    let output_path = work.path().join("scored.csv");
    std::fs::write(&input, "Impact,Urgency\n1,1\n4,4\n").unwrap();

    let output = run(
        &home,
        &[
            "--api-url",
            &server.url(),
            "batch",
            input.to_str().unwrap(),
            "--output",
            output_path.to_str().unwrap(),
        ],
    );

    mock.assert();
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&output_path).unwrap(), scored);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Predicted_Priority"));
}

#[test]
fn test_batch_missing_input_file_fails() {
    let home = TempDir::new().unwrap();
    let output = run(
        &home,
        &["--api-url", "http://127.0.0.1:9", "batch", "/nonexistent/tickets.csv"],
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Failed to read"));
}

#[test]
fn test_api_url_from_config_file() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/v1/model")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"models":[]}"#)
        .create();

    let home = TempDir::new().unwrap();
    let config_dir = home.path().join(".config").join("itsm-priority");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.json"),
        format!(r#"{{"api_url": "{}", "default_format": "json"}}"#, server.url()),
    )
    .unwrap();

    let output = run(&home, &["model"]);

    mock.assert();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["models"].as_array().unwrap().is_empty());
}

#[test]
fn test_health_unavailable_exits_nonzero() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/healthz")
        .with_status(503)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"status":"unhealthy","components":{"primary_model":{"status":"unhealthy","critical":true,"message":"Required artifact not found","last_check_timestamp":0}}}"#,
        )
        .create();

    let home = TempDir::new().unwrap();
    let output = run(&home, &["--api-url", &server.url(), "health"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!output.status.success());
    assert!(stdout.contains("primary_model"));
}
