//! Integration tests for the gamma-run binary
//!
//! Exit codes: 0 = success, 1 = failed execution, 2 = usage or I/O error.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::NamedTempFile;

fn gamma_run() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gamma-run"))
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(format!("../vm/tests/fixtures/{}", name))
}

fn run(args: &[&str]) -> Output {
    Command::new(gamma_run())
        .args(args)
        .output()
        .expect("failed to execute gamma-run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("stdout should be JSON")
}

fn temp_json(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

const CONTEXT_FLAGS: [&str; 8] = [
    "--block-index",
    "10",
    "--block-hash",
    "abc123",
    "--block-nonce",
    "42",
    "--transaction-id",
    "tx1",
];

fn run_contract(contract: &str, budget: &str, extra: &[&str]) -> Output {
    let mut args = vec![contract, "--budget", budget];
    args.extend_from_slice(&CONTEXT_FLAGS);
    args.extend_from_slice(extra);
    run(&args)
}

#[test]
fn test_success_exits_zero() {
    let contract = fixture("my_contract.json");
    let output = run_contract(contract.to_str().unwrap(), "101", &[]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json = stdout_json(&output);
    assert_eq!(json["ok"], true);
    assert_eq!(json["value"], "The hash is: abc123");
    assert_eq!(json["consumed"], 101);
}

#[test]
fn test_budget_exceeded_exits_one() {
    let contract = fixture("my_contract.json");
    let output = run_contract(contract.to_str().unwrap(), "100", &[]);
    assert_eq!(output.status.code(), Some(1));

    let json = stdout_json(&output);
    assert_eq!(json["kind"], "budget_exceeded");
    assert_eq!(json["consumed"], 77);
    assert_eq!(json["budget"], 100);
    assert_eq!(json["attempted"], 24);
}

#[test]
fn test_options_file_and_overrides() {
    let contract = fixture("my_contract.json");
    let options = temp_json(
        r#"{"block_index": 1, "block_hash": "fromfile", "block_nonce": 2, "transaction_id": "tx9"}"#,
    );

    let output = run(&[
        contract.to_str().unwrap(),
        "--budget",
        "1000",
        "--options",
        options.path().to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["value"], "The hash is: fromfile");

    let output = run(&[
        contract.to_str().unwrap(),
        "--budget",
        "1000",
        "--options",
        options.path().to_str().unwrap(),
        "--block-hash",
        "flag",
    ]);
    assert_eq!(stdout_json(&output)["value"], "The hash is: flag");
}

#[test]
fn test_missing_context_exits_one() {
    let contract = fixture("my_contract.json");
    let output = run(&[contract.to_str().unwrap(), "--budget", "1000", "--block-index", "1"]);
    assert_eq!(output.status.code(), Some(1));

    let json = stdout_json(&output);
    assert_eq!(json["kind"], "invalid_context");
    assert_eq!(json["field"], "block_hash");
}

#[test]
fn test_malformed_contract_exits_one() {
    let contract = temp_json("{ not json");
    let output = run_contract(contract.path().to_str().unwrap(), "1000", &[]);
    assert_eq!(output.status.code(), Some(1));

    let json = stdout_json(&output);
    assert_eq!(json["kind"], "load_error");
    assert_eq!(json["consumed"], 0);
}

#[test]
fn test_entry_and_args() {
    let contract = temp_json(
        r#"{
            "name": "math",
            "operations": [
                { "name": "main", "body": [] },
                {
                    "name": "double",
                    "params": ["n"],
                    "body": [{ "return": { "binary": { "op": "mul", "lhs": { "var": "n" }, "rhs": { "int": 2 } } } }]
                }
            ]
        }"#,
    );
    let output = run_contract(
        contract.path().to_str().unwrap(),
        "10",
        &["--entry", "double", "--args", "[21]"],
    );
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["value"], 42);
    assert_eq!(json["consumed"], 3);

    let output = run_contract(
        contract.path().to_str().unwrap(),
        "10",
        &["--entry", "double", "--args", "{\"n\": 1}"],
    );
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_registered_contract_and_updates() {
    let library = temp_json(
        r#"{
            "name": "library",
            "operations": [{
                "name": "main",
                "body": [
                    { "expr": { "host": { "function": "update_state", "args": [{ "str": "touched" }] } } },
                    { "return": { "int": 7 } }
                ]
            }]
        }"#,
    );
    let caller = temp_json(
        r#"{
            "name": "caller",
            "operations": [{
                "name": "main",
                "body": [{ "return": { "invoke": { "contract": "library", "operation": "main" } } }]
            }]
        }"#,
    );

    let output = run_contract(
        caller.path().to_str().unwrap(),
        "100000",
        &["--register", library.path().to_str().unwrap(), "--show-updates"],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output);
    assert_eq!(json["value"], 7);

    let updates = json["state_updates"].as_array().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["contract"], "library");
    assert_eq!(updates[0]["transaction_id"], "tx1");
}

#[test]
fn test_config_file() {
    let contract = fixture("my_contract.json");
    let config = temp_json(r#"{"costs": {"call": 0}}"#);
    let output = run_contract(
        contract.to_str().unwrap(),
        "1000",
        &["--config", config.path().to_str().unwrap()],
    );
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["consumed"], 81);

    for depth in ["0", "1000000"] {
        let config = temp_json(&format!(r#"{{"max_call_depth": {}}}"#, depth));
        let output = run_contract(
            contract.to_str().unwrap(),
            "1000",
            &["--config", config.path().to_str().unwrap()],
        );
        assert_eq!(output.status.code(), Some(2));
    }
}

#[test]
fn test_usage_errors_exit_two() {
    let output = run(&["--budget", "10"]);
    assert_eq!(output.status.code(), Some(2));

    let output = run_contract("does-not-exist.json", "10", &[]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot read"));
}
