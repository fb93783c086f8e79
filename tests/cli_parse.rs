// CLI integration tests for the parse and check commands.
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::{json, Value};

const SCHEMA: &str = r#"
version: 1

enums:
  - name: AnimalType
    variants:
      - { name: DOG, value: dog }
      - { name: CAT, value: cat }

records:
  - name: Config
    fields:
      - { name: disabled, type: bool }
      - { name: gpu, type: bool }

  - name: Nested
    fields:
      - name: configs
        type: { type: list, element: { type: record, name: Config } }
      - name: animal
        type: { type: enum, name: AnimalType }
      - name: label
        type: { type: optional, inner: str }
"#;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_typed-payload");
    Command::new(exe)
}

fn write_file(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write file");
    path.to_str().expect("utf8 path").to_string()
}

fn parse_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("valid json")
}

#[test]
fn parse_payload_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let schema = write_file(temp.path(), "schema.yaml", SCHEMA);
    let payload = write_file(
        temp.path(),
        "payload.json",
        r#"{"Configs": [{"disabled": true, "GPU": false}], "animal": "cat"}"#,
    );

    let output = cmd()
        .args(["parse", "--schema", &schema, "--type", "Nested", &payload])
        .output()
        .expect("parse");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        parse_json(&output.stdout),
        json!({
            "configs": [{"disabled": true, "gpu": false}],
            "animal": "cat",
            "label": null
        })
    );
}

#[test]
fn parse_payload_from_stdin() {
    let temp = tempfile::tempdir().expect("tempdir");
    let schema = write_file(temp.path(), "schema.yaml", SCHEMA);

    let mut child = cmd()
        .args(["parse", "--schema", &schema, "--type", "Config", "--pretty"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(br#"{"disabled": false, "gpu": true}"#)
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait");

    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).expect("utf8");
    assert!(text.lines().count() > 1, "expected pretty output: {text}");
    assert_eq!(
        parse_json(text.as_bytes()),
        json!({"disabled": false, "gpu": true})
    );
}

#[test]
fn parse_schema_from_env() {
    let temp = tempfile::tempdir().expect("tempdir");
    let schema = write_file(temp.path(), "schema.yaml", SCHEMA);
    let payload = write_file(temp.path(), "payload.json", r#"{"disabled": true, "gpu": true}"#);

    let output = cmd()
        .env("TYPED_PAYLOAD_SCHEMA", &schema)
        .args(["parse", "--type", "Config", &payload])
        .output()
        .expect("parse");
    assert!(output.status.success());
    assert_eq!(parse_json(&output.stdout)["gpu"], true);
}

#[test]
fn parse_failure_reports_path() {
    let temp = tempfile::tempdir().expect("tempdir");
    let schema = write_file(temp.path(), "schema.yaml", SCHEMA);
    let payload = write_file(
        temp.path(),
        "payload.json",
        r#"{"configs": [{"disabled": true, "gpu": false}, {"disabled": true}], "animal": "dog"}"#,
    );

    let output = cmd()
        .args(["parse", "--schema", &schema, "--type", "Nested", &payload])
        .output()
        .expect("parse");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error: "), "stderr: {stderr}");
    assert!(stderr.contains("configs[1]"), "stderr: {stderr}");
    assert!(stderr.contains("gpu"), "stderr: {stderr}");
}

#[test]
fn parse_strict_rejects_unknown_keys() {
    let temp = tempfile::tempdir().expect("tempdir");
    let schema = write_file(temp.path(), "schema.yaml", SCHEMA);
    let payload = write_file(
        temp.path(),
        "payload.json",
        r#"{"disabled": true, "gpu": true, "extra": 1}"#,
    );

    let lenient = cmd()
        .args(["parse", "--schema", &schema, "--type", "Config", &payload])
        .output()
        .expect("lenient");
    assert!(lenient.status.success());

    let strict = cmd()
        .args(["parse", "--schema", &schema, "--type", "Config", "--strict", &payload])
        .output()
        .expect("strict");
    assert!(!strict.status.success());
    assert!(String::from_utf8_lossy(&strict.stderr).contains("extra"));

    let allowed = cmd()
        .args([
            "parse",
            "--schema",
            &schema,
            "--type",
            "Config",
            "--strict",
            "--allow-unknown-keys",
            &payload,
        ])
        .output()
        .expect("allowed");
    assert!(allowed.status.success());
}

#[test]
fn parse_unknown_record_type() {
    let temp = tempfile::tempdir().expect("tempdir");
    let schema = write_file(temp.path(), "schema.yaml", SCHEMA);
    let payload = write_file(temp.path(), "payload.json", "{}");

    let output = cmd()
        .args(["parse", "--schema", &schema, "--type", "Missing", &payload])
        .output()
        .expect("parse");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Missing"));
}

#[test]
fn check_lists_schema_definitions() {
    let temp = tempfile::tempdir().expect("tempdir");
    let schema = write_file(temp.path(), "schema.yaml", SCHEMA);

    let output = cmd()
        .args(["check", "--schema", &schema])
        .output()
        .expect("check");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("record Config"));
    assert!(lines[1].starts_with("record Nested"));
    assert!(lines[2].starts_with("enum AnimalType"));
}

#[test]
fn check_rejects_dangling_reference() {
    let temp = tempfile::tempdir().expect("tempdir");
    let schema = write_file(
        temp.path(),
        "schema.yaml",
        r#"
records:
  - name: Holder
    fields:
      - name: inner
        type: { type: record, name: Nowhere }
"#,
    );

    let output = cmd()
        .args(["check", "--schema", &schema])
        .output()
        .expect("check");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load schema"), "stderr: {stderr}");
    assert!(stderr.contains("Nowhere"), "stderr: {stderr}");
}
