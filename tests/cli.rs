use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn vx() -> Command {
    let mut cmd = Command::cargo_bin("vx").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn valid_document_exits_zero() {
    vx().args(["check", "--schema"])
        .arg(demo("user.schema.json"))
        .arg("--input")
        .arg(demo("user.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("1 documents, 1 valid, 0 invalid"));
}

#[test]
fn ndjson_reports_every_line_in_order() {
    vx().args(["check", "--ndjson", "--schema"])
        .arg(demo("user.schema.json"))
        .arg("--input")
        .arg(demo("users.ndjson"))
        .assert()
        .code(2)
        .stdout(predicate::str::contains("users.ndjson:1"))
        .stdout(predicate::str::contains("name: minLength: should have a minimum length of 3 but has 2"))
        .stdout(predicate::str::contains("email: minLength: should have a minimum length of 5 but has 4"))
        .stdout(predicate::str::contains("address.city: minLength: should have a minimum length of 2 but has 1"))
        .stdout(predicate::str::contains(r#"meta["team"]: should be of type string but got float64"#))
        .stdout(predicate::str::contains("decode error at $.Tags: cannot decode string into []string"))
        .stdout(predicate::str::contains("4 documents, 1 valid, 3 invalid"));
}

#[test]
fn json_format_is_machine_readable() {
    let out = vx()
        .args(["check", "--ndjson", "--format", "json", "--schema"])
        .arg(demo("user.schema.json"))
        .arg("--input")
        .arg(demo("users.ndjson"))
        .output()
        .unwrap();
    let results: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0]["well_formed"], true);
    assert_eq!(results[0]["errors"], serde_json::json!([]));
    assert_eq!(results[1]["errors"].as_array().unwrap().len(), 3);
    assert!(results[3]["decode_error"].as_str().unwrap().contains("$.Tags"));
}

#[test]
fn rule_errors_exit_one() {
    let dir = tempdir().unwrap();
    let doc = dir.path().join("short.json");
    fs::write(&doc, r#"{ "name": "Jo", "email": "jon@example.com" }"#).unwrap();

    vx().args(["check", "--schema"])
        .arg(demo("user.schema.json"))
        .arg("--input")
        .arg(&doc)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("name: minLength"));
}

#[test]
fn pointer_and_jq_select_documents() {
    let dir = tempdir().unwrap();
    let doc = dir.path().join("wrapped.json");
    fs::write(&doc, r#"{ "data": { "users": [ { "name": "Ada", "email": "ada@example.com" },
                                               { "name": "Bob", "email": "bob@example.com" } ] } }"#)
        .unwrap();

    vx().args(["check", "--json-pointer", "/data", "--jq-expr", ".users[]", "--schema"])
        .arg(demo("user.schema.json"))
        .arg("--input")
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("wrapped.json#1"))
        .stdout(predicate::str::contains("2 documents, 2 valid, 0 invalid"));
}

#[test]
fn globs_expand_and_root_can_be_overridden() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.json"), r#"{ "city": "Oslo" }"#).unwrap();
    fs::write(dir.path().join("b.json"), r#"{ "City": "X" }"#).unwrap();
    let pattern = dir.path().join("*.json");

    vx().args(["check", "--root", "address", "--schema"])
        .arg(demo("user.schema.json"))
        .arg("--input")
        .arg(pattern.to_string_lossy().to_string())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("city: minLength: should have a minimum length of 2 but has 1"))
        .stdout(predicate::str::contains("2 documents, 1 valid, 1 invalid"));
}

#[test]
fn broken_definitions_exit_two() {
    let dir = tempdir().unwrap();
    let schema = dir.path().join("bad.schema.json");
    fs::write(&schema, r#"{ "records": { "r": { "fields": [ { "name": "x", "type": "map[string" } ] } } }"#).unwrap();

    vx().args(["check", "--schema"])
        .arg(&schema)
        .arg("--input")
        .arg(demo("user.json"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing closing bracket in 'map[string'"));
}

#[test]
fn explain_shows_parsed_directives() {
    vx().args(["explain", "name=email, type=[]string, required, minLength=3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name  email"))
        .stdout(predicate::str::contains("type  []string"))
        .stdout(predicate::str::contains("rule  minLength=3"));
}

#[test]
fn explain_reports_schema_errors() {
    vx().args(["explain", "--declared", "int", "type=string", "minLength=0"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(
            "type mismatch: type in record is 'int' and in tag is 'string'",
        ))
        .stdout(predicate::str::contains("minLength should be greater than 0, got 0"));
}
