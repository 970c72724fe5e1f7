use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

const REWRITE_SCHEMA: &str = "name: rewrite
settings:
  processing_mode: single
  purpose: Rewrite one file.
sections:
  - kind: user
    template: ⟪prompt⟫
";

fn pseudo_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pseudo"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("RUST_LOG", "warn");
    cmd
}

fn json_of(cmd: &mut Command) -> Value {
    let assert = cmd.assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    serde_json::from_str(&stdout).expect("parse json")
}

/// A project `app` imported from a small source tree.
fn imported_project(home: &TempDir) -> TempDir {
    let src = TempDir::new().expect("src");
    fs::create_dir_all(src.path().join("lib")).unwrap();
    fs::create_dir_all(src.path().join("schemas")).unwrap();
    fs::write(src.path().join("lib/a.dart.pseudo"), "- Purpose: a\n").unwrap();
    fs::write(src.path().join("notes.txt"), "old notes\n").unwrap();
    fs::write(src.path().join("schemas/rewrite.schema.yaml"), REWRITE_SCHEMA).unwrap();
    fs::write(src.path().join(".hidden"), "ignored").unwrap();

    pseudo_cmd(home.path()).args(["init", "app"]).assert().success();
    pseudo_cmd(home.path())
        .arg("import")
        .arg("app")
        .arg(src.path())
        .assert()
        .success()
        .stdout(contains("Imported 3 files"));
    src
}

#[test]
fn init_creates_empty_project() {
    let home = TempDir::new().expect("home");
    pseudo_cmd(home.path())
        .args(["init", "app"])
        .assert()
        .success()
        .stdout(contains("Project 'app' ready"));
    assert!(home.path().join(".pseudo/projects/app/snapshot.json").exists());

    let payload = json_of(pseudo_cmd(home.path()).args(["status", "app", "--json"]));
    let keys: BTreeSet<&str> = payload
        .as_object()
        .expect("status root object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(
        keys,
        BTreeSet::from(["project", "files", "bullet_files", "sync", "jobs"])
    );
    assert_eq!(payload["files"], 0);
    assert_eq!(payload["jobs"].as_array().map(Vec::len), Some(0));
}

#[test]
fn commands_on_unknown_project_fail() {
    let home = TempDir::new().expect("home");
    pseudo_cmd(home.path())
        .args(["status", "ghost"])
        .assert()
        .failure()
        .stderr(contains("pseudo init ghost"));
}

#[test]
fn imported_schemas_are_listed() {
    let home = TempDir::new().expect("home");
    let _src = imported_project(&home);

    pseudo_cmd(home.path())
        .args(["schemas", "app"])
        .assert()
        .success()
        .stdout(contains("rewrite"))
        .stdout(contains("to-raw"))
        .stdout(contains("sync_bullets"));
}

#[test]
fn sync_dry_run_plans_without_queueing() {
    let home = TempDir::new().expect("home");
    let _src = imported_project(&home);

    let payload = json_of(pseudo_cmd(home.path()).args([
        "sync", "app", "--schema", "to-raw", "--dry-run", "--json",
    ]));
    assert_eq!(payload["plan"]["raw_needing_creation"], 1);
    assert_eq!(payload["plan"]["in_sync"], 0);
    assert!(payload["job_id"].is_null());

    let status = json_of(pseudo_cmd(home.path()).args(["status", "app", "--json"]));
    assert_eq!(status["jobs"].as_array().map(Vec::len), Some(0));
    assert_eq!(status["bullet_files"], 1);
}

#[test]
fn sync_rejects_non_sync_schema() {
    let home = TempDir::new().expect("home");
    let _src = imported_project(&home);

    pseudo_cmd(home.path())
        .args(["sync", "app", "--schema", "rewrite"])
        .assert()
        .failure()
        .stderr(contains("not a sync schema"));
}

#[test]
fn export_dry_run_writes_nothing() {
    let home = TempDir::new().expect("home");
    let _src = imported_project(&home);
    let out = TempDir::new().expect("out");

    pseudo_cmd(home.path())
        .arg("export")
        .arg("app")
        .arg(out.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(contains("[dry-run]"))
        .stdout(contains("notes.txt"));
    let mut entries = fs::read_dir(out.path()).unwrap();
    assert!(entries.next().is_none(), "dry-run must not create files");
}

#[test]
fn submit_rejects_unknown_schema() {
    let home = TempDir::new().expect("home");
    pseudo_cmd(home.path()).args(["init", "app"]).assert().success();

    pseudo_cmd(home.path())
        .args(["submit", "app", "--schema", "nope", "--prompt", "x"])
        .assert()
        .failure()
        .stderr(contains("unknown schema 'nope'"));
}

#[test]
fn job_without_model_fails_when_run() {
    let home = TempDir::new().expect("home");
    let _src = imported_project(&home);

    pseudo_cmd(home.path())
        .args([
            "submit", "app", "--schema", "rewrite", "--prompt", "tidy", "--target", "notes.txt",
        ])
        .assert()
        .success()
        .stdout(contains("Queued job 1"));

    pseudo_cmd(home.path())
        .args(["run", "app"])
        .assert()
        .success()
        .stdout(contains("0 responded, 1 failed"))
        .stdout(contains("No model selected"));

    let status = json_of(pseudo_cmd(home.path()).args(["status", "app", "--json"]));
    let job = &status["jobs"][0];
    assert_eq!(job["status"], "error");
    assert_eq!(job["error"], "No model selected");
    assert_eq!(job["target"], "/notes.txt");
}

#[test]
fn drafts_wait_for_resubmit() {
    let home = TempDir::new().expect("home");
    let _src = imported_project(&home);

    pseudo_cmd(home.path())
        .args([
            "submit", "app", "--schema", "rewrite", "--prompt", "tidy", "--draft",
        ])
        .assert()
        .success()
        .stdout(contains("Saved draft job 1"));

    let summary = json_of(pseudo_cmd(home.path()).args(["run", "app", "--json"]));
    assert_eq!(summary["responded"], 0);
    assert_eq!(summary["failed"], 0);

    pseudo_cmd(home.path())
        .args(["resubmit", "app", "1"])
        .assert()
        .success()
        .stdout(contains("now submitted"));
    pseudo_cmd(home.path())
        .args(["resubmit", "app", "7"])
        .assert()
        .failure()
        .stderr(contains("job 7 not found"));
}

#[cfg(unix)]
#[test]
fn run_applies_reply_from_model_command() {
    use pseudo_core::config::save_config_at;
    use pseudo_core::{Config, ModelCommand};

    let home = TempDir::new().expect("home");
    let _src = imported_project(&home);
    let config = Config {
        default_model: Some("local".to_string()),
        models: BTreeMap::from([(
            "local".to_string(),
            ModelCommand {
                command: vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    "cat > /dev/null; printf 'new notes'".to_string(),
                ],
            },
        )]),
        ..Config::default()
    };
    save_config_at(home.path(), &config).expect("save config");

    pseudo_cmd(home.path())
        .args([
            "submit", "app", "--schema", "rewrite", "--prompt", "tidy", "--target", "notes.txt",
        ])
        .assert()
        .success();
    let summary = json_of(pseudo_cmd(home.path()).args(["run", "app", "--json"]));
    assert_eq!(summary["responded"], 1);

    let out = TempDir::new().expect("out");
    pseudo_cmd(home.path())
        .arg("export")
        .arg("app")
        .arg(out.path())
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(out.path().join("notes.txt")).unwrap(),
        "new notes\n"
    );
    assert!(out.path().join("schemas/rewrite.schema.yaml").exists());

    pseudo_cmd(home.path())
        .args(["resubmit", "app", "1"])
        .assert()
        .success()
        .stdout(contains("now re_applying"));
    let status = json_of(pseudo_cmd(home.path()).args(["status", "app", "--json"]));
    assert_eq!(status["jobs"][0]["model"], "local");
    assert_eq!(status["jobs"][0]["responses"], 1);
}
