use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_stub_config(dir: &TempDir) -> PathBuf {
    let content = format!(
        r#"[general]
state_db_path = "{}"
adapters = "stub"

[[clients]]
id = "acme"
name = "Acme Auto Glass"
website = "https://acme.test"
city = "Seattle"
state = "WA"
social_platforms = ["facebook"]
paa_questions = [
  "How long does windshield replacement take?",
  "Can a chipped windshield be repaired?",
]

[[clients.locations]]
city = "Seattle"
state = "WA"
"#,
        dir.path().join("state.sqlite").display()
    );
    let path = dir.path().join("config.toml");
    fs::write(&path, content).expect("write config");
    path
}

fn run_json(config: &Path, args: &[&str]) -> Value {
    let output = cargo_bin_cmd!("paa-pipeline")
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("run command");

    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn config_init_writes_example_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");

    let mut cmd = cargo_bin_cmd!("paa-pipeline");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).expect("read config");
    assert!(content.contains("[[clients]]"));
    assert!(content.contains("adapters = \"live\""));
}

#[test]
fn config_init_refuses_to_overwrite() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# mine").expect("write config");

    let mut cmd = cargo_bin_cmd!("paa-pipeline");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "# mine");
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("paa-pipeline");
    cmd.arg("--config")
        .arg(dir.path().join("nope.toml"))
        .args(["items", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn items_add_rejects_unknown_client() {
    let dir = TempDir::new().expect("temp dir");
    let config = write_stub_config(&dir);

    let mut cmd = cargo_bin_cmd!("paa-pipeline");
    cmd.arg("--config")
        .arg(&config)
        .args([
            "items",
            "add",
            "--client",
            "globex",
            "--question",
            "Is ADAS calibration required?",
            "--city",
            "Tacoma",
            "--state",
            "WA",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown client: globex"));
}

#[test]
fn doctor_reports_ok_in_stub_mode() {
    let dir = TempDir::new().expect("temp dir");
    let config = write_stub_config(&dir);

    let report = run_json(&config, &["doctor", "--json"]);

    assert_eq!(report["overall"], "ok");
    assert_eq!(report["clients"][0]["id"], "acme");
}

#[test]
fn stub_mode_schedules_runs_and_reconciles() {
    let dir = TempDir::new().expect("temp dir");
    let config = write_stub_config(&dir);

    let schedule = run_json(
        &config,
        &[
            "schedule",
            "generate",
            "--client",
            "acme",
            "--start",
            "2026-03-02",
            "--json",
        ],
    );
    let created = schedule["created"].as_array().expect("created items");
    assert_eq!(created.len(), 2);
    assert!(
        created[0]["scheduled_at"]
            .as_str()
            .unwrap()
            .starts_with("2026-03-03")
    );

    // Running the generator again finds nothing new
    let again = run_json(
        &config,
        &["schedule", "generate", "--client", "acme", "--json"],
    );
    assert_eq!(again["skipped_existing"], 2);

    let items = run_json(&config, &["items", "list", "--client", "acme", "--json"]);
    assert_eq!(items.as_array().unwrap().len(), 2);

    let item_id = created[0]["id"].as_str().unwrap().to_string();
    let reports = run_json(&config, &["pipeline", "--item", &item_id, "--json"]);
    let report = &reports[0];
    assert_eq!(report["stages"][0]["stage"], "blog");
    assert_eq!(report["stages"][0]["outcome"], "completed");
    assert_eq!(report["status"], "generating");

    let sweep = run_json(&config, &["reconcile", "--json"]);
    assert_eq!(sweep["videos_updated"], 1);
    assert_eq!(sweep["finalized"][0], item_id.as_str());
    assert_eq!(sweep["in_flight"], 0);
}
