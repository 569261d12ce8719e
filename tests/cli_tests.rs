use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Binary invocation isolated from the user's configuration files.
fn dirtidy(home: &Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("dirtidy"));
    cmd.current_dir(home)
        .env("HOME", home)
        .env_remove("DIRTIDY_LOG");
    cmd
}

fn run_id_from(stdout: &[u8]) -> String {
    let json: Value = serde_json::from_slice(stdout).expect("organize --json prints JSON");
    json["report"]["run_id"]
        .as_str()
        .expect("report has a run id")
        .to_string()
}

#[test]
fn organize_then_undo_round_trip() {
    let td = tempdir().expect("tempdir");
    let home = fs::canonicalize(td.path()).expect("canonicalize");
    let root = home.join("downloads");
    fs::create_dir(&root).expect("mkdir");
    fs::write(root.join("x.jpg"), "jpeg").expect("write");
    fs::write(root.join("y.txt"), "text").expect("write");

    let out = dirtidy(&home)
        .args(["organize", "downloads", "--json"])
        .output()
        .expect("spawn binary");
    assert!(out.status.success(), "organize failed: {}", String::from_utf8_lossy(&out.stderr));
    let run_id = run_id_from(&out.stdout);
    assert!(root.join("Images/x.jpg").is_file());
    assert!(root.join("Documents/y.txt").is_file());

    dirtidy(&home)
        .args(["undo", &run_id, "--path", "downloads"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored"));
    assert!(root.join("x.jpg").is_file());
    assert!(root.join("y.txt").is_file());
    assert!(!root.join("Images").exists());

    dirtidy(&home)
        .args(["undo", &run_id, "--path", "downloads"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already undone"));
}

#[test]
fn dry_run_reports_without_changes() {
    let td = tempdir().expect("tempdir");
    let home = fs::canonicalize(td.path()).expect("canonicalize");
    fs::write(home.join("song.mp3"), "mp3").expect("write");

    dirtidy(&home)
        .args(["organize", ".", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would move").and(predicate::str::contains("DRY RUN")));

    assert!(home.join("song.mp3").is_file());
    assert!(!home.join("Audio").exists());
    assert!(!home.join(".dirtidy").exists());
}

#[test]
fn skip_policy_from_config_file() {
    let td = tempdir().expect("tempdir");
    let home = fs::canonicalize(td.path()).expect("canonicalize");
    let root = home.join("work");
    fs::create_dir_all(root.join("Images")).expect("mkdir");
    fs::write(root.join("Images/x.jpg"), "existing").expect("write");
    fs::write(root.join("x.jpg"), "incoming").expect("write");
    fs::write(
        home.join("custom.toml"),
        "[organize]\non_duplicate = \"skip\"\n",
    )
    .expect("write config");

    let out = dirtidy(&home)
        .args(["organize", "work", "--json", "--config", "custom.toml"])
        .output()
        .expect("spawn binary");
    assert!(out.status.success());

    let json: Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(json["report"]["counts"]["skipped"], 1);
    assert_eq!(json["report"]["results"][0]["status"], "skipped");
    assert_eq!(fs::read_to_string(root.join("x.jpg")).expect("read"), "incoming");
}

#[test]
fn history_lists_runs() {
    let td = tempdir().expect("tempdir");
    let home = fs::canonicalize(td.path()).expect("canonicalize");
    fs::write(home.join("a.pdf"), "pdf").expect("write");

    let out = dirtidy(&home)
        .args(["organize", ".", "--json"])
        .output()
        .expect("spawn binary");
    let run_id = run_id_from(&out.stdout);

    dirtidy(&home)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains(run_id.as_str()).and(predicate::str::contains("undoable")));
}

#[test]
fn unknown_log_is_fatal() {
    let td = tempdir().expect("tempdir");
    let home = fs::canonicalize(td.path()).expect("canonicalize");

    dirtidy(&home)
        .args(["undo", "20000101T000000Z-deadbeef"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn missing_directory_is_fatal() {
    let td = tempdir().expect("tempdir");
    let home = fs::canonicalize(td.path()).expect("canonicalize");

    dirtidy(&home)
        .args(["organize", "does-not-exist"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot access"));
}

#[test]
fn invalid_policy_is_rejected_by_clap() {
    let td = tempdir().expect("tempdir");
    let home = fs::canonicalize(td.path()).expect("canonicalize");

    dirtidy(&home)
        .args(["organize", ".", "--on-duplicate", "merge"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
