use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn config_init_writes_example_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");

    let mut cmd = cargo_bin_cmd!("crosspost");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).expect("read config");
    assert!(content.contains("[bluesky]"));
    assert!(content.contains("bot_token_env"));
    assert!(content.contains("redirect_uri"));
}

#[test]
fn config_init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# existing").expect("write config");

    let mut cmd = cargo_bin_cmd!("crosspost");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn compose_with_stub_summarizer_writes_drafts() {
    let dir = TempDir::new().expect("temp dir");
    let article_path = dir.path().join("article.txt");
    let drafts_path = dir.path().join("drafts.toml");
    fs::write(
        &article_path,
        "A lengthy article about interesting developments in the field.",
    )
    .expect("write article");

    let mut cmd = cargo_bin_cmd!("crosspost");
    cmd.env("CROSSPOST__SUMMARIZER__PROVIDER", "stub")
        .args(["compose", "--platforms", "bluesky,telegram", "--file"])
        .arg(&article_path)
        .arg("--out")
        .arg(&drafts_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 draft(s)"));

    let content = fs::read_to_string(&drafts_path).expect("read drafts");
    assert!(content.contains("platform = \"bluesky\""));
    assert!(content.contains("platform = \"telegram\""));
    assert!(!content.contains("platform = \"twitter\""));
}

#[test]
fn compose_rejects_empty_input() {
    let dir = TempDir::new().expect("temp dir");
    let article_path = dir.path().join("empty.txt");
    fs::write(&article_path, "   \n").expect("write article");

    let mut cmd = cargo_bin_cmd!("crosspost");
    cmd.env("CROSSPOST__SUMMARIZER__PROVIDER", "stub")
        .args(["compose", "--file"])
        .arg(&article_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No article text"));
}

fn write_drafts(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("drafts.toml");
    let content = format!(
        "[[drafts]]\nplatform = \"bluesky\"\nbody = \"{}\"\n\n[[drafts]]\nplatform = \"telegram\"\nbody = \"{}\"\n",
        body, body
    );
    fs::write(&path, content).expect("write drafts");
    path
}

#[test]
fn publish_dry_run_reports_every_target() {
    let dir = TempDir::new().expect("temp dir");
    let drafts_path = write_drafts(&dir, "hello world");

    let mut cmd = cargo_bin_cmd!("crosspost");
    cmd.args(["publish", "--dry-run", "--drafts"])
        .arg(&drafts_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("2 succeeded, 0 failed"));
}

#[test]
fn publish_dry_run_flags_over_limit_drafts() {
    let dir = TempDir::new().expect("temp dir");
    let drafts_path = write_drafts(&dir, &"a".repeat(300));

    let mut cmd = cargo_bin_cmd!("crosspost");
    cmd.args(["publish", "--dry-run", "--drafts"])
        .arg(&drafts_path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Draft too long"));
}

#[test]
fn publish_narrows_to_the_requested_platforms() {
    let dir = TempDir::new().expect("temp dir");
    let drafts_path = write_drafts(&dir, "hello world");

    let mut cmd = cargo_bin_cmd!("crosspost");
    cmd.args(["publish", "--dry-run", "--platforms", "telegram", "--drafts"])
        .arg(&drafts_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 succeeded, 0 failed"));
}

#[test]
fn publish_fails_cleanly_without_a_drafts_file() {
    let dir = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("crosspost");
    cmd.current_dir(dir.path())
        .args(["publish", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read drafts file"));
}

#[test]
fn doctor_emits_valid_json() {
    let dir = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("crosspost");
    let output = cmd
        .current_dir(dir.path())
        .env("CROSSPOST__SUMMARIZER__PROVIDER", "stub")
        .args(["doctor", "--json"])
        .output()
        .expect("run doctor");

    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid json");
    assert!(parsed.get("overall").is_some());
    assert_eq!(parsed["summarizer"]["status"], "ok");
}

#[test]
fn login_rejects_unknown_platforms() {
    let mut cmd = cargo_bin_cmd!("crosspost");
    cmd.args(["login", "mastodon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown platform"));
}
