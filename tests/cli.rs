use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn transcriptor() -> Command {
    let mut cmd = Command::cargo_bin("transcriptor").unwrap();
    cmd.env_remove("TRANSCRIPTOR_CONFIG").env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_help_lists_commands() {
    transcriptor()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("backends"));
}

#[test]
fn test_backends_lists_both_variants() {
    transcriptor()
        .arg("backends")
        .assert()
        .success()
        .stdout(predicate::str::contains("whisper"))
        .stdout(predicate::str::contains("assemblyai"))
        .stdout(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_missing_credential_aborts_before_any_job() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.yaml");
    std::fs::write(
        &config,
        format!(
            "videos:\n  - https://www.youtube.com/watch?v=abc\nbackend: whisper\npaths:\n  audio_dir: {0}/audio\n  chunk_dir: {0}/chunks\n  transcript_dir: {0}/transcripts\n",
            tmp.path().display()
        ),
    )
    .unwrap();

    transcriptor()
        .current_dir(tmp.path())
        .env_remove("OPENAI_API_KEY")
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));

    // nothing was bootstrapped
    assert!(!tmp.path().join("transcripts").exists());
}

#[test]
fn test_assemblyai_needs_its_own_key() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.yaml");
    std::fs::write(&config, "videos: []\n").unwrap();

    transcriptor()
        .current_dir(tmp.path())
        .env("OPENAI_API_KEY", "sk-test")
        .env_remove("ASSEMBLYAI_API_KEY")
        .args(["run", "--backend", "assemblyai", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ASSEMBLYAI_API_KEY"));
}

#[test]
fn test_unparsable_config_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.yaml");
    std::fs::write(&config, "concurrency: [1, 2]\n").unwrap();

    transcriptor()
        .current_dir(tmp.path())
        .env("OPENAI_API_KEY", "sk-test")
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}
