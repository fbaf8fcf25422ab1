use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const RESUME: &str = "\
John Doe
Email: john.doe@example.com
Phone: (555) 123-4567

WORK EXPERIENCE
Senior Software Engineer
ABC Tech, New York, NY
June 2020 - Present

SKILLS
Python, python, SQL
";

/// Runs the binary isolated from the caller's config and environment.
fn vitae(home: &Path) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("vitae").into();
    cmd.env("XDG_CONFIG_HOME", home)
        .env("HOME", home)
        .env_remove("VITAE_CONFIG")
        .env_remove("VITAE_OCR_ENABLED")
        .env_remove("VITAE_CONFIDENCE_THRESHOLD")
        .env_remove("VITAE_MIN_TEXT_CHARS")
        .env_remove("VITAE_LOAD_TIMEOUT")
        .env_remove("VITAE_OCR_LANGUAGE")
        .env_remove("VITAE_TESSERACT_CMD")
        .env_remove("RUST_LOG");
    cmd
}

fn write_resume(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

#[test]
fn test_parse_prints_record() {
    let tmp = TempDir::new().unwrap();
    let resume = write_resume(tmp.path(), "resume.txt", RESUME);

    let json = stdout_json(vitae(tmp.path()).arg("parse").arg(&resume));

    assert_eq!(json["email"], serde_json::json!(["john.doe@example.com"]));
    assert_eq!(json["skills"], serde_json::json!(["Python", "SQL"]));
    assert_eq!(json["experience"][0]["title"], "Senior Software Engineer");
    assert_eq!(json["experience"][0]["date_range"]["end"], "present");
    assert_eq!(json["projects"], serde_json::json!([]));
}

#[test]
fn test_parse_multiple_files_prints_array() {
    let tmp = TempDir::new().unwrap();
    let first = write_resume(tmp.path(), "a.txt", RESUME);
    let second = write_resume(tmp.path(), "b.md", "Jane Roe\njane@example.com\n");

    let json = stdout_json(vitae(tmp.path()).args(["parse", "--pretty"]).arg(&first).arg(&second));

    let docs = json.as_array().unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1]["email"], serde_json::json!(["jane@example.com"]));
}

#[test]
fn test_parse_with_sections() {
    let tmp = TempDir::new().unwrap();
    let resume = write_resume(tmp.path(), "resume.txt", RESUME);

    let json = stdout_json(
        vitae(tmp.path())
            .args(["parse", "--with-sections"])
            .arg(&resume),
    );

    assert_eq!(json["format"], "plain_text");
    assert_eq!(json["text_source"], "text_layer");
    assert_eq!(json["sections"][1]["kind"], "experience");
    assert_eq!(json["record"]["email"][0], "john.doe@example.com");
}

#[test]
fn test_parse_writes_output_file() {
    let tmp = TempDir::new().unwrap();
    let resume = write_resume(tmp.path(), "resume.txt", RESUME);
    let out = tmp.path().join("out.json");

    vitae(tmp.path())
        .arg("parse")
        .arg(&resume)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["name"], "John Doe");
}

#[test]
fn test_missing_file_fails() {
    let tmp = TempDir::new().unwrap();

    vitae(tmp.path())
        .args(["parse", "does-not-exist.pdf"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn test_unknown_format_fails() {
    let tmp = TempDir::new().unwrap();
    let resume = write_resume(tmp.path(), "resume.txt", RESUME);

    vitae(tmp.path())
        .args(["parse", "--format", "xyz"])
        .arg(&resume)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unsupported format"));
}

#[test]
fn test_image_with_ocr_disabled_fails() {
    let tmp = TempDir::new().unwrap();
    let image = tmp.path().join("scan.png");
    fs::write(&image, b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR").unwrap();

    vitae(tmp.path())
        .args(["parse", "--no-ocr"])
        .arg(&image)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("OCR disabled"));
}

#[test]
fn test_sections_command() {
    let tmp = TempDir::new().unwrap();
    let resume = write_resume(tmp.path(), "resume.txt", RESUME);

    vitae(tmp.path())
        .arg("sections")
        .arg(&resume)
        .assert()
        .success()
        .stdout(predicate::str::contains("contact"))
        .stdout(predicate::str::contains("WORK EXPERIENCE"))
        .stdout(predicate::str::contains("skills"));
}

#[test]
fn test_config_file_then_env_precedence() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("vitae.json");
    fs::write(&config, r#"{ "confidence_threshold": 0.5, "ocr_language": "deu" }"#).unwrap();

    let json = stdout_json(
        vitae(tmp.path())
            .arg("config")
            .arg("--config")
            .arg(&config)
            .env("VITAE_OCR_LANGUAGE", "fra"),
    );

    assert_eq!(json["confidence_threshold"], 0.5);
    assert_eq!(json["ocr_language"], "fra");
    assert_eq!(json["ocr_enabled"], true);
}

#[test]
fn test_invalid_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("vitae.json");
    fs::write(&config, r#"{ "confidence_threshold": 2.0 }"#).unwrap();

    vitae(tmp.path())
        .arg("config")
        .env("VITAE_CONFIG", &config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("confidence_threshold"));
}
