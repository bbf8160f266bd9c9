//! CLI integration tests for `sprsplit split` and `sprsplit index`
//!
//! These tests run the built binary against generated batches and check exit
//! codes, written files and the index.

use image::{Rgba, RgbaImage};
use serial_test::serial;
use spritesplit::config::{find_config, load_config, CONFIG_FILENAME};
use spritesplit::ocr::OcrBackendChoice;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn sprsplit(cwd: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sprsplit"));
    cmd.current_dir(cwd).env("XDG_CONFIG_HOME", cwd).env_remove("RUST_LOG");
    cmd
}

/// Write a batch directory with two sprites and return (batch dir, output dir).
fn write_batch(root: &Path, batch: &str) -> (PathBuf, PathBuf) {
    let dir = root.join(batch);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("prompt.txt"), "1. Bed\n2. Floor Lamp\n").unwrap();
    RgbaImage::new(8, 8).save(dir.join("origin.png")).unwrap();

    let mut sheet = RgbaImage::new(160, 80);
    for (x0, y0, w, h) in [(5, 5, 30, 30), (80, 5, 16, 60)] {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                sheet.put_pixel(x, y, Rgba([0, 128, 255, 255]));
            }
        }
    }
    sheet.save(dir.join("renew.png")).unwrap();

    (dir, root.join("assets"))
}

fn split(cwd: &Path, batch_dir: &Path, output: &Path, extra: &[&str]) -> Output {
    sprsplit(cwd)
        .arg("split")
        .arg("--prompt")
        .arg(batch_dir.join("prompt.txt"))
        .arg("--origin")
        .arg(batch_dir.join("origin.png"))
        .arg("--renew")
        .arg(batch_dir.join("renew.png"))
        .arg("--output")
        .arg(output)
        .args(extra)
        .output()
        .expect("Failed to execute sprsplit")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_split_writes_sprites() {
    let temp = TempDir::new().unwrap();
    let (batch, out) = write_batch(temp.path(), "batch1");

    let output = split(temp.path(), &batch, &out, &["--ocr", "none"]);
    assert!(output.status.success(), "split failed: {}", stderr(&output));

    assert!(out.join("bed_1_32x32.png").exists());
    assert!(out.join("floorlamp_1_32x96.png").exists());
    assert!(out.join("sprite_index.json").exists());

    let log = stderr(&output);
    assert!(log.contains("[1/5]"));
    assert!(log.contains("[5/5]"));
    assert!(log.contains("batch1"));
}

#[test]
fn test_split_json_progress() {
    let temp = TempDir::new().unwrap();
    let (batch, out) = write_batch(temp.path(), "batch1");

    let output = split(temp.path(), &batch, &out, &["--ocr", "none", "--json"]);
    assert!(output.status.success(), "split failed: {}", stderr(&output));

    let events: Vec<serde_json::Value> = stderr(&output)
        .lines()
        .map(|line| serde_json::from_str(line).expect("every progress line is JSON"))
        .collect();
    let saved = events.iter().filter(|e| e["event"] == "sprite_saved").count();
    assert_eq!(saved, 2);

    let last = events.last().unwrap();
    assert_eq!(last["event"], "batch_completed");
    assert_eq!(last["new_files"], 2);
}

#[test]
fn test_index_check_after_two_batches() {
    let temp = TempDir::new().unwrap();
    let (first, out) = write_batch(temp.path(), "batch1");
    let (second, _) = write_batch(temp.path(), "batch2");

    assert!(split(temp.path(), &first, &out, &["--ocr", "none"]).status.success());
    assert!(split(temp.path(), &second, &out, &["--ocr", "none"]).status.success());
    assert!(out.join("bed_2_32x32.png").exists());

    let output = sprsplit(temp.path()).arg("index").arg(&out).arg("--check").output().unwrap();
    assert!(output.status.success(), "index check failed: {}", stderr(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Sprites: 4"));
    assert!(stdout.contains("batch2"));
    assert!(stdout.contains("Index OK"));
}

#[test]
fn test_index_check_reports_problems() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("assets");
    fs::create_dir_all(&out).unwrap();
    fs::write(
        out.join("sprite_index.json"),
        r#"{"_meta": {"sources": [], "total_sprites": 1, "last_updated": ""},
            "counts": {"bed": 1},
            "files": ["bed_3_32x32.png"]}"#,
    )
    .unwrap();

    let output = sprsplit(temp.path()).arg("index").arg(&out).arg("--check").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("sequence 3"));
}

#[test]
fn test_missing_input_exits_with_error() {
    let temp = TempDir::new().unwrap();
    let (batch, out) = write_batch(temp.path(), "batch1");
    fs::remove_file(batch.join("renew.png")).unwrap();

    let output = split(temp.path(), &batch, &out, &["--ocr", "none"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("not found"));
    assert!(!out.exists());
}

#[test]
fn test_malformed_index_exits_with_error() {
    let temp = TempDir::new().unwrap();
    let (batch, out) = write_batch(temp.path(), "batch1");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("sprite_index.json"), "{").unwrap();

    let output = split(temp.path(), &batch, &out, &["--ocr", "none"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Malformed index"));
    assert!(!out.join("bed_1_32x32.png").exists());
}

#[test]
fn test_invalid_backend_is_usage_error() {
    let temp = TempDir::new().unwrap();
    let (batch, out) = write_batch(temp.path(), "batch1");

    let output = split(temp.path(), &batch, &out, &["--ocr", "paddle"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_index_file_with_path_is_usage_error() {
    let temp = TempDir::new().unwrap();
    let (batch, out) = write_batch(temp.path(), "batch1");

    let output = split(temp.path(), &batch, &out, &["--ocr", "none", "--index-file", "../i.json"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("output.index_file"));
}

#[test]
fn test_config_file_is_discovered() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(CONFIG_FILENAME),
        "[ocr]\nbackend = \"none\"\n\n[output]\nindex_file = \"catalog.json\"\n",
    )
    .unwrap();
    let (batch, out) = write_batch(temp.path(), "batch1");

    let output = split(temp.path(), &batch, &out, &[]);
    assert!(output.status.success(), "split failed: {}", stderr(&output));
    assert!(out.join("catalog.json").exists());
    assert!(!out.join("sprite_index.json").exists());
}

#[test]
#[serial]
fn test_find_config_from_working_directory() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(CONFIG_FILENAME), "[ocr]\nbackend = \"tesseract\"\n").unwrap();
    let nested = temp.path().join("ingredient").join("batch1");
    fs::create_dir_all(&nested).unwrap();

    let original = std::env::current_dir().unwrap();
    std::env::set_current_dir(&nested).unwrap();
    let found = find_config();
    let config = load_config(None);
    std::env::set_current_dir(original).unwrap();

    let found = found.unwrap().canonicalize().unwrap();
    assert_eq!(found, temp.path().join(CONFIG_FILENAME).canonicalize().unwrap());
    assert_eq!(config.unwrap().ocr.backend, OcrBackendChoice::Tesseract);
}
