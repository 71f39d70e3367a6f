use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures").join(name)
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout should contain valid json")
}

#[test]
fn info_summarizes_pages_and_annotations() {
    let output = cargo_bin_cmd!("flipbook-cli")
        .arg("info")
        .arg(fixture("book.json"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    assert_eq!(value["book_id"], "sample-book");
    assert_eq!(value["page_count"], 4);
    assert_eq!(value["annotation_count"], 2);
    assert_eq!(value["pages"][0]["label"], "Cover");
    assert_eq!(value["pages"][1]["label"], "1");
    assert_eq!(value["pages"][1]["types"]["rect"], 1);
    assert_eq!(value["pages"][1]["types"]["sticker"], 1);
    assert_eq!(value["pages"][3]["label"], "Blank");
}

#[test]
fn replay_emits_stable_json_contract() {
    let output = cargo_bin_cmd!("flipbook-cli")
        .arg("replay")
        .arg(fixture("book.json"))
        .arg("--script")
        .arg(fixture("script.json"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    insta::assert_json_snapshot!("replay_sample_script", stdout_json(&output));
}

#[test]
fn replay_writes_annotations_and_persists_to_storage() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let output_path = temp.path().join("out/annotations.json");
    let storage_dir = temp.path().join("store");

    cargo_bin_cmd!("flipbook-cli")
        .arg("replay")
        .arg(fixture("book.json"))
        .arg("--script")
        .arg(fixture("script.json"))
        .arg("--output")
        .arg(&output_path)
        .arg("--storage-dir")
        .arg(&storage_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"saved\": true"));

    let written: Value =
        serde_json::from_slice(&std::fs::read(&output_path).expect("output should exist"))
            .expect("output should be json");
    let page_two = written["2"].as_array().expect("page 2 annotations");
    assert_eq!(page_two.len(), 3);
    assert_eq!(page_two[2]["type"], "sticker");
    assert_eq!(page_two[2]["value"]["emoji"], "\u{1f389}");
    assert!(written.get("1").is_none(), "erased stroke should be gone");

    let saved: Value = serde_json::from_slice(
        &std::fs::read(storage_dir.join("books/sample-book.json")).expect("book saved"),
    )
    .expect("saved file should be json");
    assert_eq!(saved["version"], 1);
    assert_eq!(saved["annotations"], written);
}

#[test]
fn replay_resumes_from_saved_annotations() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let script_path = temp.path().join("noop.json");
    std::fs::write(&script_path, "[]").expect("script written");

    for _ in 0..2 {
        cargo_bin_cmd!("flipbook-cli")
            .arg("replay")
            .arg(fixture("book.json"))
            .arg("--script")
            .arg(fixture("script.json"))
            .arg("--storage-dir")
            .arg(temp.path())
            .assert()
            .success();
    }

    let output = cargo_bin_cmd!("flipbook-cli")
        .arg("replay")
        .arg(fixture("book.json"))
        .arg("--script")
        .arg(&script_path)
        .arg("--storage-dir")
        .arg(temp.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(stdout_json(&output)["annotation_count"], 4);
}

#[test]
fn replay_in_spread_mode_ignores_navigation_during_flip() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let script_path = temp.path().join("flip.json");
    std::fs::write(
        &script_path,
        r#"[{"op": "next"}, {"op": "next"}, {"op": "wait", "ms": 1000}, {"op": "previous"}]"#,
    )
    .expect("script written");

    let output = cargo_bin_cmd!("flipbook-cli")
        .arg("replay")
        .arg(fixture("book.json"))
        .arg("--script")
        .arg(&script_path)
        .arg("--mode")
        .arg("spread")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    assert_eq!(value["ignored_navigation"], 1);
    assert_eq!(value["visible_pages"], serde_json::json!([3, 4]));
}

#[test]
fn render_writes_png_at_zoomed_size() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let output_path = temp.path().join("page.png");

    cargo_bin_cmd!("flipbook-cli")
        .arg("render")
        .arg(fixture("book.json"))
        .arg("--page")
        .arg("2")
        .arg("--zoom")
        .arg("0.5")
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success();

    assert!(output_path.exists(), "rendered page should exist");

    let image = image::open(&output_path).expect("render should be a readable image");
    assert_eq!((image.width(), image.height()), (250, 350));
}

#[test]
fn render_rejects_unknown_page() {
    cargo_bin_cmd!("flipbook-cli")
        .arg("render")
        .arg(fixture("book.json"))
        .arg("--page")
        .arg("9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no page 9"));
}

#[test]
fn info_fails_for_missing_file() {
    cargo_bin_cmd!("flipbook-cli")
        .arg("info")
        .arg(fixture("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_invalid_book() {
    cargo_bin_cmd!("flipbook-cli")
        .arg("info")
        .arg(fixture("invalid.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse book file"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("flipbook-cli")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
