#![cfg(not(feature = "opencv"))]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn fiducial(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("fiducial").expect("binary");
    cmd.current_dir(dir).env("FIDUCIAL_LOG", "off");
    cmd
}

#[test]
fn bad_choices_re_present_the_menu() {
    let dir = tempfile::tempdir().expect("tempdir");
    fiducial(dir.path())
        .write_stdin("5\nzero\n4\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bad choice").count(2))
        .stdout(predicate::str::contains("Enter your choice").count(3));
}

#[test]
fn exit_prints_nothing_more() {
    let dir = tempfile::tempdir().expect("tempdir");
    fiducial(dir.path())
        .write_stdin("4\n1\n")
        .assert()
        .success()
        .stdout(predicate::str::ends_with("Enter your choice: "));
    assert!(!dir.path().join("fiducial.png").exists());
}

#[test]
fn closed_stdin_ends_the_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    fiducial(dir.path())
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. create fiducial marker"));
}

#[test]
fn detection_without_video_returns_to_the_menu() {
    let dir = tempfile::tempdir().expect("tempdir");
    fiducial(dir.path())
        .write_stdin("3\n2\n4\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid camera file"))
        .stdout(predicate::str::contains("video source 0 could not be opened").count(2))
        .stdout(predicate::str::contains("Enter your choice").count(3));
    assert!(!dir.path().join("testData.txt").exists());
}

#[test]
fn generates_a_marker_from_a_code_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    let table = serde_json::json!({
        "name": "DICT_4X4_50",
        "marker_size": 4,
        "codes": [0xffffu64, 0x0001u64],
    });
    fs::write(dir.path().join("dict.json"), table.to_string()).expect("write table");
    let config = serde_json::json!({
        "code_table_path": "dict.json",
        "marker": { "dictionary": "DICT_4X4_50", "marker_id": 1, "side_pixels": 60 },
    });
    fs::write(dir.path().join("fiducial.json"), config.to_string()).expect("write config");

    fiducial(dir.path())
        .write_stdin("1\n4\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("marker written to fiducial.png"));

    let img = image::open(dir.path().join("fiducial.png"))
        .expect("png")
        .to_luma8();
    assert_eq!(img.dimensions(), (60, 60));
    // 6 cells of 10 px: border black, bit 0 black, bit 1 white.
    assert_eq!(img.get_pixel(5, 5)[0], 0);
    assert_eq!(img.get_pixel(15, 15)[0], 0);
    assert_eq!(img.get_pixel(25, 15)[0], 255);
}

#[test]
fn generation_without_a_code_table_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    fiducial(dir.path())
        .write_stdin("1\n4\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("no code table configured"));
    assert!(!dir.path().join("fiducial.png").exists());
}

#[test]
fn malformed_config_fails_at_startup() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("fiducial.json"), "{ not json").expect("write");
    fiducial(dir.path()).write_stdin("4\n").assert().failure();
}
