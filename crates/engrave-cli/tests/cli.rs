use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn engrave_tone() -> Command {
    Command::cargo_bin("engrave-tone").expect("binary")
}

fn write_gauge(out: &Path) {
    engrave_tone()
        .args(["gauge", "50", "4", "4", "--out"])
        .arg(out)
        .assert()
        .success();
}

/// Small horizontal gradient photo for the transform subcommands.
fn write_photo(path: &Path) {
    let img = image::RgbImage::from_fn(64, 48, |x, _| {
        let v = (x * 4) as u8;
        image::Rgb([v, v, v])
    });
    img.save(path).expect("save photo");
}

#[test]
fn gauge_subcommand_writes_a_png_with_spec_dimensions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("gauge.png");
    write_gauge(&out);

    let img = image::open(&out).expect("open gauge");
    assert_eq!(img.width(), 200);
    assert_eq!(img.height(), 200);
}

#[test]
fn optimize_runs_end_to_end_on_an_ideal_scan() {
    let dir = tempfile::tempdir().expect("tempdir");
    let gauge = dir.path().join("gauge.png");
    let photo = dir.path().join("photo.png");
    write_gauge(&gauge);
    write_photo(&photo);

    let bw = dir.path().join("bw.png");
    let engrave = dir.path().join("engrave.png");
    let preview = dir.path().join("preview.png");
    let profile = dir.path().join("profile.json");

    // the rendered gauge doubles as its own scan: an ideal engraver
    engrave_tone()
        .args(["optimize", "50", "4", "4"])
        .arg(&gauge)
        .arg(&photo)
        .arg("--bw-out")
        .arg(&bw)
        .arg("--engrave-out")
        .arg(&engrave)
        .arg("--preview-out")
        .arg(&preview)
        .arg("--profile-out")
        .arg(&profile)
        .assert()
        .success();

    for out in [&bw, &engrave, &preview] {
        let img = image::open(out).expect("open output");
        assert_eq!(img.width(), 64);
        assert_eq!(img.height(), 48);
    }
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&profile).expect("read json"))
            .expect("parse json");
    assert_eq!(json["median_whiteness"], 255.0);
}

#[test]
fn simulate_writes_a_preview() {
    let dir = tempfile::tempdir().expect("tempdir");
    let gauge = dir.path().join("gauge.png");
    let photo = dir.path().join("photo.png");
    write_gauge(&gauge);
    write_photo(&photo);

    let out = dir.path().join("simulated.png");
    engrave_tone()
        .args(["simulate", "50", "4", "4"])
        .arg(&gauge)
        .arg(&photo)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    assert!(out.exists());
}

#[test]
fn unseparable_scan_fails_with_a_domain_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scan = dir.path().join("flat.png");
    let photo = dir.path().join("photo.png");
    image::RgbImage::from_pixel(200, 200, image::Rgb([250, 250, 250]))
        .save(&scan)
        .expect("save scan");
    write_photo(&photo);

    engrave_tone()
        .args(["simulate", "50", "4", "4"])
        .arg(&scan)
        .arg(&photo)
        .assert()
        .failure()
        .stderr(predicate::str::contains("separable"));
}

#[test]
fn mismatched_scan_dimensions_fail_fast() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scan = dir.path().join("small.png");
    let photo = dir.path().join("photo.png");
    image::RgbImage::from_pixel(10, 10, image::Rgb([255, 255, 255]))
        .save(&scan)
        .expect("save scan");
    write_photo(&photo);

    engrave_tone()
        .args(["simulate", "50", "4", "4"])
        .arg(&scan)
        .arg(&photo)
        .assert()
        .failure()
        .stderr(predicate::str::contains("200x200"));
}
