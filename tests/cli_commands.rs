//! CLI integration tests
//!
//! Runs the built `closet-cutout` binary against small generated inputs.

#![cfg(feature = "cli")]

use image::{GrayImage, Luma, Rgb, RgbImage};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_closet-cutout"))
}

fn write_band_mask(path: &Path, from: u32, to: u32) {
    GrayImage::from_fn(20, 100, |_, y| Luma([if (from..=to).contains(&y) { 255 } else { 0 }]))
        .save(path)
        .expect("Failed to write mask");
}

#[test]
fn test_classify_prints_one_label_per_mask() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let top = temp_dir.path().join("a_top.png");
    let shoes = temp_dir.path().join("b_shoes.png");
    write_band_mask(&top, 5, 30);
    write_band_mask(&shoes, 85, 99);

    let output = cli()
        .arg("classify")
        .arg(&top)
        .arg(&shoes)
        .output()
        .expect("Failed to execute CLI");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let labels: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split('\t').nth(1))
        .collect();
    assert_eq!(labels, ["top", "shoes"]);
}

#[test]
fn test_extract_writes_item() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let photo = temp_dir.path().join("shirt.png");
    let mask = temp_dir.path().join("shirt_mask.png");
    let config = temp_dir.path().join("config.json");
    RgbImage::from_pixel(20, 100, Rgb([10, 200, 10]))
        .save(&photo)
        .expect("Failed to write photo");
    write_band_mask(&mask, 20, 60);
    std::fs::write(
        &config,
        r#"{ "layout": { "canvas_width": 80, "canvas_height": 80, "padding": 4, "margin_ratio": 0.05 } }"#,
    )
    .expect("Failed to write config");

    let output = cli()
        .arg("extract")
        .arg(&photo)
        .arg(&mask)
        .arg("--no-style")
        .arg("--config")
        .arg(&config)
        .output()
        .expect("Failed to execute CLI");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let item = image::open(temp_dir.path().join("shirt_item.png"))
        .expect("Item was not written")
        .to_rgba8();
    assert_eq!(item.dimensions(), (80, 80));
}

#[test]
fn test_extract_missing_mask_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let photo = temp_dir.path().join("shirt.png");
    RgbImage::new(4, 4).save(&photo).expect("Failed to write photo");

    let output = cli()
        .arg("extract")
        .arg(&photo)
        .arg(temp_dir.path().join("missing.png"))
        .output()
        .expect("Failed to execute CLI");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Mask not found"));
}

#[test]
fn test_remove_without_model_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let photo = temp_dir.path().join("shirt.png");
    RgbImage::new(4, 4).save(&photo).expect("Failed to write photo");

    let output = cli()
        .arg("remove")
        .arg(&photo)
        .arg("--model")
        .arg(temp_dir.path().join("absent.onnx"))
        .output()
        .expect("Failed to execute CLI");
    assert!(!output.status.success());
}
