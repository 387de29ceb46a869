//! Error handling and edge case testing
//!
//! Covers the failure kinds the pipeline reports: missing inputs, rejected
//! uploads, inference failures and malformed masks, plus the degenerate
//! mask fallback that is deliberately not an error.

use closet_cutout::{
    build_item_from_mask_files,
    error::{CutoutError, Result},
    layout::crop_to_content,
    CutoutProcessor, MockBackend, PipelineConfig, Style,
};
use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use ndarray::{ArrayD, IxDyn};
use std::error::Error as _;
use std::sync::Arc;
use tempfile::TempDir;

fn config() -> PipelineConfig {
    PipelineConfig::builder()
        .canvas_size(64, 64)
        .padding(4)
        .style(Style::None)
        .build()
        .unwrap()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(width, height, image::Rgb([1, 2, 3])));
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn test_missing_image_and_mask_fail_fast() -> Result<()> {
    let temp = TempDir::new()?;
    let image_path = temp.path().join("photo.png");
    let mask_path = temp.path().join("mask.png");
    let out_path = temp.path().join("out").join("item.png");

    let err = build_item_from_mask_files(&image_path, &mask_path, &out_path, false, &config()).unwrap_err();
    assert!(matches!(err, CutoutError::InputNotFound { kind: "Image", .. }));
    assert!(err.to_string().contains("photo.png"));

    RgbaImage::from_pixel(8, 8, Rgba([9, 9, 9, 255])).save(&image_path)?;
    let err = build_item_from_mask_files(&image_path, &mask_path, &out_path, false, &config()).unwrap_err();
    assert!(matches!(err, CutoutError::InputNotFound { kind: "Mask", .. }));

    // Nothing was written on failure
    assert!(!out_path.exists());
    Ok(())
}

#[test]
fn test_mask_files_produce_item() -> Result<()> {
    let temp = TempDir::new()?;
    let image_path = temp.path().join("photo.png");
    let mask_path = temp.path().join("mask.png");
    let out_path = temp.path().join("nested").join("item.png");

    RgbaImage::from_pixel(40, 30, Rgba([200, 100, 50, 255])).save(&image_path)?;
    GrayImage::from_fn(40, 30, |x, y| Luma([if (10..30).contains(&x) && (5..25).contains(&y) { 255 } else { 0 }]))
        .save(&mask_path)?;

    let written = build_item_from_mask_files(&image_path, &mask_path, &out_path, true, &config())?;
    assert_eq!(written, out_path);
    let item = image::open(&written)?.to_rgba8();
    assert_eq!(item.dimensions(), (64, 64));
    assert_eq!(item.get_pixel(32, 32), &Rgba([200, 100, 50, 255]));
    Ok(())
}

#[test]
fn test_missing_file_for_processor() {
    let processor = CutoutProcessor::new(Arc::new(MockBackend::default()), config()).unwrap();
    let err = processor.process_file("no/such/photo.jpg", None).unwrap_err();
    assert!(matches!(err, CutoutError::InputNotFound { kind: "Image", .. }));
}

#[test]
fn test_non_image_upload_is_rejected_before_inference() {
    let backend = Arc::new(MockBackend::default());
    let processor = CutoutProcessor::new(backend.clone(), config()).unwrap();

    let err = processor
        .process_upload("application/pdf", &png_bytes(8, 8), None)
        .unwrap_err();
    assert!(matches!(err, CutoutError::InvalidContentType(ref t) if t == "application/pdf"));
    assert_eq!(backend.calls(), 0);

    let png = processor.process_upload("image/png", &png_bytes(8, 8), None).unwrap();
    assert!(!png.is_empty());
    assert_eq!(backend.calls(), 1);
}

#[test]
fn test_undecodable_bytes() {
    let backend = Arc::new(MockBackend::default());
    let processor = CutoutProcessor::new(backend.clone(), config()).unwrap();
    let err = processor.remove_background(b"definitely not an image", None).unwrap_err();
    assert!(matches!(err, CutoutError::Image(_)));
    assert_eq!(backend.calls(), 0);
}

#[test]
fn test_inference_failure_keeps_cause() {
    let processor =
        CutoutProcessor::new(Arc::new(MockBackend::failing("session poisoned")), config()).unwrap();
    let err = processor.remove_background(&png_bytes(8, 8), None).unwrap_err();

    assert!(err.is_inference_failure());
    let source = err.source().expect("inference errors carry their cause");
    assert_eq!(source.to_string(), "session poisoned");
}

#[test]
fn test_malformed_backend_output_is_invalid_mask() {
    let multi_channel = MockBackend::from_fn(|input| {
        let (_, _, h, w) = input.dim();
        ArrayD::zeros(IxDyn(&[1, 3, h, w]))
    });
    let processor = CutoutProcessor::new(Arc::new(multi_channel), config()).unwrap();
    let err = processor.remove_background(&png_bytes(8, 8), None).unwrap_err();
    assert!(matches!(err, CutoutError::InvalidMask(_)));

    let not_a_number = MockBackend::from_fn(|input| {
        let (_, _, h, w) = input.dim();
        ArrayD::from_elem(IxDyn(&[1, 1, h, w]), f32::NAN)
    });
    let processor = CutoutProcessor::new(Arc::new(not_a_number), config()).unwrap();
    let err = processor.remove_background(&png_bytes(8, 8), None).unwrap_err();
    assert!(matches!(err, CutoutError::InvalidMask(_)));

    let empty = MockBackend::from_fn(|_| ArrayD::zeros(IxDyn(&[1, 1, 0, 0])));
    let processor = CutoutProcessor::new(Arc::new(empty), config()).unwrap();
    assert!(matches!(
        processor.remove_background(&png_bytes(8, 8), None),
        Err(CutoutError::InvalidMask(_))
    ));
}

#[test]
fn test_degenerate_mask_is_not_an_error() {
    let transparent = RgbaImage::from_pixel(30, 20, Rgba([255, 0, 0, 0]));
    assert_eq!(crop_to_content(&transparent, 0.05), transparent);

    let processor = CutoutProcessor::new(Arc::new(MockBackend::uniform(-1.0)), config()).unwrap();
    let result = processor.process_bytes(&png_bytes(30, 20), None).unwrap();
    assert!(result.image.pixels().all(|p| p.0[3] == 0));
    assert_eq!(result.foreground_ratio(), 0.0);
}

#[test]
fn test_config_validation_edge_cases() {
    let mut bad = PipelineConfig::default();
    bad.layout.margin_ratio = 1.0;
    assert!(matches!(bad.validate(), Err(CutoutError::InvalidConfig(_))));

    let err = PipelineConfig::builder()
        .canvas_size(64, 64)
        .padding(32)
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("padding"));

    let mut bad = PipelineConfig::default();
    bad.effects.ground_shadow.intensity = f32::NAN;
    assert!(bad.validate().is_err());

    let mut bad = PipelineConfig::default();
    bad.model_input_size = (0, 1200);
    assert!(CutoutProcessor::new(Arc::new(MockBackend::default()), bad).is_err());
}

#[test]
fn test_unknown_style_name_means_no_style() {
    assert_eq!(Style::from_name("Magazine"), Style::Magazine);
    assert_eq!(Style::from_name("neon"), Style::None);
    assert_eq!(Style::from_name(""), Style::None);
}
