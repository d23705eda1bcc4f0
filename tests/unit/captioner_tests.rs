/*!
 * Tests for image captioning
 */

use anyhow::Result;
use image::{ColorType, GrayImage};
use std::path::PathBuf;
use stillcast::app_config::{Config, DEFAULT_FONT_PATH};
use stillcast::captioner::{FontRenderer, ImageCaptioner, TextRenderer, SHADOW_LUMA, SHADOW_OFFSET, TEXT_LUMA};
use stillcast::errors::CaptionError;
use crate::common;
use crate::common::stubs::BlockRenderer;

fn captioner(output_dir: std::path::PathBuf) -> ImageCaptioner<BlockRenderer> {
    ImageCaptioner::new(BlockRenderer::default(), 0.85, output_dir)
}

/// Test a 1000x1000 image is saved as single-channel under the output dir
#[test]
fn test_caption_withSquareImage_shouldWriteGrayscaleProcessedImage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let image_path = common::create_test_image(temp_dir.path(), "photo.png", 1000, 1000)?;
    let output_dir = temp_dir.path().join("output");

    let mut captioner = captioner(output_dir.clone());
    let processed = captioner.caption(&image_path, "Hello")?;

    assert_eq!(processed, output_dir.join("photo_processed.png"));
    assert!(processed.is_file());

    let saved = image::open(&processed)?;
    assert_eq!(saved.color(), ColorType::L8);
    assert_eq!((saved.width(), saved.height()), (1000, 1000));

    // Untouched source image
    assert_eq!(image::open(&image_path)?.color(), ColorType::Rgb8);
    Ok(())
}

/// Test the caption ends up centered at the configured height
#[test]
fn test_place_withRoomBelow_shouldCenterAtPosition() {
    let mut captioner = captioner("output".into());

    let placement = captioner.place(1000, 1000, "Hi");

    assert_eq!(placement.bounds.width, 20);
    assert_eq!(placement.x, 490);
    assert_eq!(placement.y, 850);
}

/// Test a caption that would run off the bottom is pulled up
#[test]
fn test_place_withOverflow_shouldClampInsideImage() {
    let mut captioner = ImageCaptioner::new(BlockRenderer::default(), 0.95, "output".into());

    let placement = captioner.place(200, 100, "Hi");

    assert_eq!(placement.y, 80);
    assert!(placement.y + placement.bounds.height as i32 <= 100);
}

/// Test shadow and text are both drawn, text on top
#[test]
fn test_overlay_withGrayCanvas_shouldDrawShadowThenText() {
    let mut canvas = common::create_gray_image(1000, 1000, 128);
    let mut captioner = captioner("output".into());

    let placement = captioner.overlay(&mut canvas, "Hi");

    let (x, y) = (placement.x as u32, placement.y as u32);
    let shadow_x = (placement.x + SHADOW_OFFSET) as u32;
    let shadow_y = (placement.y + SHADOW_OFFSET) as u32;

    // Only the shadow reaches the top-left corner of the shadow block
    assert_eq!(canvas.get_pixel(shadow_x, shadow_y).0[0], SHADOW_LUMA);
    // The text covers the shadow where they overlap
    assert_eq!(canvas.get_pixel(x, y).0[0], TEXT_LUMA);
    assert_eq!(canvas.get_pixel(x + 19, y + 19).0[0], TEXT_LUMA);
    // Background elsewhere is untouched
    assert_eq!(canvas.get_pixel(5, 5).0[0], 128);
    assert_eq!(canvas.get_pixel(x + 25, y).0[0], 128);
}

/// Test a missing image is reported as such
#[test]
fn test_caption_withMissingImage_shouldReturnImageNotFound() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut captioner = captioner(temp_dir.path().join("output"));

    let result = captioner.caption(temp_dir.path().join("nope.png"), "Hello");

    assert!(matches!(result, Err(CaptionError::ImageNotFound(_))));
    assert!(!temp_dir.path().join("output").exists());
    Ok(())
}

/// Test a file that is not an image
#[test]
fn test_caption_withUndecodableImage_shouldReturnImageError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let bogus = common::create_test_file(temp_dir.path(), "photo.png", "not an image")?;
    let mut captioner = captioner(temp_dir.path().join("output"));

    let result = captioner.caption(&bogus, "Hello");

    assert!(matches!(result, Err(CaptionError::Image(_))));
    Ok(())
}

/// Test a missing font file
#[test]
fn test_font_renderer_withMissingFont_shouldReturnFontError() {
    let result = FontRenderer::from_file("/nonexistent/font.ttf", 140.0);
    assert!(matches!(result, Err(CaptionError::Font(_))));
}

fn shipped_font() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_FONT_PATH)
}

/// Bounding box (left, top, right, bottom) of the pixels matching `keep`
fn pixel_box(canvas: &GrayImage, keep: impl Fn(u8) -> bool) -> Option<(u32, u32, u32, u32)> {
    let mut found: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in canvas.enumerate_pixels() {
        if keep(pixel.0[0]) {
            found = Some(match found {
                None => (x, y, x, y),
                Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
            });
        }
    }
    found
}

/// Test the real font renderer places the caption at the configured height
#[test]
fn test_overlay_withShippedFont_shouldCenterInkAtPosition() -> Result<()> {
    let renderer = FontRenderer::from_file(shipped_font(), 140.0)?;
    let mut captioner = ImageCaptioner::new(renderer, 0.85, "output".into());
    let mut canvas = common::create_gray_image(1000, 1000, 128);

    let placement = captioner.overlay(&mut canvas, "Hello");

    assert!(placement.bounds.width > 0 && placement.bounds.height > 0);

    let (left, top, right, bottom) = pixel_box(&canvas, |luma| luma > 128).expect("white ink");
    assert!((847..=853).contains(&top), "ink top at {}", top);
    assert!(bottom < 1000);
    let center = (left + right) / 2;
    assert!((497..=503).contains(&center), "ink centered at {}", center);

    let (_, shadow_top, _, _) = pixel_box(&canvas, |luma| luma < 128).expect("shadow ink");
    assert!(shadow_top < top, "shadow top {} not above ink top {}", shadow_top, top);

    let white = canvas.pixels().filter(|p| p.0[0] == TEXT_LUMA).count();
    let black = canvas.pixels().filter(|p| p.0[0] == SHADOW_LUMA).count();
    assert!(white > 1000, "only {} white pixels", white);
    assert!(black > 0);
    Ok(())
}

/// Test the caption stays inside a short image with the real font
#[test]
fn test_overlay_withShippedFontOnShortImage_shouldKeepInkInside() -> Result<()> {
    let renderer = FontRenderer::from_file(shipped_font(), 140.0)?;
    let mut captioner = ImageCaptioner::new(renderer, 0.85, "output".into());
    let mut canvas = common::create_gray_image(1200, 300, 128);

    let placement = captioner.overlay(&mut canvas, "Hello");

    let (_, _, _, bottom) = pixel_box(&canvas, |luma| luma > 128).expect("white ink");
    assert!(bottom < 300);
    assert!(placement.y + placement.bounds.top + placement.bounds.height as i32 <= 300);
    Ok(())
}

/// Test the bundled copy measures like the shipped file
#[test]
fn test_bundled_font_withSameText_shouldMatchShippedFile() -> Result<()> {
    let mut bundled = FontRenderer::bundled(96.0)?;
    let mut shipped = FontRenderer::from_file(shipped_font(), 96.0)?;

    let bounds = bundled.measure("Good morning");
    assert_eq!(bounds, shipped.measure("Good morning"));
    assert!(bounds.width > bounds.height);
    Ok(())
}

/// Test only the default font path may fall back to the bundled font
#[test]
fn test_font_renderer_from_config_withCustomMissingFont_shouldReturnFontError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let custom = Config {
        font_path: temp_dir.path().join("missing.ttf"),
        ..Config::default()
    };
    assert!(matches!(FontRenderer::from_config(&custom), Err(CaptionError::Font(_))));

    let default = Config::default();
    assert!(FontRenderer::from_config(&default).is_ok());
    Ok(())
}
