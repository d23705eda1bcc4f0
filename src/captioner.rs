/*!
 * Image captioning.
 *
 * Loads a still image, converts it to 8-bit grayscale and draws the caption
 * near the bottom of the frame: first a black shadow offset by (-2, -2),
 * then the white text itself.
 *
 * Glyph layout and rasterization sit behind the `TextRenderer` trait;
 * `FontRenderer` implements it with `fontdue`.
 */

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use fontdue::layout::{CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};
use image::GrayImage;
use log::{debug, info};

use crate::app_config::{Config, DEFAULT_FONT_PATH};
use crate::errors::CaptionError;
use crate::file_utils::FileManager;

/// Shadow offset applied on both axes
pub const SHADOW_OFFSET: i32 = -2;

/// Shadow luma
pub const SHADOW_LUMA: u8 = 0;

/// Caption luma
pub const TEXT_LUMA: u8 = 255;

static BUNDLED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans-Bold.ttf");

/// Ink extent of a piece of text relative to its drawing origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextBounds {
    /// Horizontal offset of the leftmost ink from the origin
    pub left: i32,
    /// Vertical offset of the topmost ink from the origin
    pub top: i32,
    /// Ink width in pixels
    pub width: u32,
    /// Ink height in pixels
    pub height: u32,
}

/// Where the caption ended up on the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionPlacement {
    /// Drawing origin x of the main text
    pub x: i32,
    /// Drawing origin y of the main text
    pub y: i32,
    /// Measured bounds of the text
    pub bounds: TextBounds,
}

/// Measures and draws text onto grayscale images
pub trait TextRenderer {
    /// Measure the ink bounds of `text`
    fn measure(&mut self, text: &str) -> TextBounds;

    /// Draw `text` with its origin at (`x`, `y`), blending in `luma`
    fn draw(&mut self, canvas: &mut GrayImage, x: i32, y: i32, text: &str, luma: u8);
}

impl<T: TextRenderer + ?Sized> TextRenderer for Box<T> {
    fn measure(&mut self, text: &str) -> TextBounds {
        (**self).measure(text)
    }

    fn draw(&mut self, canvas: &mut GrayImage, x: i32, y: i32, text: &str, luma: u8) {
        (**self).draw(canvas, x, y, text, luma)
    }
}

struct GlyphBitmap {
    width: usize,
    height: usize,
    bitmap: Vec<u8>,
}

/// `fontdue`-backed text renderer
pub struct FontRenderer {
    font: Font,
    font_size: f32,
    glyph_cache: HashMap<GlyphRasterConfig, GlyphBitmap>,
}

impl FontRenderer {
    /// Load a TrueType/OpenType font from disk
    pub fn from_file<P: AsRef<Path>>(font_path: P, font_size: f32) -> Result<Self, CaptionError> {
        let font_path = font_path.as_ref();
        let font_bytes = fs::read(font_path).map_err(|e| {
            CaptionError::Font(format!("failed to read font {}: {}", font_path.display(), e))
        })?;
        Self::from_bytes(font_bytes, font_size)
            .map_err(|e| CaptionError::Font(format!("{}: {}", font_path.display(), e)))
    }

    /// Load the configured font. The default path falls back to the font
    /// bundled into the binary when it does not exist on disk.
    pub fn from_config(config: &Config) -> Result<Self, CaptionError> {
        let font_path = config.font_path.as_path();
        if font_path == Path::new(DEFAULT_FONT_PATH) && !font_path.is_file() {
            debug!("{} not found, using the bundled font", font_path.display());
            return Self::bundled(config.font_size);
        }
        Self::from_file(font_path, config.font_size)
    }

    /// DejaVu Sans Bold, compiled into the binary
    pub fn bundled(font_size: f32) -> Result<Self, CaptionError> {
        Self::from_bytes(BUNDLED_FONT.to_vec(), font_size)
    }

    /// Parse a font from memory
    pub fn from_bytes(font_bytes: Vec<u8>, font_size: f32) -> Result<Self, CaptionError> {
        let font = Font::from_bytes(font_bytes, FontSettings::default())
            .map_err(|e| CaptionError::Font(format!("failed to parse font: {}", e)))?;

        Ok(Self {
            font,
            font_size,
            glyph_cache: HashMap::new(),
        })
    }

    fn layout(&self, x: f32, y: f32, text: &str) -> Layout {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x,
            y,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(text, self.font_size, 0));
        layout
    }
}

impl TextRenderer for FontRenderer {
    fn measure(&mut self, text: &str) -> TextBounds {
        let layout = self.layout(0.0, 0.0, text);

        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let gx = glyph.x.round() as i32;
            let gy = glyph.y.round() as i32;
            min_x = min_x.min(gx);
            min_y = min_y.min(gy);
            max_x = max_x.max(gx + glyph.width as i32);
            max_y = max_y.max(gy + glyph.height as i32);
        }

        if min_x > max_x {
            return TextBounds::default();
        }

        TextBounds {
            left: min_x,
            top: min_y,
            width: (max_x - min_x) as u32,
            height: (max_y - min_y) as u32,
        }
    }

    fn draw(&mut self, canvas: &mut GrayImage, x: i32, y: i32, text: &str, luma: u8) {
        let layout = self.layout(x as f32, y as f32, text);

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let font = &self.font;
            let glyph_bitmap = self.glyph_cache.entry(glyph.key).or_insert_with(|| {
                let (_, bitmap) = font.rasterize_config(glyph.key);
                GlyphBitmap {
                    width: glyph.width,
                    height: glyph.height,
                    bitmap,
                }
            });
            blend_glyph(
                canvas,
                glyph.x.round() as i32,
                glyph.y.round() as i32,
                glyph_bitmap,
                luma,
            );
        }
    }
}

fn blend_glyph(canvas: &mut GrayImage, x: i32, y: i32, glyph: &GlyphBitmap, luma: u8) {
    let (canvas_width, canvas_height) = canvas.dimensions();

    for row in 0..glyph.height {
        let py = y + row as i32;
        if py < 0 || py >= canvas_height as i32 {
            continue;
        }

        for col in 0..glyph.width {
            let px = x + col as i32;
            if px < 0 || px >= canvas_width as i32 {
                continue;
            }
            let coverage = glyph.bitmap[row * glyph.width + col];
            if coverage == 0 {
                continue;
            }
            let pixel = canvas.get_pixel_mut(px as u32, py as u32);
            pixel.0[0] = blend_luma(pixel.0[0], luma, coverage);
        }
    }
}

/// Alpha-blend `src` over `dst` with `coverage` as alpha
pub fn blend_luma(dst: u8, src: u8, coverage: u8) -> u8 {
    let alpha = u16::from(coverage);
    let inv_alpha = 255 - alpha;
    ((u16::from(src) * alpha + u16::from(dst) * inv_alpha + 127) / 255) as u8
}

/// Image captioner
pub struct ImageCaptioner<R: TextRenderer> {
    renderer: R,
    /// Vertical position of the caption's ink top as a fraction of height
    position: f32,
    output_dir: PathBuf,
}

impl<R: TextRenderer> ImageCaptioner<R> {
    /// Create a captioner with an explicit renderer
    pub fn new(renderer: R, position: f32, output_dir: PathBuf) -> Self {
        Self {
            renderer,
            position,
            output_dir,
        }
    }

    /// Give back the renderer
    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Output path the captioner writes for `image_path`
    pub fn output_path_for<P: AsRef<Path>>(&self, image_path: P) -> PathBuf {
        FileManager::processed_image_path(image_path, &self.output_dir)
    }

    /// Caption the image at `image_path` and save it under the output directory.
    ///
    /// Returns the path of the processed image.
    pub fn caption<P: AsRef<Path>>(&mut self, image_path: P, text: &str) -> Result<PathBuf, CaptionError> {
        let image_path = image_path.as_ref();
        if !image_path.is_file() {
            return Err(CaptionError::ImageNotFound(image_path.to_path_buf()));
        }

        let mut canvas = image::open(image_path)?.to_luma8();
        let placement = self.overlay(&mut canvas, text);
        debug!(
            "Caption placed at ({}, {}) with {}x{} ink on {}x{} image",
            placement.x,
            placement.y,
            placement.bounds.width,
            placement.bounds.height,
            canvas.width(),
            canvas.height()
        );

        fs::create_dir_all(&self.output_dir)?;
        let output_path = self.output_path_for(image_path);
        canvas.save(&output_path)?;

        info!("Processed image saved as: {}", output_path.display());
        Ok(output_path)
    }

    /// Draw the shadowed caption onto `canvas`
    pub fn overlay(&mut self, canvas: &mut GrayImage, text: &str) -> CaptionPlacement {
        let placement = self.place(canvas.width(), canvas.height(), text);

        self.renderer.draw(
            canvas,
            placement.x + SHADOW_OFFSET,
            placement.y + SHADOW_OFFSET,
            text,
            SHADOW_LUMA,
        );
        self.renderer.draw(canvas, placement.x, placement.y, text, TEXT_LUMA);

        placement
    }

    /// Compute the caption origin: ink centered horizontally, ink top at
    /// `position` of the height, pulled up if it would run off the bottom.
    pub fn place(&mut self, image_width: u32, image_height: u32, text: &str) -> CaptionPlacement {
        let bounds = self.renderer.measure(text);

        let ink_x = (image_width as i32 - bounds.width as i32) / 2;
        let mut ink_y = (image_height as f32 * self.position) as i32;
        let overflow = ink_y + bounds.height as i32 - image_height as i32;
        if overflow > 0 {
            ink_y = (ink_y - overflow).max(0);
        }

        CaptionPlacement {
            x: ink_x - bounds.left,
            y: ink_y - bounds.top,
            bounds,
        }
    }
}
