//! Sprite PNG output and filename encoding
//!
//! Each sprite is written as `{name}_{seq}_{W}x{H}.png`: its normalized name,
//! its per-name sequence number and the canvas it was placed on.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};
use std::io;
use std::path::Path;

use crate::canvas::CanvasSize;
use crate::segment::Sprite;

/// Error type for output operations
#[derive(Debug)]
pub enum OutputError {
    /// IO error during file operations
    Io(io::Error),
    /// Image encoding error
    Image(image::ImageError),
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::Io(e) => write!(f, "IO error: {}", e),
            OutputError::Image(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Io(e) => Some(e),
            OutputError::Image(e) => Some(e),
        }
    }
}

impl From<io::Error> for OutputError {
    fn from(e: io::Error) -> Self {
        OutputError::Io(e)
    }
}

impl From<image::ImageError> for OutputError {
    fn from(e: image::ImageError) -> Self {
        OutputError::Image(e)
    }
}

/// The parts encoded in a sprite filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteFileName {
    pub name: String,
    pub seq: u32,
    pub canvas: CanvasSize,
}

/// Build the output filename for a sprite.
///
/// ```
/// use spritesplit::canvas::CanvasSize;
/// use spritesplit::output::sprite_filename;
///
/// assert_eq!(sprite_filename("bed", 2, CanvasSize::Landscape), "bed_2_64x32.png");
/// ```
pub fn sprite_filename(name: &str, seq: u32, canvas: CanvasSize) -> String {
    format!("{}_{}_{}.png", name, seq, canvas)
}

/// Split a sprite filename back into name, sequence and canvas.
///
/// Returns `None` unless the canvas is one of the known sizes and the
/// sequence is a positive integer.
pub fn parse_sprite_filename(filename: &str) -> Option<SpriteFileName> {
    let stem = filename.strip_suffix(".png")?;
    let mut parts = stem.rsplitn(3, '_');
    let size = parts.next()?;
    let seq = parts.next()?.parse::<u32>().ok().filter(|&n| n > 0)?;
    let name = parts.next()?;

    let (w, h) = size.split_once('x')?;
    let canvas = CanvasSize::from_dimensions(w.parse().ok()?, h.parse().ok()?)?;

    Some(SpriteFileName { name: name.to_string(), seq, canvas })
}

/// Place sprite pixels on a transparent canvas.
///
/// Sprites larger than the canvas in either dimension are scaled down
/// uniformly with a Lanczos filter on premultiplied alpha. The result is
/// centered with integer padding.
pub fn fit_to_canvas(pixels: &RgbaImage, canvas: CanvasSize) -> RgbaImage {
    let (canvas_w, canvas_h) = canvas.dimensions();
    let mut out = RgbaImage::new(canvas_w, canvas_h);

    let (w, h) = pixels.dimensions();
    if w == 0 || h == 0 {
        return out;
    }

    let scaled;
    let top = if w > canvas_w || h > canvas_h {
        let scale = (canvas_w as f64 / w as f64).min(canvas_h as f64 / h as f64);
        let new_w = ((w as f64 * scale) as u32).max(1);
        let new_h = ((h as f64 * scale) as u32).max(1);
        scaled = resize_premultiplied(pixels, new_w, new_h);
        &scaled
    } else {
        pixels
    };

    let (w, h) = top.dimensions();
    let pad_x = (canvas_w.saturating_sub(w) / 2) as i64;
    let pad_y = (canvas_h.saturating_sub(h) / 2) as i64;
    imageops::replace(&mut out, top, pad_x, pad_y);

    out
}

/// Lanczos resize with color weighted by alpha, so transparent pixels do
/// not darken soft edges.
fn resize_premultiplied(pixels: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let premultiplied: ImageBuffer<Rgba<f32>, Vec<f32>> =
        ImageBuffer::from_fn(pixels.width(), pixels.height(), |x, y| {
            let [r, g, b, a] = pixels.get_pixel(x, y).0.map(|c| c as f32 / 255.0);
            Rgba([r * a, g * a, b * a, a])
        });

    let scaled = imageops::resize(&premultiplied, width, height, FilterType::Lanczos3);

    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = scaled.get_pixel(x, y).0;
        if a <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        let channel = |c: f32| ((c / a).clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([channel(r), channel(g), channel(b), (a.clamp(0.0, 1.0) * 255.0).round() as u8])
    })
}

/// Save an RGBA image to a PNG file.
///
/// # Arguments
///
/// * `image` - The image to save
/// * `path` - The output file path
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    image.save(path)?;
    Ok(())
}

/// Render a sprite onto its canvas and write it into `out_dir`.
///
/// `seq` is the 1-based occurrence of `name`, already advanced by the caller.
/// Returns the filename (without directory) for the index.
pub fn render_sprite(
    sprite: &Sprite,
    name: &str,
    seq: u32,
    out_dir: &Path,
) -> Result<String, OutputError> {
    let filename = sprite_filename(name, seq, sprite.canvas);
    let image = fit_to_canvas(&sprite.pixels, sprite.canvas);
    save_png(&image, &out_dir.join(&filename))?;
    Ok(filename)
}
