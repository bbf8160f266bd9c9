//! Sprite segmentation for transparent sprite sheets.
//!
//! A sheet is split into its external connected opaque regions. Each region's
//! bounding box becomes a candidate sprite, and candidates that look like
//! anti-aliasing specks or stray text glyphs are filtered out.

use image::{imageops, RgbaImage};
use std::collections::VecDeque;
use std::path::Path;
use thiserror::Error;

use crate::canvas::{classify, CanvasSize};

/// Error loading a sheet for segmentation
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SegmentError {
    /// Image could not be opened or decoded
    #[error("Failed to load image '{path}': {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Thresholds for the opacity mask and the validity filter.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentOptions {
    /// Pixels with alpha strictly above this are opaque
    pub alpha_threshold: u8,
    /// Minimum bounding-box area in px²
    pub min_area: u32,
    /// Minimum width and height
    pub min_side: u32,
    /// Maximum w/h (and minimum of its inverse)
    pub max_aspect: f64,
    /// Minimum opaque pixels inside the bounding box
    pub min_opaque: u32,
    /// Row height used to put sprites in reading order
    pub row_bucket: u32,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            alpha_threshold: 10,
            min_area: 100,
            min_side: 8,
            max_aspect: 8.0,
            min_opaque: 50,
            row_bucket: 50,
        }
    }
}

/// A sprite cut out of a sheet.
#[derive(Debug, Clone)]
pub struct Sprite {
    /// Pixels of the bounding box, copied from the sheet
    pub pixels: RgbaImage,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub center_x: u32,
    pub center_y: u32,
    /// Output canvas chosen from the aspect ratio
    pub canvas: CanvasSize,
    /// Opaque pixels inside the bounding box
    pub opaque_pixels: u32,
}

impl Sprite {
    /// Reading-order key: row bucket of `row_bucket` pixels, then x.
    pub fn reading_key(&self, row_bucket: u32) -> (u32, u32) {
        (self.y / row_bucket.max(1), self.x)
    }
}

/// Bounding box of one connected component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Component {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    external: bool,
}

impl Component {
    fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// Check a candidate against the validity filter.
pub fn is_valid_sprite(w: u32, h: u32, opaque_pixels: u32, options: &SegmentOptions) -> bool {
    if w * h < options.min_area {
        return false;
    }
    if w < options.min_side || h < options.min_side {
        return false;
    }

    let ratio = if h > 0 { w as f64 / h as f64 } else { f64::INFINITY };
    if ratio > options.max_aspect || ratio < 1.0 / options.max_aspect {
        return false;
    }

    opaque_pixels >= options.min_opaque
}

/// Open an image file and segment it.
///
/// Images without an alpha channel yield no sprites.
pub fn segment_file(path: &Path, options: &SegmentOptions) -> Result<Vec<Sprite>, SegmentError> {
    let img = image::open(path)
        .map_err(|source| SegmentError::Image { path: path.display().to_string(), source })?;

    if !img.color().has_alpha() {
        tracing::warn!(path = %path.display(), "image has no alpha channel, no sprites extracted");
        return Ok(Vec::new());
    }

    Ok(segment_image(&img.to_rgba8(), options))
}

/// Split an RGBA sheet into sprites.
///
/// Sprites come back in reading order: rows of `row_bucket` pixels top to
/// bottom, left to right within a row. Components nested inside a hole of
/// another component are not external and are skipped. A sheet without any
/// transparent pixel has no background and yields nothing.
pub fn segment_image(image: &RgbaImage, options: &SegmentOptions) -> Vec<Sprite> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mask: Vec<bool> = image.pixels().map(|p| p.0[3] > options.alpha_threshold).collect();
    if mask.iter().all(|&opaque| opaque) {
        tracing::warn!(width, height, "sheet has no transparent pixels, no sprites extracted");
        return Vec::new();
    }

    let outside = outer_background(&mask, width, height);
    let components = find_components(&mask, &outside, width, height);

    let mut sprites = Vec::new();
    for comp in components.into_iter().filter(|c| c.external) {
        let (w, h) = (comp.width(), comp.height());
        let opaque = count_opaque(&mask, width, comp.min_x, comp.min_y, w, h);

        if !is_valid_sprite(w, h, opaque, options) {
            tracing::debug!(x = comp.min_x, y = comp.min_y, w, h, opaque, "rejected component");
            continue;
        }

        sprites.push(Sprite {
            pixels: imageops::crop_imm(image, comp.min_x, comp.min_y, w, h).to_image(),
            x: comp.min_x,
            y: comp.min_y,
            w,
            h,
            center_x: comp.min_x + w / 2,
            center_y: comp.min_y + h / 2,
            canvas: classify(w, h),
            opaque_pixels: opaque,
        });
    }

    sprites.sort_by_key(|s| s.reading_key(options.row_bucket));
    sprites
}

/// Flood the transparent background reachable from the image border.
///
/// Uses 4-connectivity, the dual of the 8-connected foreground, so a
/// diagonal-closed ring still encloses its hole.
fn outer_background(mask: &[bool], width: u32, height: u32) -> Vec<bool> {
    let idx = |x: u32, y: u32| (y * width + x) as usize;
    let mut outside = vec![false; mask.len()];
    let mut queue = VecDeque::new();

    let seed = |x: u32, y: u32, outside: &mut Vec<bool>, queue: &mut VecDeque<(u32, u32)>| {
        let i = idx(x, y);
        if !mask[i] && !outside[i] {
            outside[i] = true;
            queue.push_back((x, y));
        }
    };

    for x in 0..width {
        seed(x, 0, &mut outside, &mut queue);
        seed(x, height - 1, &mut outside, &mut queue);
    }
    for y in 0..height {
        seed(0, y, &mut outside, &mut queue);
        seed(width - 1, y, &mut outside, &mut queue);
    }

    while let Some((x, y)) = queue.pop_front() {
        for (nx, ny) in neighbors4(x, y, width, height) {
            let i = idx(nx, ny);
            if !mask[i] && !outside[i] {
                outside[i] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    outside
}

/// Label 8-connected opaque components in raster order.
fn find_components(mask: &[bool], outside: &[bool], width: u32, height: u32) -> Vec<Component> {
    let idx = |x: u32, y: u32| (y * width + x) as usize;
    let mut visited = vec![false; mask.len()];
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for sy in 0..height {
        for sx in 0..width {
            let start = idx(sx, sy);
            if !mask[start] || visited[start] {
                continue;
            }

            let mut comp =
                Component { min_x: sx, min_y: sy, max_x: sx, max_y: sy, external: false };
            visited[start] = true;
            queue.push_back((sx, sy));

            while let Some((x, y)) = queue.pop_front() {
                comp.min_x = comp.min_x.min(x);
                comp.min_y = comp.min_y.min(y);
                comp.max_x = comp.max_x.max(x);
                comp.max_y = comp.max_y.max(y);

                if !comp.external {
                    let on_border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                    comp.external = on_border
                        || neighbors4(x, y, width, height).any(|(nx, ny)| outside[idx(nx, ny)]);
                }

                for (nx, ny) in neighbors8(x, y, width, height) {
                    let i = idx(nx, ny);
                    if mask[i] && !visited[i] {
                        visited[i] = true;
                        queue.push_back((nx, ny));
                    }
                }
            }

            components.push(comp);
        }
    }

    components
}

fn count_opaque(mask: &[bool], width: u32, x: u32, y: u32, w: u32, h: u32) -> u32 {
    let mut count = 0;
    for row in y..y + h {
        let start = (row * width + x) as usize;
        count += mask[start..start + w as usize].iter().filter(|&&m| m).count() as u32;
    }
    count
}

fn neighbors4(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    const OFFSETS: [(i64, i64); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
    offset_neighbors(x, y, width, height, &OFFSETS)
}

fn neighbors8(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    const OFFSETS: [(i64, i64); 8] =
        [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)];
    offset_neighbors(x, y, width, height, &OFFSETS)
}

fn offset_neighbors(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    offsets: &'static [(i64, i64)],
) -> impl Iterator<Item = (u32, u32)> {
    offsets.iter().filter_map(move |&(dx, dy)| {
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        if nx >= 0 && ny >= 0 && nx < width as i64 && ny < height as i64 {
            Some((nx as u32, ny as u32))
        } else {
            None
        }
    })
}
