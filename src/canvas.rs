//! Output canvas classification by aspect ratio

use std::fmt;

/// One of the fixed output frames a sprite is normalized onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanvasSize {
    /// 96x32, very wide sprites
    Wide,
    /// 64x32
    Landscape,
    /// 32x32
    Square,
    /// 32x64
    Portrait,
    /// 32x96, very tall sprites
    Tall,
}

impl CanvasSize {
    /// All canvases, widest first.
    pub const ALL: [CanvasSize; 5] = [
        CanvasSize::Wide,
        CanvasSize::Landscape,
        CanvasSize::Square,
        CanvasSize::Portrait,
        CanvasSize::Tall,
    ];

    /// Canvas dimensions as (width, height).
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            CanvasSize::Wide => (96, 32),
            CanvasSize::Landscape => (64, 32),
            CanvasSize::Square => (32, 32),
            CanvasSize::Portrait => (32, 64),
            CanvasSize::Tall => (32, 96),
        }
    }

    pub fn width(self) -> u32 {
        self.dimensions().0
    }

    pub fn height(self) -> u32 {
        self.dimensions().1
    }

    /// Look up a canvas from its dimensions.
    pub fn from_dimensions(width: u32, height: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.dimensions() == (width, height))
    }
}

impl fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.dimensions();
        write!(f, "{}x{}", w, h)
    }
}

/// Pick the canvas for a sprite of the given bounding size.
///
/// Buckets are checked widest first and each lower bound is inclusive, so a
/// ratio of exactly 2.5 lands on the 96x32 canvas. A zero height counts as
/// ratio 1.
pub fn classify(width: u32, height: u32) -> CanvasSize {
    let ratio = if height > 0 { width as f64 / height as f64 } else { 1.0 };

    if ratio >= 2.5 {
        CanvasSize::Wide
    } else if ratio >= 1.5 {
        CanvasSize::Landscape
    } else if ratio >= 0.67 {
        CanvasSize::Square
    } else if ratio >= 0.4 {
        CanvasSize::Portrait
    } else {
        CanvasSize::Tall
    }
}
