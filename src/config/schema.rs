//! Configuration schema types for `spritesplit.toml`
//!
//! Every section and field is optional; missing values take the defaults
//! the splitter has always used.

use serde::{Deserialize, Serialize};

use crate::index::INDEX_FILENAME;
use crate::matcher::MatchOptions;
use crate::ocr::merge::DEFAULT_MERGE_DISTANCE;
use crate::ocr::{OcrBackendChoice, OcrOptions};
use crate::segment::SegmentOptions;

/// Sprite detection thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Pixels with alpha above this are opaque
    #[serde(default = "default_alpha_threshold")]
    pub alpha_threshold: u8,
    /// Minimum bounding-box area
    #[serde(default = "default_min_area")]
    pub min_area: u32,
    /// Minimum width and height
    #[serde(default = "default_min_side")]
    pub min_side: u32,
    /// Maximum ratio of long side to short side
    #[serde(default = "default_max_aspect")]
    pub max_aspect: f64,
    /// Minimum opaque pixels inside the bounding box
    #[serde(default = "default_min_opaque")]
    pub min_opaque: u32,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: default_alpha_threshold(),
            min_area: default_min_area(),
            min_side: default_min_side(),
            max_aspect: default_max_aspect(),
            min_opaque: default_min_opaque(),
        }
    }
}

fn default_alpha_threshold() -> u8 {
    10
}

fn default_min_area() -> u32 {
    100
}

fn default_min_side() -> u32 {
    8
}

fn default_max_aspect() -> f64 {
    8.0
}

fn default_min_opaque() -> u32 {
    50
}

/// OCR settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Backend to use
    #[serde(default)]
    pub backend: OcrBackendChoice,
    /// Detections below this confidence (0-1) are dropped
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Languages passed to the backend
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackendChoice::default(),
            min_confidence: default_min_confidence(),
            languages: default_languages(),
        }
    }
}

fn default_min_confidence() -> f64 {
    0.3
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

/// Label merging and matching distances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Words closer than this are merged into one label
    #[serde(default = "default_merge_distance")]
    pub merge_distance: i32,
    /// Row height used for reading order
    #[serde(default = "default_row_bucket")]
    pub row_bucket: u32,
    /// Labels this far or farther from a sprite are ignored
    #[serde(default = "default_max_label_distance")]
    pub max_label_distance: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            merge_distance: default_merge_distance(),
            row_bucket: default_row_bucket(),
            max_label_distance: default_max_label_distance(),
        }
    }
}

fn default_merge_distance() -> i32 {
    DEFAULT_MERGE_DISTANCE
}

fn default_row_bucket() -> u32 {
    50
}

fn default_max_label_distance() -> f64 {
    200.0
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Index filename inside the output directory
    #[serde(default = "default_index_file")]
    pub index_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { index_file: default_index_file() }
    }
}

fn default_index_file() -> String {
    INDEX_FILENAME.to_string()
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    #[serde(default)]
    pub segment: SegmentConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Config validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "ocr.min_confidence")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spritesplit.toml: '{}' {}", self.field, self.message)
    }
}

impl SplitConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: &str| {
            errors.push(ConfigValidationError {
                field: field.to_string(),
                message: message.to_string(),
            });
        };

        if self.segment.min_area == 0 {
            push("segment.min_area", "must be a positive integer");
        }
        if self.segment.min_side == 0 {
            push("segment.min_side", "must be a positive integer");
        }
        if !(self.segment.max_aspect >= 1.0) {
            push("segment.max_aspect", "must be at least 1.0");
        }

        if !(0.0..=1.0).contains(&self.ocr.min_confidence) {
            push("ocr.min_confidence", "must be between 0.0 and 1.0");
        }
        if self.ocr.backend != OcrBackendChoice::None && self.ocr.languages.is_empty() {
            push("ocr.languages", "must list at least one language");
        }

        if self.matching.merge_distance <= 0 {
            push("matching.merge_distance", "must be a positive integer");
        }
        if self.matching.row_bucket == 0 {
            push("matching.row_bucket", "must be a positive integer");
        }
        if !(self.matching.max_label_distance > 0.0) {
            push("matching.max_label_distance", "must be positive");
        }

        let index_file = &self.output.index_file;
        if index_file.is_empty() || index_file.contains(['/', '\\']) {
            push("output.index_file", "must be a plain filename");
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Segmentation options, including the reading-order row height.
    pub fn segment_options(&self) -> SegmentOptions {
        SegmentOptions {
            alpha_threshold: self.segment.alpha_threshold,
            min_area: self.segment.min_area,
            min_side: self.segment.min_side,
            max_aspect: self.segment.max_aspect,
            min_opaque: self.segment.min_opaque,
            row_bucket: self.matching.row_bucket,
        }
    }

    pub fn ocr_options(&self) -> OcrOptions {
        OcrOptions {
            min_confidence: self.ocr.min_confidence,
            languages: self.ocr.languages.clone(),
        }
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            row_bucket: self.matching.row_bucket,
            max_distance: self.matching.max_label_distance,
        }
    }
}
