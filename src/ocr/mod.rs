//! OCR label extraction
//!
//! Labels are text fragments read off the reference image together with their
//! center position. The OCR engine itself is an external program; this module
//! only decides which engine to use, runs it, and normalizes what it returns.
//!
//! Backend selection happens once, when the [`LabelExtractor`] is built:
//!
//! ```ignore
//! let extractor = LabelExtractor::select(OcrBackendChoice::Auto, &OcrOptions::default());
//! let labels = extractor.extract(Path::new("origin.png"));
//! ```

mod easyocr;
pub mod merge;
mod tesseract;

pub use easyocr::{parse_easyocr_output, EasyOcrProvider};
pub use merge::merge_labels;
pub use tesseract::{parse_tesseract_tsv, TesseractProvider};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// A text fragment and its center on the reference image.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub x: i32,
    pub y: i32,
    /// Confidence as a 0-1 fraction
    pub confidence: f64,
}

impl Label {
    pub fn new(text: impl Into<String>, x: i32, y: i32, confidence: f64) -> Self {
        Self { text: text.into(), x, y, confidence }
    }
}

/// Error from an OCR backend
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OcrError {
    /// Backend process could not be started
    #[error("Failed to run {backend}: {source}")]
    Spawn {
        backend: &'static str,
        #[source]
        source: std::io::Error,
    },
    /// Backend exited unsuccessfully
    #[error("{backend} exited with {status}: {stderr}")]
    Failed { backend: &'static str, status: String, stderr: String },
}

/// Which OCR backend to use.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendChoice {
    /// First available of easyocr, tesseract
    #[default]
    Auto,
    #[value(name = "easyocr")]
    EasyOcr,
    Tesseract,
    /// Skip OCR; names follow prompt order
    None,
}

impl fmt::Display for OcrBackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OcrBackendChoice::Auto => "auto",
            OcrBackendChoice::EasyOcr => "easyocr",
            OcrBackendChoice::Tesseract => "tesseract",
            OcrBackendChoice::None => "none",
        };
        f.write_str(s)
    }
}

/// Settings shared by every backend.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOptions {
    /// Detections below this (0-1) are dropped
    pub min_confidence: f64,
    /// Language codes, two-letter form (`en`)
    pub languages: Vec<String>,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self { min_confidence: 0.3, languages: vec!["en".to_string()] }
    }
}

/// A source of raw labels for an image.
///
/// Implementations report confidence as a 0-1 fraction; callers filter.
pub trait LabelProvider {
    /// Short backend name for reports
    fn name(&self) -> &'static str;

    /// Read labels off an image.
    fn labels(&self, image: &Path) -> Result<Vec<Label>, OcrError>;
}

/// Provider used when no OCR engine is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOcr;

impl LabelProvider for NoOcr {
    fn name(&self) -> &'static str {
        "none"
    }

    fn labels(&self, _image: &Path) -> Result<Vec<Label>, OcrError> {
        Ok(Vec::new())
    }
}

/// Native confidence scale of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceScale {
    /// Already 0-1
    Fraction,
    /// 0-100
    Percent,
}

impl ConfidenceScale {
    /// Convert a native confidence to a 0-1 fraction.
    pub fn normalize(self, raw: f64) -> f64 {
        match self {
            ConfidenceScale::Fraction => raw,
            ConfidenceScale::Percent => raw / 100.0,
        }
    }
}

/// Wraps the selected provider and applies the confidence floor.
pub struct LabelExtractor {
    provider: Box<dyn LabelProvider>,
    min_confidence: f64,
}

impl fmt::Debug for LabelExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelExtractor")
            .field("provider", &self.provider.name())
            .field("min_confidence", &self.min_confidence)
            .finish()
    }
}

impl LabelExtractor {
    /// Use a specific provider.
    pub fn new(provider: Box<dyn LabelProvider>, min_confidence: f64) -> Self {
        Self { provider, min_confidence }
    }

    /// Probe for a backend according to `choice`.
    ///
    /// `Auto` tries easyocr, then tesseract. An explicitly requested backend
    /// that is not installed degrades to no OCR.
    pub fn select(choice: OcrBackendChoice, options: &OcrOptions) -> Self {
        let provider: Box<dyn LabelProvider> = match choice {
            OcrBackendChoice::None => Box::new(NoOcr),
            OcrBackendChoice::EasyOcr => match EasyOcrProvider::locate(&options.languages) {
                Some(p) => Box::new(p),
                None => {
                    tracing::warn!("easyocr requested but not found on PATH");
                    Box::new(NoOcr)
                }
            },
            OcrBackendChoice::Tesseract => match TesseractProvider::locate(&options.languages) {
                Some(p) => Box::new(p),
                None => {
                    tracing::warn!("tesseract requested but not found on PATH");
                    Box::new(NoOcr)
                }
            },
            OcrBackendChoice::Auto => {
                if let Some(p) = EasyOcrProvider::locate(&options.languages) {
                    Box::new(p)
                } else if let Some(p) = TesseractProvider::locate(&options.languages) {
                    Box::new(p)
                } else {
                    Box::new(NoOcr)
                }
            }
        };

        tracing::debug!(backend = provider.name(), "selected OCR backend");
        Self::new(provider, options.min_confidence)
    }

    /// Name of the provider in use.
    pub fn backend(&self) -> &'static str {
        self.provider.name()
    }

    /// Whether a real OCR engine is behind this extractor.
    pub fn is_available(&self) -> bool {
        self.provider.name() != NoOcr.name()
    }

    /// Extract labels at or above the confidence floor.
    ///
    /// Backend failures are not errors here: they are logged and produce no
    /// labels, which sends naming down the prompt-order path.
    pub fn extract(&self, image: &Path) -> Vec<Label> {
        self.try_extract(image).unwrap_or_else(|e| {
            tracing::warn!(backend = self.provider.name(), error = %e, "OCR failed");
            Vec::new()
        })
    }

    /// Like [`extract`](Self::extract) but surfaces backend errors.
    pub fn try_extract(&self, image: &Path) -> Result<Vec<Label>, OcrError> {
        Ok(self
            .provider
            .labels(image)?
            .into_iter()
            .filter(|l| l.confidence >= self.min_confidence && !l.text.is_empty())
            .collect())
    }
}
