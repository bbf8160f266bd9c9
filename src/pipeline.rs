//! Batch orchestration.
//!
//! One batch reads a prompt, a labeled reference image and a composite
//! image, cuts the composite into named sprites and appends them to the
//! output directory's index. Stages run in a fixed order:
//!
//! 1. parse the prompt
//! 2. read and merge labels from the reference image
//! 3. segment the composite
//! 4. name the sprites
//! 5. write the sprites and the updated index
//!
//! Missing or undecodable inputs abort before anything is written. A
//! malformed index aborts before any sprite is written. If a sprite or the
//! index fails to write, the sprites already written by the batch are
//! removed again so files and index stay in step.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::SplitConfig;
use crate::index::{today, IndexError, SourceRecord, SpriteIndex, INDEX_FILENAME};
use crate::matcher::{match_names, Evidence, MatchOptions};
use crate::ocr::merge::DEFAULT_MERGE_DISTANCE;
use crate::ocr::{merge_labels, LabelExtractor};
use crate::output::{render_sprite, OutputError};
use crate::progress::{BatchEvent, ProgressReporter, STAGE_COUNT};
use crate::prompt::{read_prompt, PromptError};
use crate::segment::{segment_file, SegmentError, SegmentOptions};

/// Error that aborts a batch.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BatchError {
    /// A required input file does not exist
    #[error("{kind} file not found: {}", path.display())]
    MissingInput { kind: &'static str, path: PathBuf },
    /// An input image exists but cannot be decoded
    #[error("{kind} image is unreadable: {}: {source}", path.display())]
    UnreadableInput {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Segment(#[from] SegmentError),
    #[error("Failed to write sprite: {0}")]
    Output(#[from] OutputError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Files making up one batch.
#[derive(Debug, Clone)]
pub struct BatchInputs {
    /// Prompt listing the item names
    pub prompt: PathBuf,
    /// Reference image with text labels (OCR input)
    pub origin: PathBuf,
    /// Composite image on a transparent background (segmentation input)
    pub renew: PathBuf,
    /// Output directory holding sprites and the index
    pub output: PathBuf,
}

impl BatchInputs {
    /// Batch name: the directory the prompt lives in.
    pub fn batch_name(&self) -> String {
        self.prompt
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Path of the index inside the output directory.
    pub fn index_path(&self, options: &BatchOptions) -> PathBuf {
        self.output.join(&options.index_file)
    }

    /// Every input must exist, and both images must have a readable header.
    fn check_inputs(&self) -> Result<(), BatchError> {
        for (kind, path) in [("Prompt", &self.prompt), ("Origin", &self.origin), ("Renew", &self.renew)]
        {
            if !path.is_file() {
                return Err(BatchError::MissingInput { kind, path: path.clone() });
            }
        }
        for (kind, path) in [("Origin", &self.origin), ("Renew", &self.renew)] {
            image::image_dimensions(path).map_err(|source| BatchError::UnreadableInput {
                kind,
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Tunables for a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    pub segment: SegmentOptions,
    pub matching: MatchOptions,
    pub merge_distance: i32,
    pub index_file: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            segment: SegmentOptions::default(),
            matching: MatchOptions::default(),
            merge_distance: DEFAULT_MERGE_DISTANCE,
            index_file: INDEX_FILENAME.to_string(),
        }
    }
}

impl BatchOptions {
    pub fn from_config(config: &SplitConfig) -> Self {
        Self {
            segment: config.segment_options(),
            matching: config.match_options(),
            merge_distance: config.matching.merge_distance,
            index_file: config.output.index_file.clone(),
        }
    }
}

/// A sprite written by the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSprite {
    pub filename: String,
    pub name: String,
    pub evidence: Evidence,
}

/// Outcome of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub batch: String,
    /// OCR backend used (`none` if OCR was skipped)
    pub backend: &'static str,
    /// Labels after merging
    pub labels: usize,
    /// Sprites written, in render order
    pub saved: Vec<SavedSprite>,
    /// Files in the index after the batch
    pub total_files: usize,
    pub index_path: PathBuf,
}

impl BatchReport {
    pub fn new_files(&self) -> impl Iterator<Item = &str> {
        self.saved.iter().map(|s| s.filename.as_str())
    }
}

fn stage(reporter: &dyn ProgressReporter, stage: usize, name: &str) {
    reporter.report(BatchEvent::StageStarted {
        stage,
        total: STAGE_COUNT,
        name: name.to_string(),
    });
}

/// Run one batch.
pub fn run_batch(
    inputs: &BatchInputs,
    options: &BatchOptions,
    extractor: &LabelExtractor,
    reporter: &dyn ProgressReporter,
) -> Result<BatchReport, BatchError> {
    let start = Instant::now();

    inputs.check_inputs()?;
    let batch = inputs.batch_name();
    tracing::info!(batch = %batch, "starting batch");

    stage(reporter, 1, "Parsing prompt");
    let prompt_names = read_prompt(&inputs.prompt)?;
    reporter.report(BatchEvent::PromptParsed { names: prompt_names.len() });

    stage(reporter, 2, "Reading labels");
    let raw = if extractor.is_available() {
        extractor.extract(&inputs.origin)
    } else {
        Vec::new()
    };
    let labels = merge_labels(&raw, options.merge_distance);
    reporter.report(BatchEvent::LabelsExtracted {
        backend: extractor.backend().to_string(),
        raw: raw.len(),
        merged: labels.len(),
    });

    stage(reporter, 3, "Segmenting sprites");
    let sprites = segment_file(&inputs.renew, &options.segment)?;
    reporter.report(BatchEvent::SpritesSegmented { count: sprites.len() });

    stage(reporter, 4, "Matching names");
    let mut named = match_names(&labels, sprites, &prompt_names, &options.matching);
    reporter.report(BatchEvent::SpritesMatched { count: named.len() });

    stage(reporter, 5, "Writing sprites");
    let index_path = inputs.index_path(options);
    std::fs::create_dir_all(&inputs.output)?;
    let mut index = SpriteIndex::load_or_new(&index_path)?;
    reporter.report(BatchEvent::IndexLoaded { files: index.len(), names: index.counts.len() });

    let row_bucket = options.matching.row_bucket;
    named.sort_by_key(|n| n.sprite.reading_key(row_bucket));

    let mut saved = Vec::with_capacity(named.len());
    for (i, item) in named.into_iter().enumerate() {
        let name = if item.name.is_empty() { format!("item{}", i + 1) } else { item.name };
        reporter.report(BatchEvent::SpriteNamed {
            position: i + 1,
            name: name.clone(),
            evidence: item.evidence.to_string(),
        });

        let seq = index.next_sequence(&name);
        let filename = match render_sprite(&item.sprite, &name, seq, &inputs.output) {
            Ok(filename) => filename,
            Err(e) => {
                remove_written(&inputs.output, &saved);
                return Err(e.into());
            }
        };
        index.add_file(filename.clone());
        reporter.report(BatchEvent::SpriteSaved { filename: filename.clone() });

        saved.push(SavedSprite { filename, name, evidence: item.evidence });
    }

    index.record_batch(SourceRecord {
        batch: batch.clone(),
        prompt: file_name(&inputs.prompt),
        origin: file_name(&inputs.origin),
        renew: file_name(&inputs.renew),
        sprites: saved.len(),
        date: today(),
    });
    if let Err(e) = index.save(&index_path) {
        remove_written(&inputs.output, &saved);
        return Err(e.into());
    }

    reporter.report(BatchEvent::BatchCompleted {
        batch: batch.clone(),
        new_files: saved.len(),
        total_files: index.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    });

    Ok(BatchReport {
        batch,
        backend: extractor.backend(),
        labels: labels.len(),
        saved,
        total_files: index.len(),
        index_path,
    })
}

/// Delete the sprites a failed batch already wrote.
fn remove_written(out_dir: &Path, saved: &[SavedSprite]) {
    for sprite in saved {
        let path = out_dir.join(&sprite.filename);
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed sprite from failed batch"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not remove sprite")
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
