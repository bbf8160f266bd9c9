//! Cumulative sprite index.
//!
//! The index is the only state that survives between batches. It records
//! every sprite file produced so far, the highest sequence number used for
//! each name, and one provenance entry per batch. It is append-only: running
//! the same batch twice allocates new sequence numbers rather than replacing
//! files.
//!
//! # Index Format
//!
//! Stored as pretty-printed JSON, `sprite_index.json` in the output directory
//! by default:
//!
//! ```json
//! {
//!   "_meta": {
//!     "sources": [
//!       {
//!         "batch": "batch1",
//!         "prompt": "prompt.txt",
//!         "origin": "origin.png",
//!         "renew": "renew.png",
//!         "sprites": 2,
//!         "date": "2026-02-06"
//!       }
//!     ],
//!     "total_sprites": 2,
//!     "last_updated": "2026-02-06 14:03:11"
//!   },
//!   "counts": { "bed": 1, "lamp": 1 },
//!   "files": ["bed_1_64x32.png", "lamp_1_32x64.png"]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::output::parse_sprite_filename;

/// Default index filename.
pub const INDEX_FILENAME: &str = "sprite_index.json";

/// Error during index operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum IndexError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Existing index could not be parsed; it is left untouched
    #[error("Malformed index '{path}': {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Temporary file could not be moved into place
    #[error("Failed to replace index: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Provenance of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Batch name (directory holding the prompt)
    pub batch: String,
    /// Prompt filename
    pub prompt: String,
    /// Reference image filename
    pub origin: String,
    /// Composite image filename
    pub renew: String,
    /// Sprites produced by the batch
    pub sprites: usize,
    /// Local date, `YYYY-MM-DD`
    pub date: String,
}

/// Index metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
    #[serde(default)]
    pub total_sprites: usize,
    #[serde(default)]
    pub last_updated: String,
}

/// The cumulative index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpriteIndex {
    #[serde(rename = "_meta", default)]
    pub meta: IndexMeta,
    /// Highest sequence number used per name
    #[serde(default)]
    pub counts: BTreeMap<String, u32>,
    /// Every sprite filename produced so far
    #[serde(default)]
    pub files: BTreeSet<String>,
}

/// A broken index invariant found by [`SpriteIndex::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexIssue {
    /// Filename is not `{name}_{seq}_{W}x{H}.png`
    UnparsableFile(String),
    /// Filename's name has no counter
    MissingCount { file: String, name: String },
    /// Filename's sequence is above the recorded counter
    SequenceAhead { file: String, seq: u32, count: u32 },
    /// `total_sprites` disagrees with the file list
    TotalMismatch { recorded: usize, actual: usize },
}

impl fmt::Display for IndexIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexIssue::UnparsableFile(file) => write!(f, "unrecognized filename '{}'", file),
            IndexIssue::MissingCount { file, name } => {
                write!(f, "'{}' uses name '{}' which has no count", file, name)
            }
            IndexIssue::SequenceAhead { file, seq, count } => {
                write!(f, "'{}' has sequence {} but count is {}", file, seq, count)
            }
            IndexIssue::TotalMismatch { recorded, actual } => {
                write!(f, "total_sprites is {} but {} files are listed", recorded, actual)
            }
        }
    }
}

impl SpriteIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an index from a file.
    ///
    /// Returns `Ok(None)` if the file doesn't exist. A file that exists but
    /// does not parse is an error, never an empty index.
    pub fn load(path: &Path) -> Result<Option<Self>, IndexError> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let index = serde_json::from_reader(reader)
            .map_err(|source| IndexError::Malformed { path: path.display().to_string(), source })?;

        Ok(Some(index))
    }

    /// Load an index, or start empty if there is none.
    pub fn load_or_new(path: &Path) -> Result<Self, IndexError> {
        Ok(Self::load(path)?.unwrap_or_default())
    }

    /// Save the index, replacing any existing file atomically.
    ///
    /// Refreshes `total_sprites` and `last_updated` before writing.
    pub fn save(&mut self, path: &Path) -> Result<(), IndexError> {
        self.meta.total_sprites = self.files.len();
        self.meta.last_updated = now_timestamp();

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        tmp.persist(path)?;

        Ok(())
    }

    /// Advance and return the sequence number for `name`.
    ///
    /// Starts at 1 for unseen names. Counters never go down.
    pub fn next_sequence(&mut self, name: &str) -> u32 {
        let count = self.counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Current count for a name (0 if unseen).
    pub fn count(&self, name: &str) -> u32 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    /// Add a produced filename.
    pub fn add_file(&mut self, filename: impl Into<String>) {
        self.files.insert(filename.into());
    }

    /// Append a batch provenance record.
    pub fn record_batch(&mut self, source: SourceRecord) {
        self.meta.sources.push(source);
    }

    /// Number of files in the index.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the index has no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Check that every file is consistent with `counts` and that the total
    /// matches. Returns the violations found.
    pub fn verify(&self) -> Vec<IndexIssue> {
        let mut issues = Vec::new();

        for file in &self.files {
            let Some(parsed) = parse_sprite_filename(file) else {
                issues.push(IndexIssue::UnparsableFile(file.clone()));
                continue;
            };

            match self.counts.get(&parsed.name) {
                None => issues.push(IndexIssue::MissingCount {
                    file: file.clone(),
                    name: parsed.name.clone(),
                }),
                Some(&count) if parsed.seq > count => issues.push(IndexIssue::SequenceAhead {
                    file: file.clone(),
                    seq: parsed.seq,
                    count,
                }),
                Some(_) => {}
            }
        }

        if self.meta.total_sprites != self.files.len() {
            issues.push(IndexIssue::TotalMismatch {
                recorded: self.meta.total_sprites,
                actual: self.files.len(),
            });
        }

        issues
    }
}

/// Local date as `YYYY-MM-DD`.
pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Local time as `YYYY-MM-DD HH:MM:SS`.
pub fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
