//! Batch progress reporting.
//!
//! Stages and per-sprite decisions are reported as [`BatchEvent`]s through a
//! [`ProgressReporter`]. The console reporter writes human-readable lines to
//! stderr, the JSON reporter one object per line for tooling.
//!
//! # Example
//!
//! ```ignore
//! use spritesplit::progress::{BatchEvent, ConsoleProgress, ProgressReporter};
//!
//! let reporter = ConsoleProgress::new();
//! reporter.report(BatchEvent::StageStarted { stage: 1, total: 5, name: "Parsing prompt".into() });
//! reporter.report(BatchEvent::PromptParsed { names: 12 });
//! ```

use std::io::Write;
use std::sync::Mutex;

/// Number of stages reported by a batch.
pub const STAGE_COUNT: usize = 5;

/// Events that can be reported during a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// A pipeline stage started
    StageStarted {
        /// 1-based stage number
        stage: usize,
        /// Total number of stages
        total: usize,
        /// Stage description
        name: String,
    },
    /// Prompt names were read
    PromptParsed { names: usize },
    /// OCR finished
    LabelsExtracted {
        /// Backend name (`none` when OCR was skipped)
        backend: String,
        /// Words read before merging
        raw: usize,
        /// Labels after merging
        merged: usize,
    },
    /// Sprites were cut from the composite
    SpritesSegmented { count: usize },
    /// A sprite received its name
    SpriteNamed {
        /// Position in reading order, 1-based
        position: usize,
        name: String,
        /// What the name came from
        evidence: String,
    },
    /// All sprites were named
    SpritesMatched { count: usize },
    /// The existing index was read
    IndexLoaded { files: usize, names: usize },
    /// A sprite file was written
    SpriteSaved { filename: String },
    /// The batch finished
    BatchCompleted {
        batch: String,
        /// Files written by this batch
        new_files: usize,
        /// Files in the index afterwards
        total_files: usize,
        /// Total duration in milliseconds
        duration_ms: u64,
    },
    /// A warning was generated
    Warning { message: String },
    /// An error occurred
    Error { message: String },
}

/// Trait for progress reporters.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event.
    fn report(&self, event: BatchEvent);

    /// Check if this reporter wants verbose output.
    fn is_verbose(&self) -> bool {
        false
    }
}

/// A progress reporter that discards all events.
#[derive(Debug, Default)]
pub struct NullProgress;

impl NullProgress {
    /// Create a new null progress reporter.
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NullProgress {
    fn report(&self, _event: BatchEvent) {}
}

/// Console progress reporter with optional colors.
pub struct ConsoleProgress {
    use_colors: bool,
    /// Print per-sprite name decisions
    verbose: bool,
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleProgress")
            .field("use_colors", &self.use_colors)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl ConsoleProgress {
    /// Create a new console progress reporter.
    pub fn new() -> Self {
        Self { use_colors: true, verbose: false, output: Mutex::new(Box::new(std::io::stderr())) }
    }

    /// Create a console progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { use_colors: false, verbose: false, output: Mutex::new(Box::new(output)) }
    }

    /// Set whether to use colors.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn color(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.color(text, "\x1b[32m")
    }

    fn yellow(&self, text: &str) -> String {
        self.color(text, "\x1b[33m")
    }

    fn red(&self, text: &str) -> String {
        self.color(text, "\x1b[31m")
    }

    fn cyan(&self, text: &str) -> String {
        self.color(text, "\x1b[36m")
    }

    fn bold(&self, text: &str) -> String {
        self.color(text, "\x1b[1m")
    }

    fn writeln(&self, line: &str) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, event: BatchEvent) {
        match event {
            BatchEvent::StageStarted { stage, total, name } => {
                self.writeln(&format!("{} {}...", self.cyan(&format!("[{}/{}]", stage, total)), name));
            }
            BatchEvent::PromptParsed { names } => {
                self.writeln(&format!("      {} in prompt", plural(names, "name", "names")));
            }
            BatchEvent::LabelsExtracted { backend, raw, merged } => {
                if backend == "none" {
                    self.writeln(&format!(
                        "      {} no OCR backend, naming by prompt order",
                        self.yellow("skipped")
                    ));
                } else {
                    self.writeln(&format!(
                        "      {} {} ({} merged) via {}",
                        plural(raw, "word", "words"),
                        self.green("read"),
                        merged,
                        backend
                    ));
                }
            }
            BatchEvent::SpritesSegmented { count } => {
                self.writeln(&format!("      {} found", plural(count, "sprite", "sprites")));
            }
            BatchEvent::SpriteNamed { position, name, evidence } => {
                if self.verbose {
                    self.writeln(&format!("      {:>3}. {} <- {}", position, name, evidence));
                }
            }
            BatchEvent::SpritesMatched { count } => {
                self.writeln(&format!("      {} named", plural(count, "sprite", "sprites")));
            }
            BatchEvent::IndexLoaded { files, names } => {
                self.writeln(&format!(
                    "      index has {} across {}",
                    plural(files, "file", "files"),
                    plural(names, "name", "names")
                ));
            }
            BatchEvent::SpriteSaved { filename } => {
                if self.verbose {
                    self.writeln(&format!("      {} {}", self.green("saved"), filename));
                }
            }
            BatchEvent::BatchCompleted { batch, new_files, total_files, duration_ms } => {
                self.writeln(&format!(
                    "\n{} {}: {} added, {} in index ({})",
                    self.green("[done]"),
                    batch,
                    self.bold(&plural(new_files, "sprite", "sprites")),
                    total_files,
                    format_duration(duration_ms)
                ));
            }
            BatchEvent::Warning { message } => {
                self.writeln(&format!("{} {}", self.yellow("[warn]"), message));
            }
            BatchEvent::Error { message } => {
                self.writeln(&format!("{} {}", self.red("[error]"), message));
            }
        }
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// JSON progress reporter for machine-readable output.
pub struct JsonProgress {
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for JsonProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonProgress").finish()
    }
}

impl JsonProgress {
    /// Create a new JSON progress reporter writing to stderr.
    pub fn new() -> Self {
        Self { output: Mutex::new(Box::new(std::io::stderr())) }
    }

    /// Create a JSON progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { output: Mutex::new(Box::new(output)) }
    }

    fn write_json(&self, value: &serde_json::Value) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", value);
        }
    }
}

impl Default for JsonProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: BatchEvent) {
        use serde_json::json;

        let value = match event {
            BatchEvent::StageStarted { stage, total, name } => {
                json!({"event": "stage_started", "stage": stage, "total": total, "name": name})
            }
            BatchEvent::PromptParsed { names } => json!({"event": "prompt_parsed", "names": names}),
            BatchEvent::LabelsExtracted { backend, raw, merged } => json!({
                "event": "labels_extracted",
                "backend": backend,
                "raw": raw,
                "merged": merged,
            }),
            BatchEvent::SpritesSegmented { count } => {
                json!({"event": "sprites_segmented", "count": count})
            }
            BatchEvent::SpriteNamed { position, name, evidence } => json!({
                "event": "sprite_named",
                "position": position,
                "name": name,
                "evidence": evidence,
            }),
            BatchEvent::SpritesMatched { count } => json!({"event": "sprites_matched", "count": count}),
            BatchEvent::IndexLoaded { files, names } => {
                json!({"event": "index_loaded", "files": files, "names": names})
            }
            BatchEvent::SpriteSaved { filename } => {
                json!({"event": "sprite_saved", "filename": filename})
            }
            BatchEvent::BatchCompleted { batch, new_files, total_files, duration_ms } => json!({
                "event": "batch_completed",
                "batch": batch,
                "new_files": new_files,
                "total_files": total_files,
                "duration_ms": duration_ms,
            }),
            BatchEvent::Warning { message } => json!({"event": "warning", "message": message}),
            BatchEvent::Error { message } => json!({"event": "error", "message": message}),
        };
        self.write_json(&value);
    }
}

/// Format a duration in milliseconds to a human-readable string.
fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60_000;
        let seconds = (ms % 60_000) / 1000;
        format!("{}m {}s", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct TestWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn console(verbose: bool) -> (ConsoleProgress, Arc<Mutex<Vec<u8>>>) {
        let output = Arc::new(Mutex::new(Vec::new()));
        let reporter = ConsoleProgress::with_output(TestWriter(Arc::clone(&output)))
            .with_colors(false)
            .with_verbose(verbose);
        (reporter, output)
    }

    fn text(output: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8_lossy(&output.lock().unwrap()).to_string()
    }

    #[test]
    fn test_null_progress() {
        let reporter = NullProgress::new();
        reporter.report(BatchEvent::PromptParsed { names: 3 });
        assert!(!reporter.is_verbose());
    }

    #[test]
    fn test_console_stage_started() {
        let (reporter, output) = console(false);
        reporter.report(BatchEvent::StageStarted {
            stage: 2,
            total: STAGE_COUNT,
            name: "Reading labels".to_string(),
        });
        assert!(text(&output).contains("[2/5] Reading labels..."));
    }

    #[test]
    fn test_console_no_ocr_notice() {
        let (reporter, output) = console(false);
        reporter.report(BatchEvent::LabelsExtracted { backend: "none".into(), raw: 0, merged: 0 });
        assert!(text(&output).contains("prompt order"));
    }

    #[test]
    fn test_console_sprite_named_only_when_verbose() {
        let event = BatchEvent::SpriteNamed {
            position: 1,
            name: "bed".to_string(),
            evidence: "Bed".to_string(),
        };

        let (quiet, quiet_output) = console(false);
        quiet.report(event.clone());
        assert!(text(&quiet_output).is_empty());

        let (verbose, verbose_output) = console(true);
        verbose.report(event);
        assert!(text(&verbose_output).contains("bed <- Bed"));
    }

    #[test]
    fn test_console_batch_completed() {
        let (reporter, output) = console(false);
        reporter.report(BatchEvent::BatchCompleted {
            batch: "batch1".to_string(),
            new_files: 1,
            total_files: 7,
            duration_ms: 1500,
        });
        let text = text(&output);
        assert!(text.contains("done"));
        assert!(text.contains("batch1: 1 sprite added, 7 in index"));
        assert!(text.contains("1.5s"));
    }

    #[test]
    fn test_console_warning() {
        let (reporter, output) = console(false);
        reporter.report(BatchEvent::Warning { message: "push failed".to_string() });
        let text = text(&output);
        assert!(text.contains("warn"));
        assert!(text.contains("push failed"));
    }

    #[test]
    fn test_json_sprite_saved() {
        let output = Arc::new(Mutex::new(Vec::new()));
        let reporter = JsonProgress::with_output(TestWriter(Arc::clone(&output)));
        reporter.report(BatchEvent::SpriteSaved { filename: "bed_1_64x32.png".to_string() });

        let line = text(&output);
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["event"], "sprite_saved");
        assert_eq!(value["filename"], "bed_1_64x32.png");
    }

    #[test]
    fn test_json_escapes_text() {
        let output = Arc::new(Mutex::new(Vec::new()));
        let reporter = JsonProgress::with_output(TestWriter(Arc::clone(&output)));
        reporter.report(BatchEvent::Error { message: "bad \"index\"\nline".to_string() });

        let value: serde_json::Value = serde_json::from_str(text(&output).trim()).unwrap();
        assert_eq!(value["message"], "bad \"index\"\nline");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(150), "150ms");
        assert_eq!(format_duration(2500), "2.5s");
        assert_eq!(format_duration(125_000), "2m 5s");
    }
}
