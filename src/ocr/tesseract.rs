//! Tesseract command-line backend

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{ConfidenceScale, Label, LabelProvider, OcrError};

const BACKEND: &str = "tesseract";

/// Runs `tesseract <image> stdout tsv`.
#[derive(Debug, Clone)]
pub struct TesseractProvider {
    program: PathBuf,
    languages: Vec<String>,
}

impl TesseractProvider {
    pub fn new(program: impl Into<PathBuf>, languages: &[String]) -> Self {
        Self { program: program.into(), languages: languages.to_vec() }
    }

    /// Find `tesseract` on PATH.
    pub fn locate(languages: &[String]) -> Option<Self> {
        which::which(BACKEND).ok().map(|program| Self::new(program, languages))
    }

    /// Tesseract language argument (`eng+fra`).
    fn language_arg(&self) -> String {
        self.languages.iter().map(|l| tesseract_language(l)).collect::<Vec<_>>().join("+")
    }
}

/// Map two-letter codes to Tesseract's three-letter traineddata names.
fn tesseract_language(code: &str) -> &str {
    match code {
        "en" => "eng",
        "de" => "deu",
        "fr" => "fra",
        "es" => "spa",
        "it" => "ita",
        "pt" => "por",
        "ja" => "jpn",
        "ko" => "kor",
        "ch_sim" => "chi_sim",
        "ch_tra" => "chi_tra",
        other => other,
    }
}

impl LabelProvider for TesseractProvider {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn labels(&self, image: &Path) -> Result<Vec<Label>, OcrError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(image).arg("stdout");
        if !self.languages.is_empty() {
            cmd.arg("-l").arg(self.language_arg());
        }
        cmd.arg("tsv");

        let output = cmd.output().map_err(|source| OcrError::Spawn { backend: BACKEND, source })?;
        if !output.status.success() {
            return Err(OcrError::Failed {
                backend: BACKEND,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_tesseract_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse Tesseract TSV output into word labels.
///
/// Columns are `level page_num block_num par_num line_num word_num left top
/// width height conf text`. Rows with empty text (layout rows, conf -1) are
/// dropped. Confidence is on a 0-100 scale and is converted to 0-1; the label
/// sits at the center of the word box.
pub fn parse_tesseract_tsv(tsv: &str) -> Vec<Label> {
    let mut labels = Vec::new();

    for line in tsv.lines().skip_while(|l| l.starts_with("level")) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }

        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }

        let parse = |i: usize| cols[i].trim().parse::<f64>().ok();
        let (Some(left), Some(top), Some(width), Some(height), Some(conf)) =
            (parse(6), parse(7), parse(8), parse(9), parse(10))
        else {
            continue;
        };
        if conf < 0.0 {
            continue;
        }

        let (left, top, width, height) = (left as i32, top as i32, width as i32, height as i32);
        labels.push(Label {
            text: text.to_string(),
            x: left + width / 2,
            y: top + height / 2,
            confidence: ConfidenceScale::Percent.normalize(conf),
        });
    }

    labels
}
