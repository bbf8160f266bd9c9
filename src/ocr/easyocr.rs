//! EasyOCR command-line backend

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use super::{ConfidenceScale, Label, LabelProvider, OcrError};

const BACKEND: &str = "easyocr";

static LINE: OnceLock<Regex> = OnceLock::new();
static NUMBER: OnceLock<Regex> = OnceLock::new();

fn line_pattern() -> &'static Regex {
    LINE.get_or_init(|| {
        Regex::new(
            r#"^\(\[(?P<poly>.*)\],\s*(?:'(?P<sq>.*)'|"(?P<dq>.*)"),\s*(?:np\.\w+\()?(?P<conf>[-+0-9.eE]+)\)?\)$"#,
        )
        .expect("easyocr line pattern")
    })
}

fn number_pattern() -> &'static Regex {
    NUMBER.get_or_init(|| {
        Regex::new(r"(?:np\.\w+\()?(-?\d+(?:\.\d+)?)").expect("easyocr number pattern")
    })
}

/// Runs the `easyocr` CLI with `--detail 1`.
#[derive(Debug, Clone)]
pub struct EasyOcrProvider {
    program: PathBuf,
    languages: Vec<String>,
}

impl EasyOcrProvider {
    pub fn new(program: impl Into<PathBuf>, languages: &[String]) -> Self {
        Self { program: program.into(), languages: languages.to_vec() }
    }

    /// Find `easyocr` on PATH.
    pub fn locate(languages: &[String]) -> Option<Self> {
        which::which(BACKEND).ok().map(|program| Self::new(program, languages))
    }
}

impl LabelProvider for EasyOcrProvider {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn labels(&self, image: &Path) -> Result<Vec<Label>, OcrError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-l");
        cmd.args(&self.languages);
        cmd.arg("-f").arg(image).args(["--detail", "1", "--gpu", "False", "--verbose", "False"]);

        let output = cmd.output().map_err(|source| OcrError::Spawn { backend: BACKEND, source })?;
        if !output.status.success() {
            return Err(OcrError::Failed {
                backend: BACKEND,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_easyocr_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `--detail 1` output.
///
/// Each detection is printed as a Python tuple of a four-point polygon, the
/// text and the confidence:
///
/// ```text
/// ([[12, 30], [80, 30], [80, 48], [12, 48]], 'Hospital bed', 0.93)
/// ```
///
/// Newer releases wrap numbers as `np.int32(12)` / `np.float64(0.93)`; both
/// forms are accepted. The label center is the truncated mean of the polygon
/// points. Lines that do not parse are skipped.
pub fn parse_easyocr_output(stdout: &str) -> Vec<Label> {
    let (line_re, number_re) = (line_pattern(), number_pattern());

    let mut labels = Vec::new();
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(caps) = line_re.captures(line) else {
            tracing::debug!(line, "skipping unrecognized easyocr line");
            continue;
        };

        let coords: Vec<f64> = number_re
            .captures_iter(&caps["poly"])
            .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
            .collect();
        if coords.len() < 2 || coords.len() % 2 != 0 {
            continue;
        }

        let Ok(raw_conf) = caps["conf"].parse::<f64>() else {
            continue;
        };

        let text = caps
            .name("sq")
            .or_else(|| caps.name("dq"))
            .map(|m| unescape_python(m.as_str()))
            .unwrap_or_default();

        let points = (coords.len() / 2) as f64;
        let sum_x: f64 = coords.iter().step_by(2).sum();
        let sum_y: f64 = coords.iter().skip(1).step_by(2).sum();

        labels.push(Label {
            text: text.trim().to_string(),
            x: (sum_x / points) as i32,
            y: (sum_y / points) as i32,
            confidence: ConfidenceScale::Fraction.normalize(raw_conf),
        });
    }

    labels
}

fn unescape_python(s: &str) -> String {
    s.replace("\\'", "'").replace("\\\"", "\"").replace("\\\\", "\\")
}
