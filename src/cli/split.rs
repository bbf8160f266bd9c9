//! Split command implementation

use clap::Args;
use std::path::PathBuf;
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::config::{load_config, merge_cli_overrides, CliOverrides, ConfigError, SplitConfig};
use crate::ocr::{LabelExtractor, OcrBackendChoice};
use crate::pipeline::{run_batch, BatchInputs, BatchOptions};
use crate::progress::{BatchEvent, ConsoleProgress, JsonProgress, ProgressReporter};
use crate::publish::Publisher;

#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    /// Prompt listing the item names (its directory names the batch)
    #[arg(long)]
    pub prompt: PathBuf,

    /// Reference image with a text label under each item
    #[arg(long)]
    pub origin: PathBuf,

    /// Composite image with the items on a transparent background
    #[arg(long)]
    pub renew: PathBuf,

    /// Output directory for sprites and the index
    #[arg(long)]
    pub output: PathBuf,

    /// Commit and push the output repository afterwards
    #[arg(long)]
    pub push: bool,

    /// OCR backend (overrides config)
    #[arg(long, value_enum)]
    pub ocr: Option<OcrBackendChoice>,

    /// Index filename inside the output directory (overrides config)
    #[arg(long)]
    pub index_file: Option<String>,

    /// Config file (default: nearest spritesplit.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report progress as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Show the name chosen for every sprite
    #[arg(short, long)]
    pub verbose: bool,
}

fn resolve_config(args: &SplitArgs) -> Result<SplitConfig, (u8, String)> {
    let mut config = load_config(args.config.as_deref()).map_err(|e| {
        let code = match e {
            ConfigError::Validation(_) => EXIT_INVALID_ARGS,
            _ => EXIT_ERROR,
        };
        (code, format!("Error loading config: {}", e))
    })?;

    let overrides = CliOverrides { ocr: args.ocr, index_file: args.index_file.clone() };
    merge_cli_overrides(&mut config, &overrides);

    let errors = config.validate();
    if let Some(first) = errors.first() {
        return Err((EXIT_INVALID_ARGS, format!("Error: {}", first)));
    }

    Ok(config)
}

/// Run the split command
pub fn run_split(args: &SplitArgs) -> ExitCode {
    let config = match resolve_config(args) {
        Ok(config) => config,
        Err((code, message)) => {
            eprintln!("{}", message);
            return ExitCode::from(code);
        }
    };

    let reporter: Box<dyn ProgressReporter> = if args.json {
        Box::new(JsonProgress::new())
    } else {
        Box::new(ConsoleProgress::new().with_verbose(args.verbose))
    };

    let extractor = LabelExtractor::select(config.ocr.backend, &config.ocr_options());
    if !extractor.is_available() && config.ocr.backend != OcrBackendChoice::None {
        reporter.report(BatchEvent::Warning {
            message: "No OCR backend available; names follow prompt order".to_string(),
        });
    }

    let inputs = BatchInputs {
        prompt: args.prompt.clone(),
        origin: args.origin.clone(),
        renew: args.renew.clone(),
        output: args.output.clone(),
    };

    let report = match run_batch(&inputs, &BatchOptions::from_config(&config), &extractor, &*reporter)
    {
        Ok(report) => report,
        Err(e) => {
            reporter.report(BatchEvent::Error { message: e.to_string() });
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if args.push {
        let published =
            Publisher::for_output(&inputs.output).and_then(|p| p.publish(&report.batch));
        if let Err(e) = published {
            reporter.report(BatchEvent::Error {
                message: format!("Publish failed, sprites were kept: {}", e),
            });
            return ExitCode::from(EXIT_ERROR);
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}
