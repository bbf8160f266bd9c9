//! sprsplit - split sprite sheets into named, canvas-sized PNGs

use std::process::ExitCode;

use spritesplit::cli;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spritesplit=warn")),
        )
        .init();

    cli::run()
}
