//! Index command implementation

use std::path::Path;
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::index::SpriteIndex;

/// Print an index summary, optionally checking its invariants.
pub fn run_index(dir: &Path, index_file: &str, check: bool) -> ExitCode {
    let path = dir.join(index_file);
    let index = match SpriteIndex::load(&path) {
        Ok(Some(index)) => index,
        Ok(None) => {
            eprintln!("Error: No index found at {}", path.display());
            return ExitCode::from(EXIT_ERROR);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    println!("Index: {}", path.display());
    println!("  Sprites: {}", index.len());
    println!("  Names:   {}", index.counts.len());
    if !index.meta.last_updated.is_empty() {
        println!("  Updated: {}", index.meta.last_updated);
    }

    if !index.meta.sources.is_empty() {
        println!();
        println!("Batches:");
        for source in &index.meta.sources {
            println!("  {:<20} {}  {:>4} sprites", source.batch, source.date, source.sprites);
        }
    }

    if !index.counts.is_empty() {
        println!();
        println!("Counts:");
        for (name, count) in &index.counts {
            println!("  {:<24} {}", name, count);
        }
    }

    if check {
        let issues = index.verify();
        if !issues.is_empty() {
            eprintln!();
            for issue in &issues {
                eprintln!("Error: {}", issue);
            }
            eprintln!("{} problem{} found", issues.len(), if issues.len() == 1 { "" } else { "s" });
            return ExitCode::from(EXIT_ERROR);
        }
        println!();
        println!("Index OK");
    }

    ExitCode::from(EXIT_SUCCESS)
}
