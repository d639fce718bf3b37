//! # rowmill-cli
//!
//! Command-line surface for the rowmill engine:
//! `rowmill <threads> <input.json> <output.json>`.
//!
//! The process never crashes on a completed run. Every failure, from a bad
//! thread count to an evaluation error, is rendered into the output file as
//! an `{"error": ...}` document; a wrong argument count (where no output
//! path is known) falls back to [`DEFAULT_ERROR_PATH`] in the working
//! directory.

pub mod cli;
pub mod output;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use rowmill_engine::LinearAlgebraEngine;
use rowmill_ir::parse_tree;

pub use cli::Cli;

/// Where the usage error lands when no output path was given.
pub const DEFAULT_ERROR_PATH: &str = "error.json";

/// Usage line written on argument-count errors.
pub const USAGE: &str = "usage: rowmill <threads> <input.json> <output.json>";

/// Runs one invocation to completion, writing exactly one output document.
pub fn run(cli: &Cli) {
    let threads = match cli.threads.parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => {
            let message = format!("invalid number of threads: {}", cli.threads);
            let _ = output::write_error(&cli.output, &message);
            return;
        }
    };

    match evaluate(threads, &cli.input) {
        Ok(matrix) => {
            if let Err(err) = output::write_result(&cli.output, &matrix) {
                let _ = output::write_error(&cli.output, &format!("{err:#}"));
            }
        }
        Err(err) => {
            let _ = output::write_error(&cli.output, &format!("{err:#}"));
        }
    }
}

fn evaluate(threads: usize, input: &Path) -> Result<Vec<Vec<f64>>> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read input file {}", input.display()))?;
    let tree = parse_tree(&text).context("failed to parse computation tree")?;
    let engine = LinearAlgebraEngine::new(threads)?;
    let resolved = engine.run(tree)?;
    let matrix = resolved
        .as_literal()
        .context("evaluation finished without a literal result")?;
    Ok(matrix.clone())
}
