//! Output documents written by the CLI.
//!
//! Every completed run produces exactly one JSON file: either
//! `{"result": <matrix>}` or `{"error": <message>}`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputDocument {
    Result(Vec<Vec<f64>>),
    Error(String),
}

pub fn write_result(path: &Path, matrix: &[Vec<f64>]) -> Result<()> {
    write_document(path, &OutputDocument::Result(matrix.to_vec()))
}

pub fn write_error(path: &Path, message: &str) -> Result<()> {
    write_document(path, &OutputDocument::Error(message.to_string()))
}

fn write_document(path: &Path, document: &OutputDocument) -> Result<()> {
    let body =
        serde_json::to_string_pretty(document).context("failed to serialize output document")?;
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
