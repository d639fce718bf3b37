//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "rowmill")]
#[command(author, version, about = "Parallel linear algebra over JSON computation trees")]
pub struct Cli {
    /// Number of worker threads (positive integer)
    #[arg(value_name = "THREADS", allow_hyphen_values = true)]
    pub threads: String,

    /// Input JSON file holding the computation tree
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output JSON file receiving the result or error document
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,
}
