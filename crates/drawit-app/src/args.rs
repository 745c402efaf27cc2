//! Command-line arguments for the `drawit` binary.

use clap::Parser;
use std::path::PathBuf;

/// Replay a DrawIt session script and print the resulting model
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the session script (JSON)
    pub script: PathBuf,

    /// Path to editor settings (JSON), overriding the script's own
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print one rendered line per node and link to stderr
    #[arg(long)]
    pub render: bool,
}
