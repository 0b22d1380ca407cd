//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ThoughtBuffer - answer questions while growing a library of thought templates
#[derive(Parser, Debug)]
#[command(name = "tb", author, version, about = "Buffer of Thoughts agent", long_about = None)]
pub struct Cli {
    /// Question to answer (defaults to a built-in example problem)
    #[arg(short = 'p', long = "prompt")]
    pub question: Option<String>,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Template directory, overrides the config file
    #[arg(short, long, global = true)]
    pub store: Option<PathBuf>,

    /// Seed for arbitration coin flips
    #[arg(long)]
    pub seed: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List stored thought templates
    Templates,
}
