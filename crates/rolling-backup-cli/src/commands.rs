use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rolling-backup")]
#[command(about = "Dated, space-aware backups of a file tree and its database", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./Config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Do not mirror the run log to stdout
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a backup now (the default)
    Run,
    /// Show what a run would delete, without touching anything
    Plan,
    /// Print configuration values
    PrintConfig,
}
