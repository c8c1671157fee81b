use chapter_merge_core::BackendKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "chapter-merge")]
#[command(
    about = "Merge chaptered action-camera recordings back into one file per session",
    long_about = None
)]
pub struct Cli {
    /// Configuration file to use instead of ./Config.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory, confirm, and merge every chaptered session
    Merge(MergeArgs),
    /// Scan a directory and report the sessions found, without merging
    Scan(ScanArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Directory holding the chapter files
    pub source: PathBuf,

    /// Directory the merged files are written to
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Merge backend: primary (ffmpeg) or fallback (mp4merge)
    #[arg(short, long)]
    pub backend: Option<BackendKind>,

    /// Filename pattern preset (default, gopro, gopro-legacy) or template
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Number of merges to run at once
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Kill a merge after this many seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Overwrite merged files that already exist
    #[arg(short, long)]
    pub force: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Only merge these sessions (repeatable; `all` selects every session)
    #[arg(short, long = "select", value_name = "KEY")]
    pub select: Vec<String>,

    #[arg(short, long, value_enum, default_value_t = ReportStyle::Table)]
    pub report: ReportStyle,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory holding the chapter files
    pub source: PathBuf,

    /// Filename pattern preset (default, gopro, gopro-legacy) or template
    #[arg(short, long)]
    pub pattern: Option<String>,

    #[arg(short, long, value_enum, default_value_t = ReportStyle::Table)]
    pub report: ReportStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportStyle {
    Table,
    Tree,
}
