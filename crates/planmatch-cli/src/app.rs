//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "planmatch")]
#[command(
    author,
    version,
    about = "Recommend health plans from plan documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, env = "PLANMATCH_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the recommendation pipeline for a client profile
    Recommend(RecommendArgs),

    /// Extract plan price tables from a text or markdown file
    Prices(PricesArgs),

    /// Show the age band for an age
    Band(BandArgs),
}

#[derive(Args)]
pub struct RecommendArgs {
    /// Client profile JSON
    #[arg(long)]
    pub profile: PathBuf,

    /// Corpus JSON: array of documents, embeddings optional
    #[arg(long)]
    pub corpus: PathBuf,

    /// Restrict the search to these file ids
    #[arg(long = "file", value_name = "FILE_ID")]
    pub files: Vec<String>,

    /// Also list documents that were graded irrelevant or are over budget
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct PricesArgs {
    /// Document to scan
    pub file: PathBuf,
}

#[derive(Args)]
pub struct BandArgs {
    /// Age in years
    pub age: u32,
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Cli,
    Json,
}
