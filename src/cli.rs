use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Srt,
}

#[derive(Parser)]
#[command(
    name = "ytingest",
    about = "Resolve YouTube URLs, scrape metadata and extract caption transcripts",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// YouTube video URLs or video IDs (reads from stdin if omitted)
    pub urls: Vec<String>,

    /// Output format: text (default), json, srt
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Preferred caption language prefix (overrides config)
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Per-request timeout in seconds (overrides config)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print video metadata only, skip the transcript
    #[arg(long)]
    pub metadata_only: bool,

    /// Show processing status and metadata on stderr
    #[arg(short, long)]
    pub verbose: bool,
}
