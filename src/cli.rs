use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum CacheBackend {
    Json,
    Sqlite,
}

/// Command-line options for audiobook-organizer.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Rename and organize audiobook folders using tags, folder names and online metadata."
)]
pub struct CliArgs {
    /// Directory containing the audiobook folders; defaults to the current working directory.
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// Directory to place organized folders in; defaults to the input directory.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Folder naming pattern. Supports {author}, {title}, {genre} and {year}.
    #[arg(long, short = 'n', default_value = crate::paths::DEFAULT_NAMING)]
    pub naming_convention: String,

    /// Comma-separated folder hierarchy, e.g. "genre,author".
    #[arg(long, short = 's', default_value = "")]
    pub folder_structure: String,

    /// Apply changes instead of performing a dry run.
    #[arg(long, default_value_t = false)]
    pub commit: bool,

    /// Fetch genre and year from the online book-lookup service.
    #[arg(long, default_value_t = false)]
    pub fetch_metadata: bool,

    /// API key for the book-lookup service.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Override the book-lookup endpoint.
    #[arg(long, default_value = crate::fetcher::DEFAULT_API_URL)]
    pub api_url: String,

    /// Disable the local metadata cache.
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    /// Storage used for the metadata cache.
    #[arg(long, value_enum, default_value = "json")]
    pub cache_backend: CacheBackend,

    /// Directory holding the metadata cache; defaults to the user cache directory.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Update the embedded tags of audio files to match the resolved metadata.
    #[arg(long, default_value_t = false)]
    pub write_tags: bool,

    /// Append log output to this file in addition to the console.
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Report per-stage timings at the end of the run.
    #[arg(long, default_value_t = false)]
    pub benchmark: bool,

    /// Number of folders processed in parallel; defaults to the number of CPUs.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Write a JSON summary report to the specified file.
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Reduce log verbosity to errors only.
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

impl CliArgs {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
