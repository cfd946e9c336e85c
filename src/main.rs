mod benchmark;
mod cache;
mod cli;
mod config;
mod fetcher;
mod genre;
mod metadata;
mod organizer;
mod parser;
mod paths;
mod pipeline;
mod report;
mod scanner;
mod tags;
mod writer;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use env_logger::{Builder, Target, WriteStyle};
use log::LevelFilter;

use crate::cache::MetadataCache;
use crate::fetcher::{BookLookup, GoogleBooksFetcher};
use crate::organizer::Organizer;
use crate::pipeline::Pipeline;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli_args = cli::CliArgs::parse();

    let config = config::Config::from_args(cli_args)?;
    init_logging(config.quiet, config.log_file.as_deref())?;

    let mode = if config.dry_run() { "Dry run" } else { "Operation" };
    log::info!(
        "Starting audiobook organization ({mode}): input '{}', output '{}'",
        config.input.display(),
        config.output.display()
    );

    let cache = if config.fetch_metadata {
        config.cache.as_ref().and_then(|cache_config| {
            match cache::open(cache_config) {
                Ok(cache) => Some(cache),
                Err(error) => {
                    log::warn!("Metadata cache unavailable, continuing without it: {error:#}");
                    None
                }
            }
        })
    } else {
        None
    };

    let lookup: Option<Arc<dyn BookLookup>> = if config.fetch_metadata {
        let fetcher =
            GoogleBooksFetcher::new(&config.api_url, config.api_key.clone(), cache.clone())?;
        Some(Arc::new(fetcher))
    } else {
        None
    };

    let pipeline = Pipeline::new(lookup);
    log::debug!("Resolution stages: {:?}", pipeline.stages());

    let listing = scanner::source_folders(&config.input, &config.output);
    let mut organizer = Organizer::new(
        pipeline,
        &config.output,
        &config.naming,
        &config.structure,
        config.dry_run(),
    );
    if config.write_tags {
        organizer = organizer.with_tag_writer();
    }
    if config.benchmark {
        organizer = organizer.with_benchmark();
    }

    let mut report = report::Report::default();
    report.record_listing(listing.ignored_files, listing.walk_errors);
    for folder in organizer.process_all(&listing.folders, config.workers)? {
        report.record(&folder);
    }

    report.emit_summary();
    println!("\n{mode} complete. {} folders processed.", report.processed());

    if let Some(benchmark) = organizer.benchmark() {
        benchmark.emit_summary();
    }
    if let Some(cache) = &cache {
        log::debug!("Metadata cache holds {} entries", cache.len());
    }

    if let Some(summary_path) = &config.summary_json {
        write_summary(summary_path, &report)?;
    }

    Ok(())
}

fn init_logging(quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if quiet { "error" } else { "info" };

    let mut builder =
        Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    if quiet {
        builder.filter_level(LevelFilter::Error);
    }
    if let Some(path) = log_file {
        let file = open_log_file(path)?;
        builder
            .target(Target::Pipe(Box::new(TeeWriter { file })))
            .write_style(WriteStyle::Never);
    }
    let _ = builder.try_init();
    Ok(())
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("failed to create directories for log '{}'", parent.display())
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file '{}'", path.display()))
}

/// Sends each log record to stderr and appends it to the log file.
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

fn write_summary(path: &Path, report: &report::Report) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create directories for summary '{}'",
                parent.display()
            )
        })?;
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create summary file '{}'", path.display()))?;
    let writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &report.summary())
        .with_context(|| format!("failed to write JSON summary to '{}'", path.display()))?;
    Ok(())
}
