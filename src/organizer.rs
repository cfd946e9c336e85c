use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::benchmark::{Benchmark, BookTiming, Phase};
use crate::paths;
use crate::pipeline::Pipeline;
use crate::scanner;
use crate::writer::{TagWriteStats, TagWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoMetadata,
    TargetExists,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoMetadata => f.write_str("Could not determine metadata"),
            SkipReason::TargetExists => f.write_str("Target exists"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderOutcome {
    Moved { source: PathBuf, target: PathBuf },
    WouldMove { source: PathBuf, target: PathBuf },
    Skipped { source: PathBuf, reason: SkipReason },
    Failed { source: PathBuf, message: String },
}

impl FolderOutcome {
    pub fn source(&self) -> &Path {
        match self {
            FolderOutcome::Moved { source, .. }
            | FolderOutcome::WouldMove { source, .. }
            | FolderOutcome::Skipped { source, .. }
            | FolderOutcome::Failed { source, .. } => source,
        }
    }

    pub fn target(&self) -> Option<&Path> {
        match self {
            FolderOutcome::Moved { target, .. } | FolderOutcome::WouldMove { target, .. } => {
                Some(target)
            }
            _ => None,
        }
    }
}

impl fmt::Display for FolderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FolderOutcome::Moved { source, target } => {
                write!(f, "MOVED: {} -> {}", source.display(), target.display())
            }
            FolderOutcome::WouldMove { source, target } => write!(
                f,
                "DRY-RUN: Would move {} -> {}",
                source.display(),
                target.display()
            ),
            FolderOutcome::Skipped { source, reason } => {
                write!(f, "SKIPPED: {} ({reason})", folder_name(source))
            }
            FolderOutcome::Failed { source, message } => {
                write!(f, "ERROR: Failed to move {}: {message}", source.display())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderReport {
    pub outcome: FolderOutcome,
    pub tag_stats: Option<TagWriteStats>,
}

/// Moves source folders into the output layout, one independent task per
/// folder.
pub struct Organizer {
    pipeline: Pipeline,
    tag_writer: Option<TagWriter>,
    output: PathBuf,
    naming: String,
    structure: Vec<String>,
    dry_run: bool,
    benchmark: Option<Benchmark>,
    claims: Mutex<HashSet<PathBuf>>,
}

impl Organizer {
    pub fn new(
        pipeline: Pipeline,
        output: &Path,
        naming: &str,
        structure: &[String],
        dry_run: bool,
    ) -> Self {
        Self {
            pipeline,
            tag_writer: None,
            output: output.to_path_buf(),
            naming: naming.to_owned(),
            structure: structure.to_vec(),
            dry_run,
            benchmark: None,
            claims: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_tag_writer(mut self) -> Self {
        self.tag_writer = Some(TagWriter::new(self.dry_run));
        self
    }

    pub fn with_benchmark(mut self) -> Self {
        self.benchmark = Some(Benchmark::new());
        self
    }

    pub fn benchmark(&self) -> Option<&Benchmark> {
        self.benchmark.as_ref()
    }

    /// Processes every folder on a pool of `workers` threads (all CPUs when
    /// `None`). Reports come back in input order.
    pub fn process_all(
        &self,
        folders: &[PathBuf],
        workers: Option<usize>,
    ) -> Result<Vec<FolderReport>> {
        let mut builder = ThreadPoolBuilder::new();
        if let Some(workers) = workers {
            builder = builder.num_threads(workers);
        }
        let pool = builder.build().context("failed to build worker pool")?;

        Ok(pool.install(|| {
            folders
                .par_iter()
                .map(|folder| self.process_folder(folder))
                .collect()
        }))
    }

    pub fn process_folder(&self, folder: &Path) -> FolderReport {
        let started = Instant::now();
        let mut timing = BookTiming::new(folder_name(folder));

        let report = self.organize(folder, &mut timing);
        announce(&report.outcome);

        if let Some(benchmark) = &self.benchmark {
            timing.total = started.elapsed();
            benchmark.record(timing);
        }
        report
    }

    fn organize(&self, folder: &Path, timing: &mut BookTiming) -> FolderReport {
        let source = folder.to_path_buf();

        let Some(book) = self.pipeline.resolve(folder, timing) else {
            return FolderReport {
                outcome: FolderOutcome::Skipped {
                    source,
                    reason: SkipReason::NoMetadata,
                },
                tag_stats: None,
            };
        };
        if book.is_multipart {
            log::debug!("Multi-part audiobook detected: {}", folder.display());
        }

        let target = paths::build_target_path(&book, &self.output, &self.naming, &self.structure);
        if !self.claim(&target) {
            return FolderReport {
                outcome: FolderOutcome::Skipped {
                    source,
                    reason: SkipReason::TargetExists,
                },
                tag_stats: None,
            };
        }

        // Tags are only touched once the target is claimed.
        let tag_stats = self.tag_writer.map(|writer| {
            let stats = timing.time(Phase::TagUpdate, || writer.update(&book));
            timing.file_count = stats.files_processed + stats.files_skipped + stats.errors.len();
            stats
        });
        if tag_stats.is_none() && self.benchmark.is_some() {
            timing.file_count = scanner::audio_files_recursive(folder).len();
        }

        let outcome = if self.dry_run {
            FolderOutcome::WouldMove { source, target }
        } else {
            match timing.time(Phase::FileMove, || move_folder(&source, &target)) {
                Ok(()) => FolderOutcome::Moved { source, target },
                Err(error) => FolderOutcome::Failed {
                    source,
                    message: format!("{error:#}"),
                },
            }
        };

        FolderReport { outcome, tag_stats }
    }

    /// Reserves `target` for the calling task. Fails when the path already
    /// exists on disk or another task got there first.
    fn claim(&self, target: &Path) -> bool {
        let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        if target.exists() || claims.contains(target) {
            return false;
        }
        claims.insert(target.to_path_buf())
    }
}

fn move_folder(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(source, target)?;
    Ok(())
}

fn announce(outcome: &FolderOutcome) {
    println!("{outcome}");
    match outcome {
        FolderOutcome::Moved { .. } | FolderOutcome::WouldMove { .. } => log::info!("{outcome}"),
        FolderOutcome::Skipped { .. } => log::warn!("{outcome}"),
        FolderOutcome::Failed { .. } => log::error!("{outcome}"),
    }
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
