use log::{info, warn};
use serde::Serialize;

use crate::organizer::{FolderOutcome, FolderReport, SkipReason};
use crate::writer::TagWriteStats;

#[derive(Debug, Default)]
pub struct Report {
    pub folders: usize,
    pub moved: usize,
    pub would_move: usize,
    pub skipped_no_metadata: usize,
    pub skipped_target_exists: usize,
    pub errors: usize,
    pub ignored_files: usize,
    pub walk_errors: usize,
    pub tag_stats: Option<TagWriteStats>,
    pub entries: Vec<ProcessingEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Completed,
    Skipped,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingEntry {
    pub folder: String,
    pub status: ProcessingStatus,
    pub message: String,
    pub target_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub folders: usize,
    pub processed: usize,
    pub moved: usize,
    pub would_move: usize,
    pub skipped_no_metadata: usize,
    pub skipped_target_exists: usize,
    pub errors: usize,
    pub ignored_files: usize,
    pub walk_errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_stats: Option<TagWriteStats>,
    pub entries: Vec<ProcessingEntry>,
}

impl Report {
    pub fn record_listing(&mut self, ignored_files: usize, walk_errors: usize) {
        self.ignored_files += ignored_files;
        self.walk_errors += walk_errors;
    }

    pub fn record(&mut self, folder: &FolderReport) {
        self.folders += 1;

        let status = match &folder.outcome {
            FolderOutcome::Moved { .. } => {
                self.moved += 1;
                ProcessingStatus::Completed
            }
            FolderOutcome::WouldMove { .. } => {
                self.would_move += 1;
                ProcessingStatus::Completed
            }
            FolderOutcome::Skipped {
                reason: SkipReason::NoMetadata,
                ..
            } => {
                self.skipped_no_metadata += 1;
                ProcessingStatus::Skipped
            }
            FolderOutcome::Skipped {
                reason: SkipReason::TargetExists,
                ..
            } => {
                self.skipped_target_exists += 1;
                ProcessingStatus::Skipped
            }
            FolderOutcome::Failed { .. } => {
                self.errors += 1;
                ProcessingStatus::Error
            }
        };

        if let Some(stats) = &folder.tag_stats {
            self.tag_stats.get_or_insert_with(TagWriteStats::default).merge(stats);
        }

        self.entries.push(ProcessingEntry {
            folder: folder.outcome.source().display().to_string(),
            status,
            message: folder.outcome.to_string(),
            target_path: folder
                .outcome
                .target()
                .map(|target| target.display().to_string()),
        });
    }

    /// Folders that were moved, or would have been in a dry run.
    pub fn processed(&self) -> usize {
        self.moved + self.would_move
    }

    pub fn summary(&self) -> Summary {
        Summary {
            folders: self.folders,
            processed: self.processed(),
            moved: self.moved,
            would_move: self.would_move,
            skipped_no_metadata: self.skipped_no_metadata,
            skipped_target_exists: self.skipped_target_exists,
            errors: self.errors,
            ignored_files: self.ignored_files,
            walk_errors: self.walk_errors,
            tag_stats: self.tag_stats.clone(),
            entries: self.entries.clone(),
        }
    }

    pub fn emit_summary(&self) {
        info!(
            "Examined {folders} folders -- moved {moved}, would move {would_move}, no metadata {no_metadata}, target exists {exists}",
            folders = self.folders,
            moved = self.moved,
            would_move = self.would_move,
            no_metadata = self.skipped_no_metadata,
            exists = self.skipped_target_exists,
        );

        if let Some(stats) = &self.tag_stats {
            info!(
                "Tag update: {processed} files processed, {updated} updated, {skipped} skipped",
                processed = stats.files_processed,
                updated = stats.files_updated,
                skipped = stats.files_skipped,
            );
            if !stats.errors.is_empty() {
                warn!("{} audio files could not be tagged.", stats.errors.len());
            }
        }

        if self.errors > 0 || self.walk_errors > 0 {
            warn!(
                "Encountered {walk_errors} traversal errors and {errors} failed moves.",
                walk_errors = self.walk_errors,
                errors = self.errors
            );
        }
    }
}
