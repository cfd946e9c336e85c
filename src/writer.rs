use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::metadata::{self, Audiobook};
use crate::scanner;
use crate::tags::{AudioFormat, FieldUpdate, TagField, TagSnapshot};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagWriteStats {
    pub files_processed: usize,
    pub files_updated: usize,
    pub files_skipped: usize,
    pub errors: Vec<TagWriteError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagWriteError {
    pub file: String,
    pub message: String,
}

impl TagWriteStats {
    pub fn merge(&mut self, other: &TagWriteStats) {
        self.files_processed += other.files_processed;
        self.files_updated += other.files_updated;
        self.files_skipped += other.files_skipped;
        self.errors.extend(other.errors.iter().cloned());
    }
}

/// Brings embedded tags in line with resolved metadata. In dry-run mode
/// changes are only counted.
#[derive(Debug, Clone, Copy)]
pub struct TagWriter {
    dry_run: bool,
}

enum FileResult {
    Updated,
    Unchanged,
    Unreadable,
}

impl TagWriter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn update(&self, book: &Audiobook) -> TagWriteStats {
        let mut stats = TagWriteStats::default();

        for path in scanner::audio_files_recursive(&book.source_path) {
            match self.update_file(&path, book) {
                Ok(FileResult::Updated) => {
                    stats.files_processed += 1;
                    stats.files_updated += 1;
                }
                Ok(FileResult::Unchanged) => {
                    stats.files_processed += 1;
                    stats.files_skipped += 1;
                }
                Ok(FileResult::Unreadable) => {
                    stats.files_skipped += 1;
                }
                Err(error) => {
                    log::warn!("Failed to update tags for '{}': {error:#}", path.display());
                    stats.errors.push(TagWriteError {
                        file: file_name(&path),
                        message: format!("{error:#}"),
                    });
                }
            }
        }

        stats
    }

    fn update_file(&self, path: &Path, book: &Audiobook) -> Result<FileResult> {
        let Some(format) = AudioFormat::from_path(path) else {
            return Ok(FileResult::Unreadable);
        };
        let snapshot = match format.read(path) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                log::debug!("Skipping tags of '{}': {error:#}", path.display());
                return Ok(FileResult::Unreadable);
            }
        };

        let updates = stage_updates(&snapshot, book);
        if updates.is_empty() {
            return Ok(FileResult::Unchanged);
        }

        if !self.dry_run {
            format.write(path, &updates)?;
            log::debug!("Tags updated for {}", file_name(path));
        }
        Ok(FileResult::Updated)
    }
}

/// Every known field of `book` whose tag value differs.
pub fn stage_updates(snapshot: &TagSnapshot, book: &Audiobook) -> Vec<FieldUpdate> {
    let desired = [
        (TagField::Title, Some(book.title.as_str())),
        (TagField::Album, Some(book.title.as_str())),
        (TagField::Artist, Some(book.author.as_str())),
        (TagField::AlbumArtist, Some(book.author.as_str())),
        (TagField::Genre, book.genre.as_deref()),
        (TagField::Year, book.year.as_deref()),
    ];

    desired
        .into_iter()
        .filter_map(|(field, value)| {
            let value = value.filter(|value| metadata::is_known(value))?;
            if snapshot.get(field) == Some(value) {
                return None;
            }
            Some(FieldUpdate {
                field,
                value: value.to_owned(),
            })
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
