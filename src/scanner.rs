use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Audio extensions the organizer reads and writes tags for.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["mp3", "m4a", "m4b", "flac", "ogg", "opus"];

#[derive(Debug, Default)]
pub struct FolderListing {
    pub folders: Vec<PathBuf>,
    pub ignored_files: usize,
    pub walk_errors: usize,
}

/// Lists the immediate subdirectories of `root` in name order, leaving out
/// `exclude` (the output directory when it lives inside the input).
pub fn source_folders(root: &Path, exclude: &Path) -> FolderListing {
    let mut listing = FolderListing::default();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => {
                if entry.path() == exclude {
                    log::debug!("Not treating output directory '{}' as a source", exclude.display());
                    continue;
                }
                listing.folders.push(entry.into_path());
            }
            Ok(entry) => {
                listing.ignored_files += 1;
                log::debug!("Skipping file: {} (Not a folder)", entry.path().display());
            }
            Err(error) => {
                listing.walk_errors += 1;
                log_walk_error(&error);
            }
        }
    }

    listing
}

/// Supported audio files directly inside `folder`.
pub fn audio_files(folder: &Path) -> Vec<PathBuf> {
    entries(folder, Some(1))
        .filter(is_audio_file)
        .map(DirEntry::into_path)
        .collect()
}

/// Supported audio files anywhere below `folder`.
pub fn audio_files_recursive(folder: &Path) -> Vec<PathBuf> {
    entries(folder, None)
        .filter(is_audio_file)
        .map(DirEntry::into_path)
        .collect()
}

pub fn subdirectories(folder: &Path) -> Vec<PathBuf> {
    entries(folder, Some(1))
        .filter(|entry| entry.file_type().is_dir())
        .map(DirEntry::into_path)
        .collect()
}

pub fn has_supported_extension(path: &Path) -> bool {
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(value) => value.to_ascii_lowercase(),
        None => return false,
    };

    SUPPORTED_EXTENSIONS.iter().any(|allowed| *allowed == ext)
}

fn entries(folder: &Path, max_depth: Option<usize>) -> impl Iterator<Item = DirEntry> {
    let mut walker = WalkDir::new(folder).min_depth(1).sort_by_file_name();
    if let Some(limit) = max_depth {
        walker = walker.max_depth(limit);
    }

    walker.into_iter().filter_map(|entry| match entry {
        Ok(entry) => Some(entry),
        Err(error) => {
            log_walk_error(&error);
            None
        }
    })
}

fn is_audio_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file() && has_supported_extension(entry.path())
}

fn log_walk_error(error: &walkdir::Error) {
    match error.path() {
        Some(path) => log::warn!("Traversal error on '{}': {error}", path.display()),
        None => log::warn!("Traversal error: {error}"),
    }
}
