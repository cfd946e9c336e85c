use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::scanner;
use crate::tags::{AudioFormat, TagSnapshot};

/// Placeholder values that mean "not resolved" wherever they show up.
const UNKNOWN_SENTINELS: [&str; 6] = [
    "Unknown",
    "Unknown Author",
    "Unknown Title",
    "Unknown Genre",
    "Unknown Year",
    "0000",
];

static PART_DIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(disc|disk|part|cd|volume|vol)\s*\d+").expect("valid part directory pattern")
});

/// A source folder with its resolved metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audiobook {
    pub source_path: PathBuf,
    pub author: String,
    pub title: String,
    pub genre: Option<String>,
    pub year: Option<String>,
    pub is_multipart: bool,
}

/// Output of a single resolution stage. Merging only fills gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialMetadata {
    pub author: Option<String>,
    pub title: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
    pub is_multipart: bool,
}

impl PartialMetadata {
    pub fn fill_from(&mut self, other: PartialMetadata) {
        fill(&mut self.author, other.author);
        fill(&mut self.title, other.title);
        fill(&mut self.genre, other.genre);
        fill(&mut self.year, other.year);
        self.is_multipart |= other.is_multipart;
    }

    pub fn has_identity(&self) -> bool {
        self.author.is_some() && self.title.is_some()
    }

    pub fn into_audiobook(self, source_path: &Path) -> Option<Audiobook> {
        Some(Audiobook {
            source_path: source_path.to_path_buf(),
            author: self.author?,
            title: self.title?,
            genre: self.genre,
            year: self.year,
            is_multipart: self.is_multipart,
        })
    }
}

fn fill(slot: &mut Option<String>, candidate: Option<String>) {
    if slot.is_some() {
        return;
    }
    *slot = candidate
        .map(|value| value.trim().to_owned())
        .filter(|value| is_known(value));
}

pub fn is_known(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !UNKNOWN_SENTINELS.contains(&value)
}

/// Reads author/title (plus genre and year when present) from the embedded
/// tags of the audio files in `folder`.
///
/// The first file carrying both album and artist wins. When no direct file
/// has usable tags, subdirectories are tried in name order and a hit there
/// marks the book as multi-part.
pub fn extract_from_folder(folder: &Path) -> Option<PartialMetadata> {
    let audio_files = scanner::audio_files(folder);
    let subdirs = scanner::subdirectories(folder);
    let is_multipart = is_multipart(&audio_files, &subdirs);

    for path in &audio_files {
        let Some(format) = AudioFormat::from_path(path) else {
            continue;
        };
        match format.read(path) {
            Ok(snapshot) => {
                if let Some(mut found) = from_snapshot(snapshot) {
                    found.is_multipart = is_multipart;
                    return Some(found);
                }
            }
            Err(error) => {
                log::debug!("Skipping unreadable audio file '{}': {error:#}", path.display());
            }
        }
    }

    subdirs.iter().find_map(|subdir| {
        let mut found = extract_from_folder(subdir)?;
        found.is_multipart = true;
        Some(found)
    })
}

/// Both album and an artist must carry real values, otherwise the file
/// contributes nothing.
fn from_snapshot(snapshot: TagSnapshot) -> Option<PartialMetadata> {
    let title = snapshot.album.filter(|value| is_known(value))?;
    let author = snapshot
        .artist
        .filter(|value| is_known(value))
        .or(snapshot.album_artist.filter(|value| is_known(value)))?;

    Some(PartialMetadata {
        author: Some(author),
        title: Some(title),
        genre: snapshot.genre,
        year: snapshot.year,
        is_multipart: false,
    })
}

/// Several audio files, disc/part subfolders, or more than one numbered
/// subfolder all indicate a book split into parts.
pub fn is_multipart(audio_files: &[PathBuf], subdirs: &[PathBuf]) -> bool {
    if audio_files.len() > 1 {
        return true;
    }

    let names: Vec<&str> = subdirs
        .iter()
        .filter_map(|dir| dir.file_name().and_then(|name| name.to_str()))
        .collect();

    if names.iter().any(|name| PART_DIR.is_match(name)) {
        return true;
    }

    names
        .iter()
        .filter(|name| !name.is_empty() && name.chars().all(|ch| ch.is_ascii_digit()))
        .count()
        > 1
}
