//! Read/write access to embedded tags, one backend per container family.

use std::path::Path;

use anyhow::Result;

mod id3;
mod mp4;
mod vorbis;

/// Known tag fields of an audio file. Empty values are normalized to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSnapshot {
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
}

impl TagSnapshot {
    pub fn get(&self, field: TagField) -> Option<&str> {
        let value = match field {
            TagField::Title => &self.title,
            TagField::Album => &self.album,
            TagField::Artist => &self.artist,
            TagField::AlbumArtist => &self.album_artist,
            TagField::Genre => &self.genre,
            TagField::Year => &self.year,
        };
        value.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagField {
    Title,
    Album,
    Artist,
    AlbumArtist,
    Genre,
    Year,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub field: TagField,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// MP3 files carrying ID3v2 frames.
    Id3,
    /// MP4/M4A/M4B files carrying iTunes-style atoms.
    Mp4,
    /// FLAC and Ogg files carrying Vorbis comments.
    VorbisComment,
}

impl AudioFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp3" => Some(Self::Id3),
            "m4a" | "m4b" => Some(Self::Mp4),
            "flac" | "ogg" | "opus" => Some(Self::VorbisComment),
            _ => None,
        }
    }

    pub fn read(self, path: &Path) -> Result<TagSnapshot> {
        match self {
            Self::Id3 => id3::read(path),
            Self::Mp4 => mp4::read(path),
            Self::VorbisComment => vorbis::read(path),
        }
    }

    /// Applies every update to the file's tag and saves the file once.
    pub fn write(self, path: &Path, updates: &[FieldUpdate]) -> Result<()> {
        match self {
            Self::Id3 => id3::write(path, updates),
            Self::Mp4 => mp4::write(path, updates),
            Self::VorbisComment => vorbis::write(path, updates),
        }
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// First four characters of a date such as `2004-05-01`.
fn year_prefix(date: &str) -> Option<String> {
    let year: String = date.trim().chars().take(4).collect();
    (!year.is_empty()).then_some(year)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    #[test]
    fn selects_format_by_extension() {
        assert_eq!(AudioFormat::from_path(Path::new("a.MP3")), Some(AudioFormat::Id3));
        assert_eq!(AudioFormat::from_path(Path::new("a.m4b")), Some(AudioFormat::Mp4));
        assert_eq!(
            AudioFormat::from_path(Path::new("a.flac")),
            Some(AudioFormat::VorbisComment)
        );
        assert_eq!(AudioFormat::from_path(Path::new("a.wav")), None);
        assert_eq!(AudioFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn id3_round_trips_known_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("track.mp3");
        fs::write(&path, [0_u8; 16]).unwrap();

        let updates = [
            FieldUpdate { field: TagField::Title, value: "Dune".into() },
            FieldUpdate { field: TagField::Album, value: "Dune".into() },
            FieldUpdate { field: TagField::Artist, value: "Frank Herbert".into() },
            FieldUpdate { field: TagField::AlbumArtist, value: "Frank Herbert".into() },
            FieldUpdate { field: TagField::Genre, value: "Sci-Fi".into() },
            FieldUpdate { field: TagField::Year, value: "1965".into() },
        ];
        AudioFormat::Id3.write(&path, &updates).expect("write tags");

        let snapshot = AudioFormat::Id3.read(&path).expect("read tags");
        assert_eq!(snapshot.get(TagField::Title), Some("Dune"));
        assert_eq!(snapshot.get(TagField::Album), Some("Dune"));
        assert_eq!(snapshot.get(TagField::Artist), Some("Frank Herbert"));
        assert_eq!(snapshot.get(TagField::AlbumArtist), Some("Frank Herbert"));
        assert_eq!(snapshot.get(TagField::Genre), Some("Sci-Fi"));
        assert_eq!(snapshot.get(TagField::Year), Some("1965"));
    }

    /// `fLaC` marker followed by a single STREAMINFO block (44.1 kHz,
    /// stereo, 16 bit, no frames).
    fn write_minimal_flac(path: &Path) {
        let mut bytes = b"fLaC".to_vec();
        bytes.extend_from_slice(&[0x80, 0x00, 0x00, 0x22]);
        bytes.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]);
        bytes.extend_from_slice(&[0x00; 6]);
        bytes.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(&[0x00; 16]);
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn vorbis_comments_round_trip_known_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("track.flac");
        write_minimal_flac(&path);

        assert_eq!(AudioFormat::VorbisComment.read(&path).unwrap(), TagSnapshot::default());

        let updates = [
            FieldUpdate { field: TagField::Album, value: "Emma".into() },
            FieldUpdate { field: TagField::Artist, value: "Jane Austen".into() },
            FieldUpdate { field: TagField::AlbumArtist, value: "Jane Austen".into() },
            FieldUpdate { field: TagField::Genre, value: "Romance".into() },
            FieldUpdate { field: TagField::Year, value: "1815".into() },
        ];
        AudioFormat::VorbisComment.write(&path, &updates).expect("write comments");

        let snapshot = AudioFormat::VorbisComment.read(&path).expect("read comments");
        assert_eq!(snapshot.get(TagField::Album), Some("Emma"));
        assert_eq!(snapshot.get(TagField::Artist), Some("Jane Austen"));
        assert_eq!(snapshot.get(TagField::AlbumArtist), Some("Jane Austen"));
        assert_eq!(snapshot.get(TagField::Genre), Some("Romance"));
        assert_eq!(snapshot.get(TagField::Year), Some("1815"));
        assert_eq!(snapshot.get(TagField::Title), None);
    }

    #[test]
    fn mp4_write_refuses_non_mp4_data() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("book.m4b");
        fs::write(&path, b"definitely not an mp4").unwrap();

        let update = [FieldUpdate { field: TagField::Album, value: "Dune".into() }];
        assert!(AudioFormat::Mp4.write(&path, &update).is_err());
        assert_eq!(fs::read(&path).unwrap(), b"definitely not an mp4");
    }

    #[test]
    fn untagged_mp3_reads_as_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blank.mp3");
        fs::write(&path, [0_u8; 16]).unwrap();

        assert_eq!(AudioFormat::Id3.read(&path).unwrap(), TagSnapshot::default());
    }

    #[test]
    fn malformed_containers_fail_to_read() {
        let temp = TempDir::new().unwrap();
        let m4b = temp.path().join("book.m4b");
        let flac = temp.path().join("book.flac");
        fs::write(&m4b, b"definitely not an mp4").unwrap();
        fs::write(&flac, b"definitely not a flac").unwrap();

        assert!(AudioFormat::Mp4.read(&m4b).is_err());
        assert!(AudioFormat::VorbisComment.read(&flac).is_err());
    }

    #[test]
    fn year_prefix_takes_four_characters() {
        assert_eq!(year_prefix("2001-01-01").as_deref(), Some("2001"));
        assert_eq!(year_prefix(" 1999 ").as_deref(), Some("1999"));
        assert_eq!(year_prefix(""), None);
    }
}
