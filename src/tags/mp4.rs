use std::path::Path;

use anyhow::{Context, Result};
use mp4ameta::{Data, Fourcc, Tag};

use super::{clean, year_prefix, FieldUpdate, TagField, TagSnapshot};

const GENRE: Fourcc = Fourcc(*b"\xa9gen");

pub(super) fn read(path: &Path) -> Result<TagSnapshot> {
    let tag = open(path)?;

    let snapshot = TagSnapshot {
        title: clean(tag.title()),
        album: clean(tag.album()),
        artist: clean(tag.artist()),
        album_artist: clean(tag.album_artist()),
        genre: clean(tag.strings_of(&GENRE).next()),
        year: tag.year().and_then(year_prefix),
    };
    Ok(snapshot)
}

pub(super) fn write(path: &Path, updates: &[FieldUpdate]) -> Result<()> {
    let mut tag = open(path)?;

    for update in updates {
        let value = update.value.clone();
        match update.field {
            TagField::Title => tag.set_title(value),
            TagField::Album => tag.set_album(value),
            TagField::Artist => tag.set_artist(value),
            TagField::AlbumArtist => tag.set_album_artist(value),
            TagField::Genre => {
                tag.remove_data_of(&GENRE);
                tag.add_data(GENRE, Data::Utf8(value));
            }
            TagField::Year => tag.set_year(value),
        }
    }

    tag.write_to_path(path)
        .with_context(|| format!("failed to write MP4 atoms to '{}'", path.display()))
}

fn open(path: &Path) -> Result<Tag> {
    Tag::read_from_path(path)
        .with_context(|| format!("failed to read MP4 atoms from '{}'", path.display()))
}
