use std::path::Path;

use anyhow::{Context, Result};
use ::id3::{ErrorKind, Tag, TagLike, Version};

use super::{clean, year_prefix, FieldUpdate, TagField, TagSnapshot};

const RECORDING_DATE: &str = "TDRC";
const LEGACY_YEAR: &str = "TYER";

pub(super) fn read(path: &Path) -> Result<TagSnapshot> {
    let Some(tag) = open(path)? else {
        return Ok(TagSnapshot::default());
    };

    Ok(TagSnapshot {
        title: clean(tag.title()),
        album: clean(tag.album()),
        artist: clean(tag.artist()),
        album_artist: clean(tag.album_artist()),
        genre: clean(tag.genre()),
        year: text_frame(&tag, RECORDING_DATE)
            .or_else(|| text_frame(&tag, LEGACY_YEAR))
            .and_then(year_prefix),
    })
}

pub(super) fn write(path: &Path, updates: &[FieldUpdate]) -> Result<()> {
    let mut tag = open(path)?.unwrap_or_else(Tag::new);

    for update in updates {
        let value = update.value.as_str();
        match update.field {
            TagField::Title => tag.set_title(value),
            TagField::Album => tag.set_album(value),
            TagField::Artist => tag.set_artist(value),
            TagField::AlbumArtist => tag.set_album_artist(value),
            TagField::Genre => tag.set_genre(value),
            TagField::Year => tag.set_text(RECORDING_DATE, value),
        }
    }

    tag.write_to_path(path, Version::Id3v24)
        .with_context(|| format!("failed to write ID3 tag to '{}'", path.display()))
}

/// `Ok(None)` when the file simply has no ID3 tag yet.
fn open(path: &Path) -> Result<Option<Tag>> {
    match Tag::read_from_path(path) {
        Ok(tag) => Ok(Some(tag)),
        Err(error) if matches!(error.kind, ErrorKind::NoTag) => Ok(None),
        Err(error) => Err(error)
            .with_context(|| format!("failed to read ID3 tag from '{}'", path.display())),
    }
}

fn text_frame<'a>(tag: &'a Tag, id: &str) -> Option<&'a str> {
    tag.get(id).and_then(|frame| frame.content().text())
}
