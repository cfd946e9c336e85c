use std::path::Path;

use anyhow::{Context, Result};
use lofty::config::{ParseOptions, WriteOptions};
use lofty::file::TaggedFile;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};

use super::{clean, year_prefix, FieldUpdate, TagField, TagSnapshot};

pub(super) fn read(path: &Path) -> Result<TagSnapshot> {
    let tagged = open(path)?;
    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return Ok(TagSnapshot::default());
    };

    let snapshot = TagSnapshot {
        title: clean(tag.title().as_deref()),
        album: clean(tag.album().as_deref()),
        artist: clean(tag.artist().as_deref()),
        album_artist: clean(tag.get_string(&ItemKey::AlbumArtist)),
        genre: clean(tag.genre().as_deref()),
        year: tag
            .get_string(&ItemKey::RecordingDate)
            .and_then(year_prefix)
            .or_else(|| tag.year().map(|year| year.to_string())),
    };
    Ok(snapshot)
}

pub(super) fn write(path: &Path, updates: &[FieldUpdate]) -> Result<()> {
    let mut tagged = open(path)?;
    if tagged.primary_tag().is_none() {
        let tag_type = tagged.primary_tag_type();
        tagged.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged
        .primary_tag_mut()
        .with_context(|| format!("no writable Vorbis comment block in '{}'", path.display()))?;

    for update in updates {
        let value = update.value.clone();
        match update.field {
            TagField::Title => tag.set_title(value),
            TagField::Album => tag.set_album(value),
            TagField::Artist => tag.set_artist(value),
            TagField::AlbumArtist => {
                tag.insert_text(ItemKey::AlbumArtist, value);
            }
            TagField::Genre => tag.set_genre(value),
            TagField::Year => {
                tag.insert_text(ItemKey::RecordingDate, value);
            }
        }
    }

    tagged
        .save_to_path(path, WriteOptions::default())
        .with_context(|| format!("failed to write Vorbis comments to '{}'", path.display()))
}

fn open(path: &Path) -> Result<TaggedFile> {
    // Only the tag is needed; stream properties are never read.
    Probe::open(path)
        .map(|probe| probe.options(ParseOptions::new().read_properties(false)))
        .and_then(|probe| probe.read())
        .with_context(|| format!("failed to read Vorbis comments from '{}'", path.display()))
}
