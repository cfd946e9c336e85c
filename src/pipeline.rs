//! Ordered metadata resolution for a single source folder.

use std::path::Path;
use std::sync::Arc;

use crate::benchmark::{BookTiming, Phase};
use crate::fetcher::{BookDetails, BookLookup};
use crate::genre::{self, UNKNOWN_GENRE};
use crate::metadata::{self, Audiobook, PartialMetadata};
use crate::parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    EmbeddedTags,
    FolderName,
    Enrichment,
    GenreInference,
}

impl Stage {
    /// Identity stages are the ones able to supply author and title.
    fn is_identity(self) -> bool {
        matches!(self, Stage::EmbeddedTags | Stage::FolderName)
    }

    fn phase(self) -> Phase {
        match self {
            Stage::EmbeddedTags | Stage::FolderName => Phase::MetadataExtraction,
            Stage::Enrichment => Phase::ApiFetch,
            Stage::GenreInference => Phase::GenreInference,
        }
    }
}

impl From<BookDetails> for PartialMetadata {
    fn from(details: BookDetails) -> Self {
        PartialMetadata {
            genre: Some(details.genre),
            year: Some(details.year),
            ..PartialMetadata::default()
        }
    }
}

pub struct Pipeline {
    stages: Vec<Stage>,
    lookup: Option<Arc<dyn BookLookup>>,
}

impl Pipeline {
    /// Enrichment is part of the pipeline only when a lookup is supplied.
    pub fn new(lookup: Option<Arc<dyn BookLookup>>) -> Self {
        let mut stages = vec![Stage::EmbeddedTags, Stage::FolderName];
        if lookup.is_some() {
            stages.push(Stage::Enrichment);
        }
        stages.push(Stage::GenreInference);
        Self { stages, lookup }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs every stage in order, each one only filling what is still unknown.
    ///
    /// Returns `None` when author or title cannot be determined.
    pub fn resolve(&self, folder: &Path, timing: &mut BookTiming) -> Option<Audiobook> {
        let mut resolved = PartialMetadata::default();

        for stage in &self.stages {
            if stage.is_identity() {
                if resolved.has_identity() {
                    continue;
                }
            } else if !resolved.has_identity() {
                return None;
            }

            let found = timing.time(stage.phase(), || self.run_stage(*stage, folder, &resolved));
            if let Some(found) = found {
                resolved.fill_from(found);
            }
        }

        resolved.into_audiobook(folder)
    }

    fn run_stage(
        &self,
        stage: Stage,
        folder: &Path,
        resolved: &PartialMetadata,
    ) -> Option<PartialMetadata> {
        match stage {
            Stage::EmbeddedTags => metadata::extract_from_folder(folder),
            Stage::FolderName => {
                let name = folder.file_name()?.to_str()?;
                let parsed = parser::parse_folder_name(name)?;
                Some(PartialMetadata {
                    author: Some(parsed.author),
                    title: Some(parsed.title),
                    ..PartialMetadata::default()
                })
            }
            Stage::Enrichment => {
                if resolved.genre.is_some() && resolved.year.is_some() {
                    return None;
                }
                let lookup = self.lookup.as_ref()?;
                let (title, author) = (resolved.title.as_deref()?, resolved.author.as_deref()?);
                lookup.lookup(title, author).map(PartialMetadata::from)
            }
            Stage::GenreInference => {
                if resolved.genre.is_some() {
                    return None;
                }
                let (title, author) = (resolved.title.as_deref()?, resolved.author.as_deref()?);
                let inferred = genre::infer_genre(title, author, None);
                if inferred == UNKNOWN_GENRE {
                    return None;
                }
                log::debug!("Inferred genre '{inferred}' for '{title}'");
                Some(PartialMetadata {
                    genre: Some(inferred.to_owned()),
                    ..PartialMetadata::default()
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use id3::{Tag, TagLike, Version};
    use tempfile::TempDir;

    struct StubLookup {
        details: Option<BookDetails>,
        calls: AtomicUsize,
    }

    impl StubLookup {
        fn new(genre: &str, year: &str) -> Arc<Self> {
            Arc::new(Self {
                details: Some(BookDetails {
                    genre: genre.to_string(),
                    year: year.to_string(),
                }),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl BookLookup for StubLookup {
        fn lookup(&self, _title: &str, _author: &str) -> Option<BookDetails> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.details.clone()
        }
    }

    fn folder(temp: &TempDir, name: &str) -> std::path::PathBuf {
        let path = temp.path().join(name);
        fs::create_dir_all(&path).unwrap();
        path
    }

    #[test]
    fn resolves_from_folder_name_and_infers_genre() {
        let temp = TempDir::new().unwrap();
        let path = folder(&temp, "Dragon Magic - Jane Doe");
        let mut timing = BookTiming::new("Dragon Magic - Jane Doe");

        let book = Pipeline::new(None).resolve(&path, &mut timing).expect("resolved");

        assert_eq!(book.author, "Jane Doe");
        assert_eq!(book.title, "Dragon Magic");
        assert_eq!(book.genre.as_deref(), Some("Fantasy"));
        assert_eq!(book.year, None);
        assert!(!book.is_multipart);
    }

    #[test]
    fn embedded_tags_take_precedence_over_folder_name() {
        let temp = TempDir::new().unwrap();
        let path = folder(&temp, "Wrong Title - Wrong Author");
        let mut tag = Tag::new();
        tag.set_artist("Frank Herbert");
        tag.set_album("Dune");
        tag.set_genre("Sci-Fi");
        let file = path.join("01.mp3");
        fs::write(&file, [0_u8; 16]).unwrap();
        tag.write_to_path(&file, Version::Id3v24).unwrap();

        let book = Pipeline::new(None)
            .resolve(&path, &mut BookTiming::default())
            .expect("resolved");

        assert_eq!(book.author, "Frank Herbert");
        assert_eq!(book.title, "Dune");
        assert_eq!(book.genre.as_deref(), Some("Sci-Fi"));
    }

    #[test]
    fn placeholder_tags_do_not_mix_with_folder_name() {
        let temp = TempDir::new().unwrap();
        let path = folder(&temp, "Project Hail Mary - Andy Weir");
        let mut tag = Tag::new();
        tag.set_artist("Unknown Author");
        tag.set_album("Some Other Book");
        tag.set_genre("Horror");
        tag.set_text("TDRC", "1999");
        let file = path.join("01.mp3");
        fs::write(&file, [0_u8; 16]).unwrap();
        tag.write_to_path(&file, Version::Id3v24).unwrap();

        let book = Pipeline::new(None)
            .resolve(&path, &mut BookTiming::default())
            .expect("resolved");

        assert_eq!(book.author, "Andy Weir");
        assert_eq!(book.title, "Project Hail Mary");
        assert_eq!(book.genre, None);
        assert_eq!(book.year, None);
    }

    #[test]
    fn unparseable_folder_without_tags_is_unresolved() {
        let temp = TempDir::new().unwrap();
        let path = folder(&temp, "random_stuff");
        let lookup = StubLookup::new("Fiction", "2001");

        let result = Pipeline::new(Some(lookup.clone())).resolve(&path, &mut BookTiming::default());

        assert!(result.is_none());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0, "no lookup without identity");
    }

    #[test]
    fn enrichment_fills_genre_and_year() {
        let temp = TempDir::new().unwrap();
        let path = folder(&temp, "Project Hail Mary - Andy Weir");
        let lookup = StubLookup::new("Fiction", "2021");

        let book = Pipeline::new(Some(lookup.clone()))
            .resolve(&path, &mut BookTiming::default())
            .expect("resolved");

        assert_eq!(book.genre.as_deref(), Some("Fiction"));
        assert_eq!(book.year.as_deref(), Some("2021"));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sentinel_enrichment_leaves_genre_for_inference() {
        let temp = TempDir::new().unwrap();
        let path = folder(&temp, "Murder Mystery - Jane Doe");
        let lookup = StubLookup::new(UNKNOWN_GENRE, "0000");

        let book = Pipeline::new(Some(lookup))
            .resolve(&path, &mut BookTiming::default())
            .expect("resolved");

        assert_eq!(book.genre.as_deref(), Some("Mystery"));
        assert_eq!(book.year, None);
    }

    #[test]
    fn stage_order_includes_enrichment_only_with_lookup() {
        assert_eq!(
            Pipeline::new(None).stages(),
            &[Stage::EmbeddedTags, Stage::FolderName, Stage::GenreInference]
        );
        let lookup: Arc<dyn BookLookup> = StubLookup::new("Fiction", "2001");
        assert_eq!(
            Pipeline::new(Some(lookup)).stages(),
            &[
                Stage::EmbeddedTags,
                Stage::FolderName,
                Stage::Enrichment,
                Stage::GenreInference
            ]
        );
    }
}
