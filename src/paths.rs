use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::metadata::{self, Audiobook};

pub const DEFAULT_NAMING: &str = "{title} - {author}";

static ILLEGAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid illegal-character pattern"));

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("valid placeholder pattern"));

/// Removes characters that are not allowed in file or folder names.
pub fn sanitize_filename(name: &str) -> String {
    ILLEGAL_CHARS.replace_all(name, "").into_owned()
}

/// Builds `base/<structure...>/<naming>` for a resolved audiobook.
///
/// Each structure entry and each `{field}` placeholder in `naming` is looked up
/// on the audiobook; unknown or unsupported fields become `Unknown <Field>`.
pub fn build_target_path(
    book: &Audiobook,
    base_dir: &Path,
    naming: &str,
    structure: &[String],
) -> PathBuf {
    let mut target = base_dir.to_path_buf();
    for field in structure {
        target.push(field_value(book, field));
    }

    let folder_name = PLACEHOLDER.replace_all(naming, |caps: &Captures<'_>| {
        field_value(book, &caps[1])
    });
    target.push(folder_name.as_ref());
    target
}

fn field_value(book: &Audiobook, field: &str) -> String {
    let raw = match field.to_ascii_lowercase().as_str() {
        "author" => Some(book.author.as_str()),
        "title" => Some(book.title.as_str()),
        "genre" => book.genre.as_deref(),
        "year" => book.year.as_deref(),
        _ => None,
    };

    raw.filter(|value| metadata::is_known(value))
        .map(|value| sanitize_filename(value.trim()).trim().to_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| format!("Unknown {}", title_case(field)))
}

fn title_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut at_word_start = true;
    for ch in field.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(author: &str, title: &str) -> Audiobook {
        Audiobook {
            source_path: PathBuf::from("/library/source"),
            author: author.to_string(),
            title: title.to_string(),
            genre: None,
            year: None,
            is_multipart: false,
        }
    }

    #[test]
    fn sanitize_strips_illegal_characters() {
        assert_eq!(sanitize_filename(r#"a<b>c:d"e/f\g|h?i*j"#), "abcdefghij");
        assert_eq!(sanitize_filename("Dune: Messiah"), "Dune Messiah");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for input in ["plain", "what? / why*", r#"<<>>::""//\\||??**"#, ""] {
            let once = sanitize_filename(input);
            assert_eq!(sanitize_filename(&once), once);
            assert!(!once.contains(['<', '>', ':', '"', '/', '\\', '|', '?', '*']));
        }
    }

    #[test]
    fn builds_nested_structure_and_name() {
        let book = book("Brandon Sanderson", "The Way of Kings");
        let target = build_target_path(
            &book,
            Path::new("/output"),
            "{author} - {title}",
            &["author".to_string()],
        );

        assert_eq!(
            target,
            PathBuf::from("/output/Brandon Sanderson/Brandon Sanderson - The Way of Kings")
        );
    }

    #[test]
    fn missing_fields_default_to_unknown() {
        let book = book("Andy Weir", "Project Hail Mary");
        let target = build_target_path(
            &book,
            Path::new("/output"),
            "{title} ({year})",
            &["genre".to_string(), "narrator".to_string()],
        );

        assert_eq!(
            target,
            PathBuf::from("/output/Unknown Genre/Unknown Narrator/Project Hail Mary (Unknown Year)")
        );
    }

    #[test]
    fn field_values_are_sanitized() {
        let mut book = book("AC/DC", "What?: A Story");
        book.genre = Some("Sci-Fi".to_string());
        book.year = Some("2001".to_string());
        let target = build_target_path(
            &book,
            Path::new("/output"),
            "{year} - {title}",
            &["genre".to_string(), "author".to_string()],
        );

        assert_eq!(target, PathBuf::from("/output/Sci-Fi/ACDC/2001 - What A Story"));
    }

    #[test]
    fn value_empty_after_sanitizing_becomes_unknown() {
        let book = book("???", "Title");
        let target = build_target_path(&book, Path::new("/out"), "{title}", &["author".into()]);
        assert_eq!(target, PathBuf::from("/out/Unknown Author/Title"));
    }

    #[test]
    fn title_cases_field_names() {
        assert_eq!(title_case("narrator"), "Narrator");
        assert_eq!(title_case("series_name"), "Series_Name");
    }
}
