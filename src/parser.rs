use once_cell::sync::Lazy;
use regex::Regex;

static AUTHOR_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<author>[^-]+) - (?P<title>.+)").expect("valid author-title pattern")
});

static TITLE_AUTHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<title>.+) - (?P<author>[^-]+)").expect("valid title-author pattern")
});

const LEADING_ARTICLES: [&str; 3] = ["the ", "a ", "an "];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub author: String,
    pub title: String,
}

/// Splits a folder name such as `Title - Author` or `Author - Title`.
///
/// `Title - Author` is preferred unless the would-be author starts with a
/// leading article, which usually means the halves are the other way round.
pub fn parse_folder_name(name: &str) -> Option<ParsedName> {
    if let Some(candidate) = match_pattern(&TITLE_AUTHOR, name) {
        if !starts_with_article(&candidate.author) {
            return Some(candidate);
        }
    }

    match_pattern(&AUTHOR_TITLE, name)
}

fn match_pattern(pattern: &Regex, name: &str) -> Option<ParsedName> {
    let caps = pattern.captures(name)?;
    Some(ParsedName {
        author: caps["author"].trim().to_owned(),
        title: caps["title"].trim().to_owned(),
    })
}

fn starts_with_article(value: &str) -> bool {
    let lowered = value.to_lowercase();
    LEADING_ARTICLES
        .iter()
        .any(|article| lowered.starts_with(article))
}
