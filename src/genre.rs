pub const UNKNOWN_GENRE: &str = "Unknown Genre";

/// Keyword table, in tie-break order.
const GENRE_KEYWORDS: [(&str, &[&str]); 12] = [
    (
        "Sci-Fi",
        &["science fiction", "sci-fi", "space", "alien", "future", "robot", "cyberpunk", "dystopian"],
    ),
    (
        "Fantasy",
        &["fantasy", "magic", "wizard", "dragon", "sword", "medieval", "quest", "epic"],
    ),
    (
        "Mystery",
        &["mystery", "detective", "murder", "crime", "investigation", "thriller", "suspense"],
    ),
    ("Romance", &["romance", "love", "relationship", "heart", "passion", "dating"]),
    (
        "Horror",
        &["horror", "zombie", "vampire", "ghost", "supernatural", "scary", "terror"],
    ),
    (
        "Biography",
        &["biography", "memoir", "life story", "autobiography", "real life"],
    ),
    ("History", &["history", "historical", "war", "ancient", "century", "empire"]),
    (
        "Business",
        &["business", "entrepreneur", "money", "finance", "leadership", "marketing"],
    ),
    (
        "Self-Help",
        &["self-help", "motivation", "success", "improvement", "guide", "how to"],
    ),
    (
        "Young Adult",
        &["young adult", "ya", "teen", "teenager", "high school", "coming of age"],
    ),
    ("Literary Fiction", &["literary", "fiction", "novel", "story", "contemporary"]),
    ("Non-Fiction", &["non-fiction", "facts", "true", "real", "research", "study"]),
];

/// Guesses a genre by counting keyword hits in the title, author and description.
///
/// Returns [`UNKNOWN_GENRE`] when nothing matches. Equal scores resolve to the
/// genre listed first.
pub fn infer_genre(title: &str, author: &str, description: Option<&str>) -> &'static str {
    let text = format!("{title} {author} {}", description.unwrap_or_default()).to_lowercase();

    let mut best: Option<(&'static str, usize)> = None;
    for (genre, keywords) in GENRE_KEYWORDS {
        let score = keywords
            .iter()
            .filter(|keyword| text.contains(*keyword))
            .count();
        if score == 0 {
            continue;
        }
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((genre, score));
        }
    }

    best.map_or(UNKNOWN_GENRE, |(genre, _)| genre)
}
