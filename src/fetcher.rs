//! Genre/year enrichment from the Google Books volumes API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::cache::MetadataCache;
use crate::genre::UNKNOWN_GENRE;

pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/books/v1/volumes";
pub const UNKNOWN_YEAR: &str = "0000";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetails {
    pub genre: String,
    pub year: String,
}

/// Source of optional genre/year details for a title and author.
///
/// `None` means nothing usable was found; callers carry on without it.
pub trait BookLookup: Send + Sync {
    fn lookup(&self, title: &str, author: &str) -> Option<BookDetails>;
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(rename = "totalItems", default)]
    total_items: u64,
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo")]
    volume_info: Option<VolumeInfo>,
}

#[derive(Debug, Deserialize)]
struct VolumeInfo {
    #[serde(default)]
    categories: Vec<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
}

pub struct GoogleBooksFetcher {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    cache: Option<Arc<dyn MetadataCache>>,
}

impl GoogleBooksFetcher {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        cache: Option<Arc<dyn MetadataCache>>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.to_owned(),
            api_key,
            cache,
        })
    }

    fn fetch_remote(&self, title: &str, author: &str) -> Option<BookDetails> {
        let query = format!("intitle:{title} inauthor:{author}");
        let mut request = self.client.get(&self.base_url).query(&[("q", query.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = match request.send() {
            Ok(response) => response,
            Err(error) => {
                log::warn!("Book lookup for '{title}' by {author} failed: {error}");
                return None;
            }
        };
        let status = response.status();
        if !status.is_success() {
            log::warn!("Book lookup for '{title}' by {author} returned HTTP {status}");
            return None;
        }

        match response.json::<VolumesResponse>() {
            Ok(body) => details_from_response(body),
            Err(error) => {
                log::warn!("Book lookup for '{title}' by {author} sent an unreadable body: {error}");
                None
            }
        }
    }
}

impl BookLookup for GoogleBooksFetcher {
    fn lookup(&self, title: &str, author: &str) -> Option<BookDetails> {
        let (title, author) = (title.trim(), author.trim());
        if title.is_empty() || author.is_empty() {
            return None;
        }

        if let Some(cache) = &self.cache {
            if let Some(entry) = cache.get(title, author) {
                log::debug!("Cache hit for '{title}' by {author}");
                return Some(entry.details());
            }
        }

        let details = self.fetch_remote(title, author);
        match &details {
            Some(found) => {
                log::debug!("Metadata fetched for '{title}' by {author}");
                if let Some(cache) = &self.cache {
                    if let Err(error) = cache.set(title, author, found) {
                        log::warn!("Could not cache metadata for '{title}': {error:#}");
                    }
                }
            }
            None => log::warn!("Failed to fetch metadata for '{title}' by {author}"),
        }
        details
    }
}

fn details_from_response(body: VolumesResponse) -> Option<BookDetails> {
    if body.total_items == 0 {
        return None;
    }
    let info = body.items.into_iter().next()?.volume_info?;

    let genre = info
        .categories
        .into_iter()
        .next()
        .unwrap_or_else(|| UNKNOWN_GENRE.to_owned());
    let year = info
        .published_date
        .as_deref()
        .and_then(|date| date.split('-').next())
        .map(str::trim)
        .filter(|year| !year.is_empty())
        .unwrap_or(UNKNOWN_YEAR)
        .to_owned();

    Some(BookDetails { genre, year })
}
