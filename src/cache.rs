//! Local cache of book-lookup results, keyed by normalized title and author.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::cli::CacheBackend;
use crate::config::CacheConfig;
use crate::fetcher::BookDetails;

pub const JSON_FILE: &str = "metadata_cache.json";
pub const SQLITE_FILE: &str = "metadata_cache.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub year: String,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(title: &str, author: &str, details: &BookDetails) -> Self {
        Self {
            title: title.to_owned(),
            author: author.to_owned(),
            genre: details.genre.clone(),
            year: details.year.clone(),
            cached_at: Utc::now(),
        }
    }

    pub fn details(&self) -> BookDetails {
        BookDetails {
            genre: self.genre.clone(),
            year: self.year.clone(),
        }
    }
}

/// Key/value store for lookup results. Implementations synchronize internally
/// so a single instance can be shared by every worker.
pub trait MetadataCache: Send + Sync {
    fn get(&self, title: &str, author: &str) -> Option<CacheEntry>;

    /// Stores `details`, replacing any previous entry for the same key.
    fn set(&self, title: &str, author: &str, details: &BookDetails) -> Result<()>;

    fn clear(&self) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// SHA-256 of `"title|author"`, lowercased and trimmed.
pub fn cache_key(title: &str, author: &str) -> String {
    let combined = format!(
        "{}|{}",
        title.trim().to_lowercase(),
        author.trim().to_lowercase()
    );
    hex::encode(Sha256::digest(combined.as_bytes()))
}

pub fn open(config: &CacheConfig) -> Result<Arc<dyn MetadataCache>> {
    let cache: Arc<dyn MetadataCache> = match config.backend {
        CacheBackend::Json => Arc::new(JsonCache::open(&config.dir)?),
        CacheBackend::Sqlite => Arc::new(SqliteCache::open(&config.dir)?),
    };
    Ok(cache)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create cache directory '{}'", dir.display()))
}

pub struct JsonCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl JsonCache {
    pub fn open(dir: &Path) -> Result<Self> {
        ensure_dir(dir)?;
        let path = dir.join(JSON_FILE);
        let entries = load_json(&path);
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Writes a sibling temp file and renames it over the cache, so an
    /// interrupted write never leaves a truncated cache behind.
    fn persist(&self, entries: &HashMap<String, CacheEntry>) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        {
            let file = File::create(&tmp)
                .with_context(|| format!("failed to create cache file '{}'", tmp.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, entries)
                .with_context(|| format!("failed to write cache file '{}'", tmp.display()))?;
            writer
                .flush()
                .with_context(|| format!("failed to flush cache file '{}'", tmp.display()))?;
        }
        fs::rename(&tmp, &self.path).with_context(|| {
            format!(
                "failed to replace cache file '{}' with '{}'",
                self.path.display(),
                tmp.display()
            )
        })
    }
}

fn load_json(path: &Path) -> HashMap<String, CacheEntry> {
    if !path.exists() {
        return HashMap::new();
    }

    let parsed = fs::read_to_string(path)
        .context("failed to read cache file")
        .and_then(|raw| {
            serde_json::from_str::<HashMap<String, CacheEntry>>(&raw)
                .context("cache file is not valid JSON")
        });
    match parsed {
        Ok(entries) => entries,
        Err(error) => {
            log::warn!("Ignoring cache file '{}': {error:#}", path.display());
            HashMap::new()
        }
    }
}

impl MetadataCache for JsonCache {
    fn get(&self, title: &str, author: &str) -> Option<CacheEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&cache_key(title, author)).cloned()
    }

    fn set(&self, title: &str, author: &str, details: &BookDetails) -> Result<()> {
        // The lock is held while writing so only one thread rewrites the file at a time.
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(cache_key(title, author), CacheEntry::new(title, author, details));
        self.persist(&entries)
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
        self.persist(&entries)
    }

    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    pub fn open(dir: &Path) -> Result<Self> {
        ensure_dir(dir)?;
        let path = dir.join(SQLITE_FILE);
        let conn = Connection::open(&path)
            .with_context(|| format!("failed to open cache database '{}'", path.display()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS metadata_cache (
                key TEXT PRIMARY KEY,
                title TEXT,
                author TEXT,
                genre TEXT,
                year TEXT,
                fetched_at TEXT,
                data TEXT
            )",
        )
        .context("failed to initialize cache schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lookup(&self, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM metadata_cache WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|raw| serde_json::from_str(&raw).context("cached row is not valid JSON"))
            .transpose()
    }
}

impl MetadataCache for SqliteCache {
    fn get(&self, title: &str, author: &str) -> Option<CacheEntry> {
        match self.lookup(&cache_key(title, author)) {
            Ok(entry) => entry,
            Err(error) => {
                log::warn!("Cache lookup for '{title}' by {author} failed: {error:#}");
                None
            }
        }
    }

    fn set(&self, title: &str, author: &str, details: &BookDetails) -> Result<()> {
        let entry = CacheEntry::new(title, author, details);
        let data = serde_json::to_string(&entry).context("failed to serialize cache entry")?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT OR REPLACE INTO metadata_cache
                (key, title, author, genre, year, fetched_at, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                cache_key(title, author),
                entry.title,
                entry.author,
                entry.genre,
                entry.year,
                entry.cached_at.to_rfc3339(),
                data,
            ],
        )
        .context("failed to store cache entry")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute("DELETE FROM metadata_cache", [])
            .context("failed to clear cache")?;
        Ok(())
    }

    fn len(&self) -> usize {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.query_row("SELECT COUNT(*) FROM metadata_cache", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|count| usize::try_from(count).unwrap_or_default())
        .unwrap_or_default()
    }
}
