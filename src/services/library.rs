//! Lyric lookup.
//!
//! [`MetadataSource`] is the seam for anything that can find a song and
//! return its lyric text. [`LyricsLibrary`] serves a local directory of
//! `Artist - Title.lrc` (or `.txt`) files.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::constants::library::{LYRICS_EXTENSIONS, MAX_SEARCH_RESULTS, MIN_FUZZY_SCORE};
use crate::error::{Error, Result};
use crate::types::TrackId;

/// A search hit from a metadata source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Source-specific identifier, passed back to `fetch_lyrics`.
    pub id: TrackId,
    /// Song title.
    pub title: String,
    /// Performing artist; empty when unknown.
    pub artist: String,
}

/// Something that can find songs and their lyrics.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Search for tracks matching `query`, best match first.
    async fn search(&self, query: &str) -> Result<Vec<TrackInfo>>;

    /// Lyric text for a track, or `None` if the source has none.
    async fn fetch_lyrics(&self, id: &TrackId) -> Result<Option<String>>;
}

#[derive(Debug, Clone)]
struct LibraryEntry {
    info: TrackInfo,
    path: PathBuf,
    /// "artist title", lowercased.
    haystack: String,
}

/// Lyrics served from files on disk, indexed on first use.
#[derive(Debug)]
pub struct LyricsLibrary {
    root: PathBuf,
    index: OnceLock<Vec<LibraryEntry>>,
}

impl LyricsLibrary {
    /// Create a library rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::config(
                format!("lyrics directory does not exist: {}", root.display()),
                "Set MIXSET_LYRICS_DIR to a directory of .lrc/.txt files",
            ));
        }
        Ok(Self { root, index: OnceLock::new() })
    }

    /// Number of indexed lyric files.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the library holds no lyric files.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> &[LibraryEntry] {
        self.index.get_or_init(|| {
            let entries: Vec<LibraryEntry> = WalkDir::new(&self.root)
                .follow_links(true)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_file() && has_lyrics_extension(e.path()))
                .filter_map(|e| index_entry(&self.root, e.path()))
                .collect();
            tracing::info!("Indexed {} lyric files in {}", entries.len(), self.root.display());
            entries
        })
    }

    /// Rank entries against a query: substring hits first, then fuzzy ones.
    fn rank(&self, query: &str) -> Vec<TrackInfo> {
        let query_lower = query.trim().to_lowercase();
        if query_lower.is_empty() {
            return Vec::new();
        }

        let entries = self.entries();
        let exact: Vec<TrackInfo> = entries
            .iter()
            .filter(|e| {
                let title = e.info.title.to_lowercase();
                e.haystack.contains(&query_lower) || (!title.is_empty() && query_lower.contains(&title))
            })
            .map(|e| e.info.clone())
            .collect();
        if !exact.is_empty() {
            return exact.into_iter().take(MAX_SEARCH_RESULTS).collect();
        }

        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<(i64, &LibraryEntry)> = entries
            .par_iter()
            .filter_map(|e| {
                let score = matcher.fuzzy_match(&e.haystack, &query_lower)?;
                (score >= MIN_FUZZY_SCORE).then_some((score, e))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored.into_iter().take(MAX_SEARCH_RESULTS).map(|(_, e)| e.info.clone()).collect()
    }
}

#[async_trait]
impl MetadataSource for LyricsLibrary {
    async fn search(&self, query: &str) -> Result<Vec<TrackInfo>> {
        let results = self.rank(query);
        tracing::debug!("Library search {query:?}: {} hits", results.len());
        Ok(results)
    }

    async fn fetch_lyrics(&self, id: &TrackId) -> Result<Option<String>> {
        let Some(entry) = self.entries().iter().find(|e| &e.info.id == id) else {
            return Ok(None);
        };
        let text = fs_err::read_to_string(&entry.path).map_err(|e| Error::io(e, entry.path.clone()))?;
        Ok(Some(text))
    }
}

fn has_lyrics_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| LYRICS_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}

/// Index a file named `Artist - Title.ext`; a stem without a dash is all title.
fn index_entry(root: &Path, path: &Path) -> Option<LibraryEntry> {
    let stem = path.file_stem()?.to_str()?;
    let (artist, title) = split_stem(stem);
    let id = path.strip_prefix(root).unwrap_or(path).to_string_lossy().into_owned();
    let haystack = format!("{artist} {title}").trim().to_lowercase();

    Some(LibraryEntry {
        info: TrackInfo { id: TrackId::new(id), title, artist },
        path: path.to_path_buf(),
        haystack,
    })
}

fn split_stem(stem: &str) -> (String, String) {
    match stem.split_once(" - ") {
        Some((artist, title)) => (artist.trim().to_string(), title.trim().to_string()),
        None => (String::new(), stem.trim().to_string()),
    }
}
