//! JSON mix requests and their conversion into segments.
//!
//! A request lists what the user queued: an audio file (or a search query to
//! download one), optional lyric text or a way to find it, and an optional
//! trim window. Missing pieces get the same defaults a freshly queued track
//! gets: the whole file, and a lyrics mode inferred from the text.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::segment::Segment;
use crate::error::{Error, Result, SegmentIssue};
use crate::services::audio::AudioBackend;
use crate::services::download::AudioSource;
use crate::services::library::MetadataSource;
use crate::types::LyricsMode;

/// One queued track as written in a manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpec {
    /// Display title; defaults to the downloaded title or file stem.
    #[serde(default)]
    pub title: Option<String>,
    /// Local audio file.
    #[serde(default)]
    pub audio_path: Option<PathBuf>,
    /// Search query or URL to download audio from when no path is given.
    #[serde(default)]
    pub query: Option<String>,
    /// Inline lyric text.
    #[serde(default)]
    pub lyrics: Option<String>,
    /// File to read lyric text from.
    #[serde(default)]
    pub lyrics_file: Option<PathBuf>,
    /// Query for the metadata source when no lyric text is given.
    #[serde(default)]
    pub lyrics_search: Option<String>,
    /// Declared lyrics mode; inferred from the text when absent.
    #[serde(default)]
    pub lyrics_mode: Option<LyricsMode>,
    /// Trim start in milliseconds; defaults to 0.
    #[serde(default)]
    pub start_ms: Option<f64>,
    /// Trim end in milliseconds; defaults to the source duration.
    #[serde(default)]
    pub end_ms: Option<f64>,
    /// Known source duration; probed from the audio backend when absent.
    #[serde(default)]
    pub duration_ms: Option<f64>,
    /// Playback-rate multiplier; defaults to 1.0.
    #[serde(default)]
    pub speed_rate: Option<f64>,
}

/// A whole mix request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MixRequest {
    /// Crossfade override in milliseconds.
    #[serde(default)]
    pub crossfade_ms: Option<f64>,
    /// Queued tracks in mix order.
    pub segments: Vec<SegmentSpec>,
}

/// External collaborators used while resolving a request.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Reports source durations.
    pub audio: &'a dyn AudioBackend,
    /// Downloads audio for query-only segments.
    pub fetcher: Option<&'a dyn AudioSource>,
    /// Looks up lyric text for `lyrics_search`.
    pub metadata: Option<&'a dyn MetadataSource>,
}

impl MixRequest {
    /// Parse a request from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a manifest file; relative paths inside it are taken relative to
    /// the manifest's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs_err::read_to_string(path).map_err(|e| Error::io(e, path.to_path_buf()))?;
        let mut request: Self = serde_json::from_str(&text)
            .map_err(|e| Error::parse(e.to_string(), path.to_path_buf()))?;

        if let Some(base) = path.parent() {
            request.resolve_relative(base);
        }
        Ok(request)
    }

    fn resolve_relative(&mut self, base: &Path) {
        let rebase = |p: &mut Option<PathBuf>| {
            if let Some(path) = p.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        };
        for spec in &mut self.segments {
            rebase(&mut spec.audio_path);
            rebase(&mut spec.lyrics_file);
        }
    }

    /// Problems visible in the manifest alone, by 1-based position.
    ///
    /// Needs no network or audio tooling: only the given numbers and whether
    /// local audio files exist.
    pub fn preflight(&self) -> Vec<SegmentIssue> {
        if self.segments.is_empty() {
            return vec![SegmentIssue::EmptyMix];
        }
        self.segments
            .iter()
            .enumerate()
            .flat_map(|(idx, spec)| spec.issues(idx + 1))
            .collect()
    }

    /// Resolve every spec into a [`Segment`], in list order.
    ///
    /// Fails closed. Manifest problems are reported by position before any
    /// download or probe runs. A segment whose duration is neither given in
    /// the manifest nor readable from the file is reported the same way, once
    /// every segment has been tried. Lyric lookups that fail only leave the
    /// segment without lyrics.
    pub async fn into_segments(self, with: &Collaborators<'_>) -> Result<Vec<Segment>> {
        let issues = self.preflight();
        if !issues.is_empty() {
            return Err(Error::InvalidSegment(issues));
        }
        if with.fetcher.is_none() {
            if let Some(idx) = self.segments.iter().position(|s| s.audio_path.is_none()) {
                return Err(Error::config(
                    format!("segment {} only has a query and no audio source is available", idx + 1),
                    "Give the segment an audio_path or enable downloads",
                ));
            }
        }

        let mut segments = Vec::with_capacity(self.segments.len());
        let mut issues = Vec::new();

        for (idx, spec) in self.segments.into_iter().enumerate() {
            let position = idx + 1;
            let (audio_path, fetched_title) = resolve_audio(&spec, position, with).await?;

            let duration_ms = match spec.duration_ms {
                Some(d) => d,
                None => match with.audio.probe_duration_ms(&audio_path).await {
                    Ok(d) => d,
                    Err(e) => {
                        issues.push(SegmentIssue::UnknownDuration { position, reason: e.to_string() });
                        continue;
                    }
                },
            };
            let lyrics = resolve_lyrics(&spec, position, with).await?;

            let mut segment = Segment::new(
                audio_path,
                spec.start_ms.unwrap_or(0.0),
                spec.end_ms.unwrap_or(duration_ms),
            )
            .with_order(idx)
            .with_source_duration(duration_ms)
            .with_lyrics(lyrics);

            if let Some(title) = spec.title.or(fetched_title) {
                segment = segment.with_title(title);
            }
            if let Some(mode) = spec.lyrics_mode {
                segment = segment.with_mode(mode);
            }
            if let Some(rate) = spec.speed_rate {
                segment = segment.with_speed_rate(rate);
            }

            tracing::debug!(
                "Queued segment {position} '{}' [{} ms, {} ms] mode={}",
                segment.title,
                segment.trim_start_ms,
                segment.trim_end_ms,
                segment.lyrics_mode
            );
            segments.push(segment);
        }

        if issues.is_empty() {
            Ok(segments)
        } else {
            Err(Error::InvalidSegment(issues))
        }
    }
}

impl SegmentSpec {
    fn issues(&self, position: usize) -> Vec<SegmentIssue> {
        let mut issues = Vec::new();
        let start_ms = self.start_ms.unwrap_or(0.0);

        if start_ms < 0.0 {
            issues.push(SegmentIssue::NegativeStart { position, start_ms });
        }
        if let Some(end_ms) = self.end_ms.or(self.duration_ms) {
            if end_ms.partial_cmp(&start_ms) != Some(Ordering::Greater) {
                issues.push(SegmentIssue::InvertedTrim { position, start_ms, end_ms });
            }
        }
        if let (Some(end_ms), Some(duration_ms)) = (self.end_ms, self.duration_ms) {
            if end_ms > duration_ms {
                issues.push(SegmentIssue::PastSourceEnd { position, end_ms, duration_ms });
            }
        }
        if let Some(speed_rate) = self.speed_rate {
            if !speed_rate.is_finite() || speed_rate <= 0.0 {
                issues.push(SegmentIssue::InvalidSpeed { position, speed_rate });
            }
        }
        match (&self.audio_path, &self.query) {
            (Some(path), _) if !path.is_file() => {
                issues.push(SegmentIssue::MissingSource { position, path: path.clone() });
            }
            (None, None) => issues.push(SegmentIssue::NoAudio { position }),
            _ => {}
        }

        issues
    }
}

async fn resolve_audio(
    spec: &SegmentSpec,
    position: usize,
    with: &Collaborators<'_>,
) -> Result<(PathBuf, Option<String>)> {
    if let Some(path) = &spec.audio_path {
        return Ok((path.clone(), None));
    }

    match (&spec.query, with.fetcher) {
        (Some(query), Some(fetcher)) => {
            let (path, title) = fetcher.fetch_audio(query).await?;
            Ok((path, Some(title)))
        }
        _ => Err(Error::InvalidSegment(vec![SegmentIssue::NoAudio { position }])),
    }
}

async fn resolve_lyrics(spec: &SegmentSpec, position: usize, with: &Collaborators<'_>) -> Result<String> {
    if let Some(text) = &spec.lyrics {
        return Ok(text.clone());
    }

    if let Some(path) = &spec.lyrics_file {
        return fs_err::read_to_string(path).map_err(|e| Error::io(e, path.clone()));
    }

    let (Some(query), Some(metadata)) = (&spec.lyrics_search, with.metadata) else {
        return Ok(String::new());
    };

    let found = match metadata.search(query).await {
        Ok(tracks) => tracks.into_iter().next(),
        Err(e) => {
            tracing::warn!("Lyrics search failed for segment {position}: {e}");
            None
        }
    };
    let Some(track) = found else {
        tracing::info!("No lyrics found for segment {position} ('{query}')");
        return Ok(String::new());
    };

    match metadata.fetch_lyrics(&track.id).await {
        Ok(text) => Ok(text.unwrap_or_default()),
        Err(e) => {
            tracing::warn!("Lyrics fetch failed for segment {position} ({}): {e}", track.id);
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic, clippy::float_cmp)]

    use super::*;
    use crate::mix::Placement;
    use crate::services::library::TrackInfo;
    use crate::types::TrackId;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    struct FixedDuration(f64);

    #[async_trait]
    impl AudioBackend for FixedDuration {
        async fn probe_duration_ms(&self, _path: &Path) -> Result<f64> {
            Ok(self.0)
        }

        async fn render_mix(&self, _placements: &[Placement], _crossfade_ms: f64, _output: &Path) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct OneSong;

    #[async_trait]
    impl MetadataSource for OneSong {
        async fn search(&self, _query: &str) -> Result<Vec<TrackInfo>> {
            Ok(vec![TrackInfo { id: TrackId::new("42"), title: "Song".into(), artist: "Band".into() }])
        }

        async fn fetch_lyrics(&self, id: &TrackId) -> Result<Option<String>> {
            Ok((id.as_str() == "42").then(|| "[00:01.00]found it".to_string()))
        }
    }

    struct NoProbe;

    #[async_trait]
    impl AudioBackend for NoProbe {
        async fn probe_duration_ms(&self, path: &Path) -> Result<f64> {
            Err(Error::parse("no audio stream", path.to_path_buf()))
        }

        async fn render_mix(&self, _placements: &[Placement], _crossfade_ms: f64, _output: &Path) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "none"
        }
    }

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AudioSource for CountingFetcher {
        async fn fetch_audio(&self, query: &str) -> Result<(PathBuf, String)> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok((PathBuf::from("/downloads/song.mp3"), query.to_string()))
        }
    }

    // Manifest with each named audio file created inside `dir`
    fn request_in(dir: &Path, json: &str, files: &[&str]) -> MixRequest {
        for name in files {
            std::fs::write(dir.join(name), b"").unwrap();
        }
        let mut request = MixRequest::from_json(json).unwrap();
        request.resolve_relative(dir);
        request
    }

    #[tokio::test]
    async fn defaults_cover_whole_file_and_infer_mode() {
        let dir = tempfile::tempdir().unwrap();
        let request = request_in(
            dir.path(),
            r#"{"segments": [
                {"audio_path": "a.mp3", "lyrics": "[00:01.00]hi"},
                {"audio_path": "b.mp3", "lyrics": "hello", "start_ms": 1000, "end_ms": 5000},
                {"audio_path": "c.mp3", "lyrics": "[00:01.00]hi", "lyrics_mode": "skip"}
            ]}"#,
            &["a.mp3", "b.mp3", "c.mp3"],
        );

        let backend = FixedDuration(200_000.0);
        let with = Collaborators { audio: &backend, fetcher: None, metadata: None };
        let segments = request.into_segments(&with).await.unwrap();

        assert_eq!(segments[0].trim_end_ms, 200_000.0);
        assert_eq!(segments[0].lyrics_mode, LyricsMode::Timed);
        assert_eq!(segments[1].trim_start_ms, 1000.0);
        assert_eq!(segments[1].lyrics_mode, LyricsMode::Plain);
        assert_eq!(segments[2].lyrics_mode, LyricsMode::Skip);
        assert_eq!(segments[2].order, 2);
        assert_eq!(segments[2].source_duration_ms, Some(200_000.0));
    }

    #[tokio::test]
    async fn lyrics_come_from_metadata_search() {
        let dir = tempfile::tempdir().unwrap();
        let request = request_in(
            dir.path(),
            r#"{"segments": [{"audio_path": "a.mp3", "lyrics_search": "band song", "duration_ms": 9000}]}"#,
            &["a.mp3"],
        );

        let backend = FixedDuration(1.0);
        let with = Collaborators { audio: &backend, fetcher: None, metadata: Some(&OneSong) };
        let segments = request.into_segments(&with).await.unwrap();

        assert_eq!(segments[0].raw_lyrics, "[00:01.00]found it");
        assert_eq!(segments[0].trim_end_ms, 9000.0);
    }

    #[tokio::test]
    async fn query_without_fetcher_is_an_error() {
        let request = MixRequest::from_json(r#"{"segments": [{"query": "some song"}]}"#).unwrap();
        let backend = FixedDuration(1.0);
        let with = Collaborators { audio: &backend, fetcher: None, metadata: None };
        assert!(matches!(request.into_segments(&with).await, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn inverted_trim_stops_the_run_before_any_download() {
        let dir = tempfile::tempdir().unwrap();
        let request = request_in(
            dir.path(),
            r#"{"segments": [
                {"audio_path": "a.mp3", "start_ms": 9000, "end_ms": 1000},
                {"query": "second song"}
            ]}"#,
            &["a.mp3"],
        );

        let backend = FixedDuration(60_000.0);
        let fetcher = CountingFetcher::default();
        let with = Collaborators { audio: &backend, fetcher: Some(&fetcher), metadata: None };
        let err = request.into_segments(&with).await.unwrap_err();

        assert!(matches!(
            err.segment_issues(),
            [SegmentIssue::InvertedTrim { position: 1, .. }]
        ));
        assert_eq!(fetcher.calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_query_segment_is_downloaded_once() {
        let request = MixRequest::from_json(r#"{"segments": [{"query": "second song", "duration_ms": 30000}]}"#)
            .unwrap();

        let backend = FixedDuration(1.0);
        let fetcher = CountingFetcher::default();
        let with = Collaborators { audio: &backend, fetcher: Some(&fetcher), metadata: None };
        let segments = request.into_segments(&with).await.unwrap();

        assert_eq!(fetcher.calls.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(segments[0].title, "second song");
        assert_eq!(segments[0].trim_end_ms, 30_000.0);
    }

    #[test]
    fn preflight_lists_every_manifest_problem() {
        let request = MixRequest::from_json(
            r#"{"segments": [
                {"audio_path": "/nowhere/a.mp3"},
                {"audio_path": "/nowhere/b.mp3", "start_ms": -5},
                {"lyrics": "no audio at all"},
                {"query": "x", "start_ms": 0, "end_ms": 70000, "duration_ms": 60000, "speed_rate": 0}
            ]}"#,
        )
        .unwrap();

        let issues = request.preflight();
        assert_eq!(issues.len(), 6);
        assert!(matches!(issues[0], SegmentIssue::MissingSource { position: 1, .. }));
        assert!(matches!(issues[1], SegmentIssue::NegativeStart { position: 2, .. }));
        assert!(matches!(issues[2], SegmentIssue::MissingSource { position: 2, .. }));
        assert!(matches!(issues[3], SegmentIssue::NoAudio { position: 3 }));
        assert!(matches!(issues[4], SegmentIssue::PastSourceEnd { position: 4, .. }));
        assert!(matches!(issues[5], SegmentIssue::InvalidSpeed { position: 4, .. }));
    }

    #[test]
    fn start_past_known_duration_is_inverted() {
        let request = MixRequest::from_json(
            r#"{"segments": [{"query": "x", "start_ms": 60000, "duration_ms": 60000}]}"#,
        )
        .unwrap();
        assert!(matches!(
            request.preflight().as_slice(),
            [SegmentIssue::InvertedTrim { position: 1, start_ms, end_ms }] if *start_ms == 60_000.0 && *end_ms == 60_000.0
        ));
    }

    #[test]
    fn empty_request_has_no_segments() {
        let request = MixRequest::from_json(r#"{"segments": []}"#).unwrap();
        assert_eq!(request.preflight(), vec![SegmentIssue::EmptyMix]);
    }

    #[tokio::test]
    async fn failed_duration_reads_are_reported_by_position() {
        let dir = tempfile::tempdir().unwrap();
        let request = request_in(
            dir.path(),
            r#"{"segments": [
                {"audio_path": "a.mp3"},
                {"audio_path": "b.mp3", "duration_ms": 10000},
                {"audio_path": "c.mp3"}
            ]}"#,
            &["a.mp3", "b.mp3", "c.mp3"],
        );

        let with = Collaborators { audio: &NoProbe, fetcher: None, metadata: None };
        let err = request.into_segments(&with).await.unwrap_err();

        let positions: Vec<_> = err
            .segment_issues()
            .iter()
            .map(|issue| match issue {
                SegmentIssue::UnknownDuration { position, reason } => {
                    assert!(reason.contains("no audio stream"));
                    *position
                }
                other => panic!("unexpected issue {other}"),
            })
            .collect();
        assert_eq!(positions, vec![1, 3]);
    }

    #[test]
    fn load_rebases_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("mix.json");
        std::fs::write(
            &manifest,
            r#"{"crossfade_ms": 5000, "segments": [{"audio_path": "songs/a.mp3", "lyrics_file": "/abs/a.lrc"}]}"#,
        )
        .unwrap();

        let request = MixRequest::load(&manifest).unwrap();
        assert_eq!(request.crossfade_ms, Some(5000.0));
        assert_eq!(request.segments[0].audio_path, Some(dir.path().join("songs/a.mp3")));
        assert_eq!(request.segments[0].lyrics_file, Some(PathBuf::from("/abs/a.lrc")));
    }
}
