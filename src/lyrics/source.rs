//! Parsing raw lyric text into timed or plain lines.
//!
//! Timed text uses LRC-style `[mm:ss]` / `[mm:ss.fff]` tags at the start of a
//! line. A line may carry several tags (`[00:12.00][01:40.00]Chorus`) and then
//! yields one line per tag. Metadata tags such as `[ar:Artist]` never match.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::LyricsMode;

/// Regex matching a single timestamp tag anywhere in the text.
#[allow(clippy::expect_used)]
static RE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d+):(\d+)(?:\.(\d+))?\]").expect("valid regex: RE_TAG")
});

/// Regex matching a line that starts with one or more timestamp tags.
#[allow(clippy::expect_used)]
static RE_TIMED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:\[\d+:\d+(?:\.\d+)?\])+)(.*)$").expect("valid regex: RE_TIMED_LINE")
});

/// Regex matching an LRC metadata line such as `[ar:Artist]` or `[offset:+200]`.
#[allow(clippy::expect_used)]
static RE_META_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[[A-Za-z]+:[^\]]*\]$").expect("valid regex: RE_META_LINE")
});

/// One display line, before it is placed on the mix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Timestamp in source time; `None` for plain lines.
    pub source_time_ms: Option<u64>,
    /// Line text, never empty.
    pub text: String,
}

impl LyricLine {
    /// A line with a source timestamp.
    pub fn timed(source_time_ms: u64, text: impl Into<String>) -> Self {
        Self { source_time_ms: Some(source_time_ms), text: text.into() }
    }

    /// A line without timing.
    pub fn plain(text: impl Into<String>) -> Self {
        Self { source_time_ms: None, text: text.into() }
    }
}

/// Lyrics of one segment after the mode has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLyrics {
    /// The segment contributes nothing.
    Skipped,
    /// Lines with source timestamps, sorted ascending.
    Timed(Vec<LyricLine>),
    /// Untimed lines in their original order.
    Plain(Vec<LyricLine>),
}

impl ParsedLyrics {
    /// Number of lines that will be remapped.
    pub fn len(&self) -> usize {
        match self {
            Self::Skipped => 0,
            Self::Timed(lines) | Self::Plain(lines) => lines.len(),
        }
    }

    /// Whether no lines will be remapped.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decide the mode from the text alone: timed iff a timestamp tag appears.
pub fn infer_mode(text: &str) -> LyricsMode {
    if RE_TAG.is_match(text) {
        LyricsMode::Timed
    } else {
        LyricsMode::Plain
    }
}

/// Parse tagged lines, sorted by source time.
///
/// Untagged lines, lines with no text after the tags and tags whose numbers
/// do not fit are skipped. The sort is stable, so lines sharing a timestamp
/// keep their written order.
pub fn parse_timed(text: &str) -> Vec<LyricLine> {
    let mut lines = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        let Some(caps) = RE_TIMED_LINE.captures(line) else {
            continue;
        };
        let (Some(tags), Some(body)) = (caps.get(1), caps.get(2)) else {
            continue;
        };

        let body = body.as_str().trim();
        if body.is_empty() {
            continue;
        }

        for tag in RE_TAG.captures_iter(tags.as_str()) {
            let fraction = tag.get(3).map(|m| m.as_str());
            match parse_timestamp(&tag[1], &tag[2], fraction, line) {
                Ok(ms) => lines.push(LyricLine::timed(ms, body)),
                Err(e) => tracing::debug!("Skipping lyric tag: {e}"),
            }
        }
    }

    lines.sort_by_key(|l| l.source_time_ms);
    lines
}

/// Parse untimed text: trimmed, non-empty lines in order.
pub fn parse_plain(text: &str) -> Vec<LyricLine> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(LyricLine::plain)
        .collect()
}

/// Apply the declared mode to raw text.
///
/// Text declared timed that yields no usable tagged lines is treated as
/// plain, so a mislabeled segment still shows its lyrics. Leftover tags and
/// metadata lines are dropped from that fallback.
pub fn parse_for_mode(text: &str, mode: LyricsMode) -> ParsedLyrics {
    match mode {
        LyricsMode::Skip => ParsedLyrics::Skipped,
        LyricsMode::Plain => ParsedLyrics::Plain(parse_plain(text)),
        LyricsMode::Timed => {
            let timed = parse_timed(text);
            if timed.is_empty() {
                tracing::debug!("No timestamp tags found in timed lyrics; using plain lines");
                ParsedLyrics::Plain(parse_untagged(text))
            } else {
                ParsedLyrics::Timed(timed)
            }
        }
    }
}

/// Plain lines with leading timestamp tags removed and metadata lines skipped.
fn parse_untagged(text: &str) -> Vec<LyricLine> {
    text.lines()
        .map(str::trim)
        .filter(|line| !RE_META_LINE.is_match(line))
        .map(|line| {
            RE_TIMED_LINE
                .captures(line)
                .and_then(|caps| caps.get(2))
                .map_or(line, |body| body.as_str())
                .trim()
        })
        .filter(|line| !line.is_empty())
        .map(LyricLine::plain)
        .collect()
}

/// Convert tag components to milliseconds.
///
/// The fraction is read as a decimal fraction of a second and truncated to
/// whole milliseconds: `.5` is 500, `.05` is 50, `.0059` is 5.
fn parse_timestamp(minutes: &str, seconds: &str, fraction: Option<&str>, line: &str) -> Result<u64> {
    let malformed = |message: &str| Error::MalformedLyricTimestamp {
        line: line.to_string(),
        message: message.to_string(),
    };

    let minutes: u64 = minutes.parse().map_err(|_| malformed("minutes out of range"))?;
    let seconds: u64 = seconds.parse().map_err(|_| malformed("seconds out of range"))?;
    let millis = fraction.map_or(Ok(0), fraction_to_millis).map_err(|_| malformed("bad fraction"))?;

    minutes
        .checked_mul(60_000)
        .and_then(|ms| seconds.checked_mul(1000).and_then(|s| ms.checked_add(s)))
        .and_then(|ms| ms.checked_add(millis))
        .ok_or_else(|| malformed("timestamp overflows"))
}

fn fraction_to_millis(digits: &str) -> std::result::Result<u64, std::num::ParseIntError> {
    let mut padded: String = digits.chars().take(3).collect();
    while padded.len() < 3 {
        padded.push('0');
    }
    padded.parse()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_parse_timed_basic() {
        let lines = parse_timed("[00:10.00]Hello\n[00:20.00]World");
        assert_eq!(lines, vec![LyricLine::timed(10_000, "Hello"), LyricLine::timed(20_000, "World")]);
    }

    #[test]
    fn test_fraction_precision() {
        let lines = parse_timed("[01:02]a\n[00:01.5]b\n[00:01.05]c\n[00:01.123]d\n[00:01.0059]e");
        let times: Vec<_> = lines.iter().map(|l| l.source_time_ms.unwrap()).collect();
        assert_eq!(times, vec![1005, 1050, 1123, 1500, 62_000]);
    }

    #[test]
    fn test_parse_timed_sorts_and_keeps_ties_in_order() {
        let lines = parse_timed("[00:30.00]late\n[00:05.00]first\n[00:05.00]second");
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "late"]);
    }

    #[test]
    fn test_parse_timed_drops_untagged_and_empty() {
        let text = "[ar:Someone]\nno tag here\n[00:01.00]\n  [00:02.00]  padded  \n";
        let lines = parse_timed(text);
        assert_eq!(lines, vec![LyricLine::timed(2000, "padded")]);
    }

    #[test]
    fn test_parse_timed_repeated_tags() {
        let lines = parse_timed("[00:12.00][01:40.00]Chorus line");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].source_time_ms, Some(12_000));
        assert_eq!(lines[1].source_time_ms, Some(100_000));
        assert!(lines.iter().all(|l| l.text == "Chorus line"));
    }

    #[test]
    fn test_overflowing_tag_is_skipped_not_fatal() {
        let text = "[99999999999999999999:00]broken\n[00:03.00]fine";
        let lines = parse_timed(text);
        assert_eq!(lines, vec![LyricLine::timed(3000, "fine")]);
    }

    #[test]
    fn test_parse_plain() {
        let lines = parse_plain("  one \n\n\t\ntwo\n three");
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert!(lines.iter().all(|l| l.source_time_ms.is_none()));
    }

    #[test]
    fn test_infer_mode() {
        assert_eq!(infer_mode("intro\n[02:03.45]line"), LyricsMode::Timed);
        assert_eq!(infer_mode("[01:30]Test"), LyricsMode::Timed);
        assert_eq!(infer_mode("Just plain text"), LyricsMode::Plain);
        assert_eq!(infer_mode("[ar:Artist Name]"), LyricsMode::Plain);
        assert_eq!(infer_mode(""), LyricsMode::Plain);
    }

    #[test]
    fn test_timed_without_tags_falls_back_to_plain() {
        let text = "verse one\nverse two";
        assert_eq!(parse_for_mode(text, LyricsMode::Timed), parse_for_mode(text, LyricsMode::Plain));
    }

    #[test]
    fn test_fallback_never_shows_bare_tags() {
        let parsed = parse_for_mode("[00:01.00]\n[00:05.00]", LyricsMode::Timed);
        assert_eq!(parsed, ParsedLyrics::Plain(vec![]));

        let parsed = parse_for_mode("[ti:Song]\n[00:01.00]\nsung words", LyricsMode::Timed);
        assert_eq!(parsed, ParsedLyrics::Plain(vec![LyricLine::plain("sung words")]));
    }

    #[test]
    fn test_skip_ignores_text() {
        let parsed = parse_for_mode("[00:01.00]ignored", LyricsMode::Skip);
        assert_eq!(parsed, ParsedLyrics::Skipped);
        assert!(parsed.is_empty());
    }
}
