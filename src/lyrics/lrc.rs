//! LRC rendering of a mix timeline, handy for checking sync in any player.

use super::remap::TimelineEntry;

/// Format a mix time as an LRC tag, truncated to centiseconds.
pub fn format_tag(mix_time_ms: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let ms = mix_time_ms.max(0.0) as u64;
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let centis = (ms % 1000) / 10;
    format!("[{minutes:02}:{seconds:02}.{centis:02}]")
}

/// Render entries as LRC, one `[mm:ss.xx]text` line each.
pub fn to_lrc(entries: &[TimelineEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}{}", format_tag(entry.mix_time_ms), entry.text))
        .collect::<Vec<_>>()
        .join("\n")
}
