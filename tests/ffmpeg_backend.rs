//! Integration tests for the ffmpeg audio backend.

// Needs ffmpeg/ffprobe on PATH; only runs with the integration_test feature.
#![cfg(feature = "integration_test")]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::path::Path;

use mixset::config::Config;
use mixset::mix::{place, Segment};
use mixset::services::{AudioBackend, FfmpegBackend};
use tokio::process::Command;

// Write a sine tone of the given length, or None if ffmpeg can't be run
async fn tone(config: &Config, path: &Path, seconds: u32) -> Option<()> {
    let status = Command::new(&config.ffmpeg)
        .args(["-y", "-hide_banner", "-loglevel", "error", "-f", "lavfi", "-i"])
        .arg(format!("sine=frequency=440:duration={seconds}"))
        .arg(path)
        .status()
        .await
        .ok()?;
    status.success().then_some(())
}

#[tokio::test]
async fn test_probe_and_render_mix() {
    let config = Config::load().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.wav");
    let second = dir.path().join("second.wav");

    if tone(&config, &first, 6).await.is_none() || tone(&config, &second, 4).await.is_none() {
        println!("Skipping integration test: ffmpeg not available");
        return;
    }

    let backend = FfmpegBackend::from_config(&config);
    let duration = backend.probe_duration_ms(&first).await.unwrap();
    assert!((duration - 6000.0).abs() < 50.0, "unexpected duration {duration}");

    let segments = vec![
        Segment::new(&first, 1000.0, 6000.0).with_source_duration(duration),
        Segment::new(&second, 0.0, 4000.0).with_order(1),
    ];
    let placements = place(&segments, 2000.0).unwrap();
    let output = dir.path().join("mix.mp3");
    backend.render_mix(&placements, 2000.0, &output).await.unwrap();

    let mixed = backend.probe_duration_ms(&output).await.unwrap();
    println!("Rendered mix of {mixed} ms");
    assert!((mixed - 7000.0).abs() < 250.0, "unexpected mix length {mixed}");
}
