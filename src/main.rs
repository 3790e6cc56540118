//! `mixset` - build a crossfaded mix and its lyric timeline from a manifest.
//!
//! Usage: mixset <manifest.json> [--out DIR] [--crossfade-ms N]
//!               [--render-audio] [--render-video] [--translate]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mixset::config::Config;
use mixset::lyrics::to_lrc;
use mixset::mix::{validate_sources, Collaborators, MixRequest};
use mixset::services::frames::render_video;
use mixset::services::translation::translate_timeline;
use mixset::services::{
    AudioBackend, DrawtextRenderer, FfmpegBackend, FramePlan, LyricsLibrary, MarkerTranslator,
    MetadataSource, OpenAiTranslator, Translator, YtDlpSource,
};
use mixset::build_timeline;

const USAGE: &str = "Usage: mixset <manifest.json> [--out DIR] [--crossfade-ms N] [--render-audio] [--render-video] [--translate]";

#[derive(Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
struct Args {
    manifest: PathBuf,
    out: Option<PathBuf>,
    crossfade_ms: Option<f64>,
    render_audio: bool,
    render_video: bool,
    translate: bool,
}

impl Args {
    fn parse(mut raw: impl Iterator<Item = String>) -> Result<Self> {
        let mut args = Self::default();
        let mut manifest = None;

        while let Some(arg) = raw.next() {
            match arg.as_str() {
                "--out" => args.out = Some(raw.next().context("--out needs a directory")?.into()),
                "--crossfade-ms" => {
                    let value = raw.next().context("--crossfade-ms needs a value")?;
                    args.crossfade_ms =
                        Some(value.parse().with_context(|| format!("invalid --crossfade-ms: {value}"))?);
                }
                "--render-audio" => args.render_audio = true,
                "--render-video" => {
                    args.render_audio = true;
                    args.render_video = true;
                }
                "--translate" => args.translate = true,
                "-h" | "--help" => {
                    println!("{USAGE}");
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
                path => {
                    if manifest.replace(PathBuf::from(path)).is_some() {
                        bail!("only one manifest may be given\n{USAGE}");
                    }
                }
            }
        }

        args.manifest = manifest.context(USAGE)?;
        Ok(args)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "mixset=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse(std::env::args().skip(1))?;
    let mut config = Config::load().context("Failed to load config")?;
    if let Some(out) = args.out.clone() {
        config.output_dir = out;
    }
    tracing::info!("{} v{}", config.app_name(), config.app_version());

    let request = MixRequest::load(&args.manifest)
        .with_context(|| format!("Failed to read manifest {}", args.manifest.display()))?;
    let crossfade_ms = args.crossfade_ms.or(request.crossfade_ms).unwrap_or(config.crossfade_ms);

    let backend = FfmpegBackend::from_config(&config);
    let fetcher = YtDlpSource::from_config(&config);
    let library = config.lyrics_dir.as_ref().map(LyricsLibrary::new).transpose()?;
    let with = Collaborators {
        audio: &backend,
        fetcher: Some(&fetcher),
        metadata: library.as_ref().map(|l| l as &dyn MetadataSource),
    };

    let segments = request.into_segments(&with).await.context("Failed to resolve segments")?;
    validate_sources(&segments)?;
    let mut timeline = build_timeline(&segments, crossfade_ms)?;

    if args.translate {
        let translator: Box<dyn Translator> = if config.has_translation_credentials() {
            Box::new(OpenAiTranslator::new(&config)?)
        } else {
            tracing::warn!("OPENAI_API_KEY not set; using marker translations");
            Box::new(MarkerTranslator)
        };
        translate_timeline(&mut timeline.entries, translator.as_ref()).await;
    }

    let run_dir = config.output_dir.join(uuid::Uuid::new_v4().simple().to_string());
    fs_err::create_dir_all(&run_dir)?;

    let plan = FramePlan::new(&timeline.entries, config.tail_hold_ms);
    fs_err::write(run_dir.join("timeline.lrc"), to_lrc(&timeline.entries))?;
    fs_err::write(run_dir.join("timeline.json"), serde_json::to_string_pretty(&timeline)?)?;
    fs_err::write(run_dir.join("frames.json"), serde_json::to_string_pretty(&plan)?)?;

    if args.render_audio {
        let mix_path = run_dir.join("mix.mp3");
        backend
            .render_mix(&timeline.placements, crossfade_ms, &mix_path)
            .await
            .with_context(|| format!("{} could not render the mix", backend.name()))?;

        if args.render_video {
            let renderer = DrawtextRenderer::new(config.ffmpeg.clone());
            render_video(&plan, &renderer, &config.ffmpeg, &mix_path, &run_dir.join("frames"), &run_dir.join("mix.mp4"))
                .await
                .context("Failed to render the lyric video")?;
        }
    }

    println!(
        "{} segments, {} lyric lines, {:.1}s -> {}",
        timeline.placements.len(),
        timeline.entries.len(),
        timeline.total_duration_ms / 1000.0,
        run_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic, clippy::float_cmp)]

    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        Args::parse(args.iter().map(ToString::to_string))
    }

    #[test]
    fn parses_flags_in_any_order() {
        let args = parse(&["--crossfade-ms", "2500", "mix.json", "--render-video", "--out", "/tmp/out"]).unwrap();
        assert_eq!(args.manifest, PathBuf::from("mix.json"));
        assert_eq!(args.crossfade_ms, Some(2500.0));
        assert_eq!(args.out, Some(PathBuf::from("/tmp/out")));
        assert!(args.render_audio && args.render_video);
        assert!(!args.translate);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["a.json", "b.json"]).is_err());
        assert!(parse(&["a.json", "--bogus"]).is_err());
        assert!(parse(&["a.json", "--crossfade-ms", "soon"]).is_err());
    }
}
