use anyhow::{Context, Result};
use clap::Parser;
use cutline_core::journal::RecordingJournal;
use cutline_core::media::MediaLibrary;
use cutline_core::settings::RenderSettings;
use cutline_preview::driver::{PlaybackDriver, Presented};
use cutline_render::output::PlaceholderStage;
use cutline_render::workflow::Workflow;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "cutline",
    version,
    about = "Headless timeline player",
    long_about = "Loads a media catalog and a timeline layout, plays it through the render pipeline at the project frame rate and reports what was presented."
)]
struct Cli {
    /// Render settings file (JSON)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Named preset (1080p, 1080p60, 720p, 4k, shorts); ignored with --settings
    #[arg(short, long, default_value = "1080p")]
    preset: String,

    /// Media catalog file (JSON array of media records)
    #[arg(short, long)]
    catalog: PathBuf,

    /// Timeline layout to load; without it every catalog item is dropped
    /// end to end on track 0
    #[arg(long)]
    project: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(short, long)]
    frames: Option<u64>,

    /// Write the resulting layout here
    #[arg(long)]
    save: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    info!("Starting cutline v{}", env!("CARGO_PKG_VERSION"));

    let settings = match &cli.settings {
        Some(path) => RenderSettings::load_from_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => RenderSettings::preset(&cli.preset)
            .ok_or_else(|| anyhow::anyhow!("Unknown preset: {}", cli.preset))?,
    };
    info!(
        width = settings.width,
        height = settings.height,
        fps = settings.fps,
        "render settings"
    );

    let library = Arc::new(
        MediaLibrary::load_from_file(&cli.catalog)
            .with_context(|| format!("loading catalog from {}", cli.catalog.display()))?,
    );
    info!(items = library.len(), "media catalog loaded");

    let journal = Arc::new(RecordingJournal::new(1000));
    let stage = PlaceholderStage {
        width: settings.width,
        height: settings.height,
        sample_rate: settings.sample_rate,
        fps: settings.fps,
    };
    let workflow = Arc::new(Workflow::new(
        settings.initial_tracks,
        library.clone(),
        Arc::new(stage),
        journal.clone(),
    ));

    match &cli.project {
        Some(path) => {
            let summary = workflow
                .load_layout(path)
                .with_context(|| format!("loading layout from {}", path.display()))?;
            info!(loaded = summary.loaded, skipped = summary.skipped, "project loaded");
        }
        None => {
            let mut ids: Vec<_> = library.search("").into_iter().map(|m| (m.name, m.id)).collect();
            ids.sort();
            for (name, id) in ids {
                let at = workflow.length_frame();
                match workflow.drop_media(id, 0, at) {
                    Ok(dropped) => info!(%name, at = %dropped.at, "media dropped"),
                    Err(e) => tracing::warn!(%name, error = %e, "could not drop media"),
                }
            }
        }
    }
    info!(
        length = workflow.length_frame(),
        edits = journal.len(),
        "timeline ready"
    );

    if let Some(path) = &cli.save {
        let written = workflow.save_layout(path)?;
        info!(path = %written.display(), "layout saved");
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<Presented>();
    let driver = PlaybackDriver::spawn(workflow.clone(), tx, &settings);
    driver.play().await?;

    let limit = cli.frames.unwrap_or(u64::MAX);
    let mut seen = 0u64;
    let mut composed = 0u64;
    while seen < limit {
        let Some(frame) = rx.recv().await else {
            break;
        };
        seen += 1;
        let black = frame
            .video
            .as_ref()
            .and_then(|v| v.as_video())
            .map_or(true, |v| v.is_black());
        if !black {
            composed += 1;
        }
    }

    let summary = if seen >= limit {
        driver.stop().await?;
        driver.join().await?
    } else {
        driver.finished().await?
    };

    info!(
        presented = summary.presented,
        composed,
        end_reached = summary.end_reached,
        "playback summary"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
