use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use engine::{EngineConfig, GlobeSession};
use foundation::{GeoRect, LayerKind, Properties, Time};
use scene::{MemoryHost, RenderHost};
use streaming::{fetch_cancelable, FeatureSource};
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Load feature layers into an in-memory globe and report the result")]
struct Args {
    /// Engine config (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the file source directory from the config.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Camera ground rectangle: west,south,east,north
    #[arg(long, default_value = "-180,-90,180,90")]
    camera: String,

    /// Simulated frame length in milliseconds
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Give up after this many frames
    #[arg(long, default_value_t = 100_000)]
    max_frames: u64,

    /// Click at lon,lat after loading (repeatable); selected properties are
    /// printed as JSON.
    #[arg(long = "click")]
    clicks: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = args.data_dir.clone() {
        config.source.backend = engine::SourceBackend::File { dir };
    }

    let camera = parse_rect(&args.camera)?;
    let host = MemoryHost::new(camera, (1920.0, 1080.0));
    let source = config.source.build();
    let mut session = GlobeSession::new(host, &config);
    let dt = args.frame_ms as f64 / 1000.0;

    // The first settle fires without debounce, so the initial bbox is known
    // before anything is fetched.
    session.camera_settled(Time::ZERO);
    let first = session.frame().advance(dt);
    let bbox = session.tick(first);
    load_layers(&mut session, &source, bbox).await;

    let mut frames = 0;
    while !session.is_idle() {
        if frames >= args.max_frames {
            bail!("layers still populating after {frames} frames");
        }
        let next = session.frame().advance(dt);
        if let Some(rect) = session.tick(next) {
            load_layers(&mut session, &source, Some(rect)).await;
        }
        frames += 1;
    }
    info!(frames, "all layers settled");

    for (name, status) in session.statuses() {
        let container = session.layers().get(name).map(|l| l.container());
        let primitives = container.map_or(0, |c| session.host().primitive_count(c));
        let outcome = session.last_outcome(name).map(|o| o.stats());
        println!(
            "{name}\tkind={}\tenabled={}\tfeatures={}\tprimitives={primitives}\trejected={}\tfailed={}\terror={}",
            status.kind,
            status.enabled,
            status.feature_count,
            outcome.map_or(0, |s| s.polygons_rejected),
            outcome.map_or(0, |s| s.solids_failed),
            status.error.as_deref().unwrap_or("-"),
        );
    }

    for click in &args.clicks {
        let (lon, lat) = parse_point(click)?;
        let Some(at) = session.host().project(lon, lat) else {
            warn!(lon, lat, "click outside the camera view");
            continue;
        };
        session.click(at);
    }
    if !args.clicks.is_empty() {
        let selected = session.selected_properties();
        let rows: Vec<&Properties> = selected.iter().map(|p| p.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    }

    Ok(())
}

/// Fetches every enabled layer concurrently and feeds the results back.
async fn load_layers(
    session: &mut GlobeSession<MemoryHost>,
    source: &Arc<dyn FeatureSource>,
    bbox: Option<GeoRect>,
) {
    let targets: Vec<(String, LayerKind)> = session
        .statuses()
        .filter(|(_, s)| s.enabled)
        .map(|(name, s)| (name.to_string(), s.kind))
        .collect();

    let mut tasks = JoinSet::new();
    for (name, kind) in targets {
        let Some(token) = session.begin_fetch(&name) else {
            continue;
        };
        let source = Arc::clone(source);
        tasks.spawn(async move {
            let result = fetch_cancelable(source.as_ref(), &name, kind, bbox, &token).await;
            (name, token, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, token, result)) => session.finish_fetch(&name, &token, result),
            Err(err) => warn!(error = %err, "fetch task failed"),
        }
    }
}

fn parse_numbers<const N: usize>(s: &str) -> anyhow::Result<[f64; N]> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("invalid number list {s:?}"))?;
    match <[f64; N]>::try_from(parts) {
        Ok(values) => Ok(values),
        Err(parts) => bail!("expected {N} numbers, got {}", parts.len()),
    }
}

fn parse_rect(s: &str) -> anyhow::Result<GeoRect> {
    let [west, south, east, north] = parse_numbers::<4>(s)?;
    if west >= east || south >= north {
        bail!("camera rectangle {s:?} is empty");
    }
    Ok(GeoRect::new(west, south, east, north))
}

fn parse_point(s: &str) -> anyhow::Result<(f64, f64)> {
    let [lon, lat] = parse_numbers::<2>(s)?;
    Ok((lon, lat))
}
