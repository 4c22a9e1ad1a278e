//! Headless globe flight.
//!
//! Builds an Earth-sized globe streamed from procedural tile sources, flies a
//! camera from orbit down to a tilted low-altitude view and logs how the
//! quadtree refines along the way.
//!
//! Run with: `cargo run -p orbis-demo -- --frames 600 --latitude 46.5 --longitude 8.0`

mod flight;
mod recorder;
mod terrain;

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use glam::DVec3;
use orbis_config::{CliArgs, Config, ConfigError};
use orbis_geodetic::Ellipsoid;
use orbis_lod::{ChunkedLodGlobe, FrameStats, ModelTransform, RenderData, UpdateData};
use orbis_tiles::{AsyncTileProvider, TextureCategory, TileError, TileProviderManager, TileSource};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::flight::Flight;
use crate::recorder::{FrameTally, RecordingRenderer};
use crate::terrain::{AlbedoSource, FbmParams, HeightSource};

/// Simulated frame rate used to derive frame time.
const FRAMES_PER_SECOND: f64 = 60.0;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tiles(#[from] TileError),

    #[error("failed to write stats: {0}")]
    StatsWrite(#[source] std::io::Error),

    #[error("failed to serialize stats: {0}")]
    StatsSerialize(#[source] serde_json::Error),
}

/// One line of the stats history.
#[derive(Debug, Serialize)]
struct FrameRecord {
    #[serde(flatten)]
    stats: FrameStats,
    altitude_m: f64,
    tally: FrameTally,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().or_else(Config::default_dir);
    let (mut config, load_error) = match config_dir.as_deref() {
        Some(dir) => match Config::load_or_create(dir) {
            Ok(config) => (config, None),
            Err(err) => (Config::default(), Some(err)),
        },
        None => (Config::default(), None),
    };
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.as_ref().map(|dir| dir.join("logs"));
    orbis_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));
    if let Some(err) = load_error {
        warn!(%err, "using default configuration");
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "flight aborted");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), DemoError> {
    config.validate()?;
    let [x, y, z] = config.globe.radii_m;
    let ellipsoid = Ellipsoid::new(DVec3::new(x, y, z));
    let tiles = build_tiles(config)?;
    let mut globe = ChunkedLodGlobe::new(ellipsoid, tiles, RecordingRenderer::default());
    let flight = Flight::new(&config.flight, &config.view);

    info!(
        frames = flight.frames(),
        latitude = config.flight.latitude_deg,
        longitude = config.flight.longitude_deg,
        evaluation = ?config.lod.evaluation,
        "starting flight"
    );

    let started = Instant::now();
    let mut history = Vec::new();
    let interval = config.debug.stats_interval;
    for frame in 0..flight.frames() {
        let time = f64::from(frame) / FRAMES_PER_SECOND;
        globe.update(&UpdateData {
            model_transform: ModelTransform::IDENTITY,
            time,
        });
        let camera = flight.camera(globe.ellipsoid(), frame);
        let stats = globe.render(&RenderData { camera, time }, &config.lod);
        let tally = globe.renderer().tally();
        let altitude_m = flight.altitude(frame);

        if interval > 0 && (frame + 1) % interval == 0 {
            info!(
                frame = stats.frame,
                altitude_km = altitude_m / 1000.0,
                nodes = stats.chunk_nodes,
                rendered = stats.rendered,
                culled = stats.culled,
                max_level = stats.max_rendered_level,
                fallback_layers = tally.fallback_layers,
                missing_layers = tally.missing_layers,
                terrain_m = globe.height_at(camera.position()),
                "flight progress"
            );
        }
        if config.debug.stats_output.is_some() {
            history.push(FrameRecord {
                stats,
                altitude_m,
                tally,
            });
        }
    }

    let final_stats = globe.stats();
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        nodes = final_stats.chunk_nodes,
        max_level = final_stats.max_rendered_level,
        "flight finished"
    );

    if let Some(path) = &config.debug.stats_output {
        write_history(path, &history)?;
        info!(path = %path.display(), frames = history.len(), "wrote frame statistics");
    }
    Ok(())
}

fn spawn_provider<S: TileSource>(
    source: S,
    config: &Config,
) -> Result<AsyncTileProvider, TileError> {
    match config.tiles.worker_threads {
        0 => AsyncTileProvider::with_defaults(source, config.tiles.queue_capacity),
        threads => AsyncTileProvider::new(source, threads, config.tiles.queue_capacity),
    }
}

/// Register the procedural providers and apply the tile configuration.
fn build_tiles(config: &Config) -> Result<TileProviderManager, DemoError> {
    let mut tiles = TileProviderManager::new();

    let terrain = HeightSource::new(FbmParams::default(), 14, 32, 8_000.0);
    tiles.add_provider(
        TextureCategory::HeightMaps,
        "fbm-terrain",
        Box::new(spawn_provider(terrain, config)?),
    );

    let albedo = AlbedoSource::new(
        FbmParams {
            seed: 11,
            octaves: 5,
            base_frequency: 3.0,
            ..FbmParams::default()
        },
        10,
        16,
    );
    tiles.add_provider(
        TextureCategory::ColorTextures,
        "fbm-albedo",
        Box::new(spawn_provider(albedo, config)?),
    );

    tiles.apply_config(&config.tiles)?;
    Ok(tiles)
}

fn write_history(path: &Path, history: &[FrameRecord]) -> Result<(), DemoError> {
    let json = serde_json::to_string_pretty(history).map_err(DemoError::StatsSerialize)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(DemoError::StatsWrite)?;
    }
    std::fs::write(path, json).map_err(DemoError::StatsWrite)
}
