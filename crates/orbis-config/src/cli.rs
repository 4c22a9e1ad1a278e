//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, LevelEvaluation};

/// Orbis command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "orbis", about = "Globe level-of-detail quadtree demo")]
pub struct CliArgs {
    /// Number of frames to simulate.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Starting camera altitude in meters.
    #[arg(long)]
    pub altitude: Option<f64>,

    /// Latitude of the flight target in degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub latitude: Option<f64>,

    /// Longitude of the flight target in degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub longitude: Option<f64>,

    /// Desired level measure.
    #[arg(long, value_enum)]
    pub evaluation: Option<LevelEvaluation>,

    /// Shallowest leaf level.
    #[arg(long)]
    pub min_split_depth: Option<u8>,

    /// Deepest leaf level.
    #[arg(long)]
    pub max_split_depth: Option<u8>,

    /// Detail multiplier for the level measures.
    #[arg(long)]
    pub lod_scale_factor: Option<f64>,

    /// Disable horizon culling.
    #[arg(long)]
    pub no_horizon_culling: bool,

    /// Disable frustum culling.
    #[arg(long)]
    pub no_frustum_culling: bool,

    /// Write per-frame statistics as JSON to this file.
    #[arg(long)]
    pub stats_out: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(frames) = args.frames {
            self.flight.frames = frames;
        }
        if let Some(altitude) = args.altitude {
            self.flight.start_altitude_m = altitude;
        }
        if let Some(lat) = args.latitude {
            self.flight.latitude_deg = lat;
        }
        if let Some(lon) = args.longitude {
            self.flight.longitude_deg = lon;
        }
        if let Some(evaluation) = args.evaluation {
            self.lod.evaluation = evaluation;
        }
        if let Some(depth) = args.min_split_depth {
            self.lod.min_split_depth = depth;
        }
        if let Some(depth) = args.max_split_depth {
            self.lod.max_split_depth = depth;
        }
        if let Some(factor) = args.lod_scale_factor {
            self.lod.lod_scale_factor = factor;
        }
        if args.no_horizon_culling {
            self.lod.horizon_culling = false;
        }
        if args.no_frustum_culling {
            self.lod.frustum_culling = false;
        }
        if let Some(ref path) = args.stats_out {
            self.debug.stats_output = Some(path.clone());
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            frames: Some(10),
            evaluation: Some(LevelEvaluation::Distance),
            max_split_depth: Some(16),
            no_frustum_culling: true,
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.flight.frames, 10);
        assert_eq!(config.lod.evaluation, LevelEvaluation::Distance);
        assert_eq!(config.lod.max_split_depth, 16);
        assert!(!config.lod.frustum_culling);
        // Non-overridden fields retain defaults
        assert!(config.lod.horizon_culling);
        assert_eq!(config.lod.min_split_depth, 2);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from([
            "orbis",
            "--latitude",
            "-33.9",
            "--evaluation",
            "projected-area",
            "--no-horizon-culling",
        ]);
        assert_eq!(args.latitude, Some(-33.9));
        assert_eq!(args.evaluation, Some(LevelEvaluation::ProjectedArea));
        assert!(args.no_horizon_culling);
        assert!(!args.no_frustum_culling);
    }
}
