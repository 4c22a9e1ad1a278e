//! Configuration structs with sensible defaults and RON persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use orbis_geodetic::ChunkIndex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Globe shape.
    pub globe: GlobeConfig,
    /// Viewport and projection.
    pub view: ViewConfig,
    /// Level-of-detail and culling settings.
    pub lod: LodConfig,
    /// Per texture category settings.
    pub tiles: TilesConfig,
    /// Scripted camera flight used by the demo.
    pub flight: FlightConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Globe configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobeConfig {
    /// Ellipsoid semi-axes `(x, y, z)` in meters.
    pub radii_m: [f64; 3],
}

/// Viewport and projection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
    /// Vertical field of view in degrees.
    pub fov_y_deg: f64,
    /// Near clip distance in meters.
    pub near_m: f64,
    /// Far clip distance in meters.
    pub far_m: f64,
}

/// Which distance-like measure drives the desired level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum LevelEvaluation {
    /// Camera-to-surface distance.
    Distance,
    /// Approximate projected area on screen.
    ProjectedArea,
}

/// Level-of-detail, culling and debug geometry settings read by every
/// quadtree traversal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Shallowest level any leaf may have.
    pub min_split_depth: u8,
    /// Deepest level any leaf may have.
    pub max_split_depth: u8,
    /// Detail multiplier applied by the distance and area measures.
    pub lod_scale_factor: f64,
    /// Primary desired level measure.
    pub evaluation: LevelEvaluation,
    /// Never split below the deepest level with height data.
    pub limit_by_available_data: bool,
    /// Skip chunks hidden behind the horizon.
    pub horizon_culling: bool,
    /// Skip chunks outside the view frustum.
    pub frustum_culling: bool,
    /// Keep refining culled chunks (debugging aid).
    pub expand_culled_subtrees: bool,
    /// Emit the bounding box of each rendered chunk.
    pub show_chunk_bounds: bool,
    /// Emit the screen-space box of each rendered chunk.
    pub show_chunk_aabb: bool,
}

/// Settings for one texture category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TileGroupConfig {
    /// Resolve several ancestor levels per chunk for blending.
    pub level_blending: bool,
    /// Names of providers that start disabled.
    pub inactive_providers: Vec<String>,
}

/// Tile settings keyed by texture category name (e.g. `"HeightMaps"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TilesConfig {
    /// Per category settings. Missing categories use defaults.
    pub groups: BTreeMap<String, TileGroupConfig>,
    /// Worker threads for asynchronous providers (0 = one per CPU).
    pub worker_threads: usize,
    /// Maximum queued tile loads per provider.
    pub queue_capacity: usize,
}

/// Scripted camera flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlightConfig {
    /// Latitude of the point the camera descends towards, in degrees.
    pub latitude_deg: f64,
    /// Longitude of the point the camera descends towards, in degrees.
    pub longitude_deg: f64,
    /// Altitude at the first frame in meters.
    pub start_altitude_m: f64,
    /// Altitude at the last frame in meters.
    pub end_altitude_m: f64,
    /// Angle between the view direction and straight down at the last frame.
    pub end_tilt_deg: f64,
    /// Number of frames to simulate.
    pub frames: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Emit a frame statistics line every this many frames (0 = never).
    pub stats_interval: u32,
    /// Write per-frame statistics as JSON to this file.
    pub stats_output: Option<PathBuf>,
}

// --- Default implementations ---

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            radii_m: [6_378_137.0, 6_378_137.0, 6_356_752.314_245_179],
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fov_y_deg: 60.0,
            near_m: 1.0,
            far_m: 1.0e9,
        }
    }
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            min_split_depth: 2,
            max_split_depth: 22,
            lod_scale_factor: 10.0,
            evaluation: LevelEvaluation::ProjectedArea,
            limit_by_available_data: true,
            horizon_culling: true,
            frustum_culling: true,
            expand_culled_subtrees: false,
            show_chunk_bounds: false,
            show_chunk_aabb: false,
        }
    }
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
            worker_threads: 0,
            queue_capacity: 256,
        }
    }
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            latitude_deg: 58.4,
            longitude_deg: 15.6,
            start_altitude_m: 20_000_000.0,
            end_altitude_m: 1_000.0,
            end_tilt_deg: 70.0,
            frames: 240,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_interval: 30,
            stats_output: None,
        }
    }
}

// --- Validation ---

impl LodConfig {
    /// Check that split depths and the scale factor are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let levels = ChunkIndex::ROOT_LEVEL..=ChunkIndex::MAX_LEVEL;
        if !levels.contains(&self.min_split_depth) {
            return Err(ConfigError::Invalid {
                field: "lod.min_split_depth",
                reason: format!("{} is outside {levels:?}", self.min_split_depth),
            });
        }
        if !levels.contains(&self.max_split_depth) {
            return Err(ConfigError::Invalid {
                field: "lod.max_split_depth",
                reason: format!("{} is outside {levels:?}", self.max_split_depth),
            });
        }
        if self.min_split_depth > self.max_split_depth {
            return Err(ConfigError::Invalid {
                field: "lod.min_split_depth",
                reason: format!(
                    "{} exceeds max_split_depth {}",
                    self.min_split_depth, self.max_split_depth
                ),
            });
        }
        if !(self.lod_scale_factor.is_finite() && self.lod_scale_factor > 0.0) {
            return Err(ConfigError::Invalid {
                field: "lod.lod_scale_factor",
                reason: format!("{} is not a positive number", self.lod_scale_factor),
            });
        }
        Ok(())
    }
}

impl Config {
    /// Validate every section that has constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lod.validate()?;
        if self.globe.radii_m.iter().any(|r| !(r.is_finite() && *r > 0.0)) {
            return Err(ConfigError::Invalid {
                field: "globe.radii_m",
                reason: format!("{:?} must all be positive", self.globe.radii_m),
            });
        }
        if !(self.view.near_m > 0.0 && self.view.far_m > self.view.near_m) {
            return Err(ConfigError::Invalid {
                field: "view.near_m",
                reason: format!(
                    "need 0 < near ({}) < far ({})",
                    self.view.near_m, self.view.far_m
                ),
            });
        }
        Ok(())
    }

    /// Platform config directory for orbis, if one exists.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("orbis"))
    }
}

// --- Persistence ---

/// File name of the persisted configuration inside the config directory.
pub const CONFIG_FILE: &str = "config.ron";

fn read_file(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
    ron::from_str(&text).map_err(ConfigError::ParseError)
}

impl Config {
    /// Read `config.ron` from `config_dir`, writing the defaults there first
    /// if the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("wrote default config to {}", path.display());
            return Ok(config);
        }
        let config = read_file(&path)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Write this config to `config_dir/config.ron`, creating the directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;
        std::fs::write(config_dir.join(CONFIG_FILE), text).map_err(ConfigError::WriteError)
    }

    /// Re-read the file. `None` when it still matches `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = read_file(&config_dir.join(CONFIG_FILE))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("config file changed on disk");
        Ok(Some(fresh))
    }
}
