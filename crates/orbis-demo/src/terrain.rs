//! Procedural tile sources: fBm simplex noise sampled on the unit sphere so
//! tiles match across hemisphere and antimeridian seams.

use noise::{NoiseFn, Simplex};
use orbis_geodetic::{ChunkIndex, Geodetic2, GeodeticPatch};
use orbis_tiles::{DepthTransform, TexelGrid, TileSource};

/// Parameters of a multi-octave noise field.
#[derive(Clone, Debug)]
pub struct FbmParams {
    /// Noise seed.
    pub seed: u32,
    /// Octaves summed per sample.
    pub octaves: u32,
    /// Frequency ratio between octaves.
    pub lacunarity: f64,
    /// Amplitude ratio between octaves.
    pub persistence: f64,
    /// Frequency of the first octave, in cycles per unit sphere radius.
    pub base_frequency: f64,
}

impl Default for FbmParams {
    fn default() -> Self {
        Self {
            seed: 7,
            octaves: 8,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 1.5,
        }
    }
}

/// fBm over 3D simplex noise, normalized to roughly `[-1, 1]`.
pub struct Fbm {
    noise: Simplex,
    params: FbmParams,
    normalization: f64,
}

impl Fbm {
    pub fn new(params: FbmParams) -> Self {
        let normalization = (0..params.octaves)
            .map(|i| params.persistence.powi(i as i32))
            .sum::<f64>()
            .recip();
        Self {
            noise: Simplex::new(params.seed),
            params,
            normalization,
        }
    }

    /// Sample at a geodetic point of the unit sphere.
    pub fn sample(&self, point: Geodetic2) -> f64 {
        let (sin_lat, cos_lat) = point.lat.sin_cos();
        let (sin_lon, cos_lon) = point.lon.sin_cos();
        let p = [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat];

        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = 1.0;
        for _ in 0..self.params.octaves {
            total += amplitude * self.noise.get([p[0] * frequency, p[1] * frequency, p[2] * frequency]);
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }
        total * self.normalization
    }
}

/// Raw texels of the tile `index`, sampled at texel centers, row 0 south.
fn sample_tile(field: &Fbm, index: ChunkIndex, size: u32, map: impl Fn(f64) -> f32) -> TexelGrid {
    let patch = GeodeticPatch::from(index);
    let step = patch.size().scale(1.0 / f64::from(size));
    let values = (0..size)
        .flat_map(|y| (0..size).map(move |x| (x, y)))
        .map(|(x, y)| {
            let point = Geodetic2::new(
                patch.min_lat() + (f64::from(y) + 0.5) * step.lat,
                patch.min_lon() + (f64::from(x) + 0.5) * step.lon,
            );
            map(field.sample(point))
        })
        .collect();
    TexelGrid::new(size, size, values)
}

/// Elevation tiles. Texels hold normalized noise; the depth transform maps
/// them to meters.
pub struct HeightSource {
    field: Fbm,
    max_level: u8,
    tile_size: u32,
    relief_m: f32,
}

impl HeightSource {
    pub fn new(params: FbmParams, max_level: u8, tile_size: u32, relief_m: f32) -> Self {
        Self {
            field: Fbm::new(params),
            max_level,
            tile_size,
            relief_m,
        }
    }
}

impl TileSource for HeightSource {
    fn max_level(&self) -> u8 {
        self.max_level
    }

    fn load(&self, index: ChunkIndex) -> Option<TexelGrid> {
        Some(sample_tile(&self.field, index, self.tile_size, |v| v as f32))
    }

    fn depth_transform(&self) -> DepthTransform {
        DepthTransform {
            offset: 0.0,
            scale: self.relief_m,
        }
    }
}

/// Single-channel albedo tiles in `[0, 1]`.
pub struct AlbedoSource {
    field: Fbm,
    max_level: u8,
    tile_size: u32,
}

impl AlbedoSource {
    pub fn new(params: FbmParams, max_level: u8, tile_size: u32) -> Self {
        Self {
            field: Fbm::new(params),
            max_level,
            tile_size,
        }
    }
}

impl TileSource for AlbedoSource {
    fn max_level(&self) -> u8 {
        self.max_level
    }

    fn load(&self, index: ChunkIndex) -> Option<TexelGrid> {
        Some(sample_tile(&self.field, index, self.tile_size, |v| {
            (0.5 + 0.5 * v).clamp(0.0, 1.0) as f32
        }))
    }
}
