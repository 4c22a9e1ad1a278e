//! The tile provider contract and per-category provider groups.

use orbis_config::TilesConfig;
use orbis_geodetic::ChunkIndex;
use tracing::{debug, info};

use crate::error::TileError;
use crate::tile::{DepthTransform, TextureHandle, Tile, TileStatus};

/// A source of tiles addressed by [`ChunkIndex`].
///
/// Lookups take `&self` and may be issued for many chunks per frame.
/// `update` and `reset` are called once per frame or on demand by the owner.
pub trait TileProvider: Send + Sync {
    /// Tile for `index`, scheduling a load if it is not resident.
    fn tile(&self, index: ChunkIndex) -> Tile;

    /// Tile for `index` if already resident, without scheduling a load.
    fn cached_tile(&self, index: ChunkIndex) -> Tile {
        self.tile(index)
    }

    /// Status of the tile for `index`, without scheduling a load.
    fn tile_status(&self, index: ChunkIndex) -> TileStatus {
        self.cached_tile(index).status
    }

    /// Mapping from raw texels to meters, for height providers.
    fn depth_transform(&self) -> DepthTransform {
        DepthTransform::IDENTITY
    }

    /// Raw value of one texel of a resident texture, if CPU-side data exists.
    fn texel(&self, _texture: TextureHandle, _x: u32, _y: u32) -> Option<f32> {
        None
    }

    /// Integrate finished background work.
    fn update(&mut self) {}

    /// Drop cached tiles so they are requested again.
    fn reset(&mut self) {}
}

/// Kinds of texture layered onto each chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureCategory {
    /// Base surface color.
    ColorTextures,
    /// Emissive night-side color.
    NightTextures,
    /// Color layers drawn on top of the base.
    Overlays,
    /// Elevation.
    HeightMaps,
    /// Water masks.
    WaterMasks,
}

impl TextureCategory {
    /// Number of categories.
    pub const COUNT: usize = 5;

    /// All categories in layering order.
    pub const ALL: [TextureCategory; Self::COUNT] = [
        TextureCategory::ColorTextures,
        TextureCategory::NightTextures,
        TextureCategory::Overlays,
        TextureCategory::HeightMaps,
        TextureCategory::WaterMasks,
    ];

    /// Name used in configuration files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TextureCategory::ColorTextures => "ColorTextures",
            TextureCategory::NightTextures => "NightTextures",
            TextureCategory::Overlays => "Overlays",
            TextureCategory::HeightMaps => "HeightMaps",
            TextureCategory::WaterMasks => "WaterMasks",
        }
    }

    /// Category with the given configuration name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl std::fmt::Display for TextureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A provider registered under a name, with its active flag.
pub struct NamedTileProvider {
    /// Name used by configuration and logs.
    pub name: String,
    /// Whether the provider contributes tiles.
    pub is_active: bool,
    /// The provider itself.
    pub provider: Box<dyn TileProvider>,
}

/// Ordered providers of one texture category.
pub struct TileProviderGroup {
    category: TextureCategory,
    providers: Vec<NamedTileProvider>,
    level_blending_enabled: bool,
}

impl TileProviderGroup {
    /// Create an empty group.
    #[must_use]
    pub fn new(category: TextureCategory) -> Self {
        Self {
            category,
            providers: Vec::new(),
            level_blending_enabled: false,
        }
    }

    /// Category served by this group.
    #[must_use]
    pub fn category(&self) -> TextureCategory {
        self.category
    }

    /// Append an active provider.
    pub fn add(&mut self, name: impl Into<String>, provider: Box<dyn TileProvider>) {
        let name = name.into();
        debug!(category = %self.category, %name, "registered tile provider");
        self.providers.push(NamedTileProvider {
            name,
            is_active: true,
            provider,
        });
    }

    /// All providers in registration order.
    #[must_use]
    pub fn providers(&self) -> &[NamedTileProvider] {
        &self.providers
    }

    /// Active providers in registration order.
    pub fn active_providers(&self) -> impl Iterator<Item = &dyn TileProvider> + '_ {
        self.providers
            .iter()
            .filter(|p| p.is_active)
            .map(|p| p.provider.as_ref())
    }

    /// The first active provider, used where a single source is needed.
    #[must_use]
    pub fn primary(&self) -> Option<&dyn TileProvider> {
        self.active_providers().next()
    }

    /// Enable or disable a provider by name.
    pub fn set_active(&mut self, name: &str, active: bool) -> Result<(), TileError> {
        let entry = self
            .providers
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| TileError::UnknownProvider {
                category: self.category.name(),
                name: name.to_string(),
            })?;
        entry.is_active = active;
        Ok(())
    }

    /// Whether chunks resolve several ancestor levels from each provider.
    #[must_use]
    pub fn level_blending_enabled(&self) -> bool {
        self.level_blending_enabled
    }

    /// Toggle level blending.
    pub fn set_level_blending(&mut self, enabled: bool) {
        self.level_blending_enabled = enabled;
    }

    /// Forward `update` to every provider, active or not.
    pub fn update(&mut self) {
        for entry in &mut self.providers {
            entry.provider.update();
        }
    }

    /// Forward `reset` to every provider.
    pub fn reset(&mut self) {
        for entry in &mut self.providers {
            entry.provider.reset();
        }
    }
}

/// One [`TileProviderGroup`] per [`TextureCategory`].
pub struct TileProviderManager {
    groups: [TileProviderGroup; TextureCategory::COUNT],
}

impl Default for TileProviderManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TileProviderManager {
    /// A manager with every group empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: TextureCategory::ALL.map(TileProviderGroup::new),
        }
    }

    /// The group for `category`.
    #[must_use]
    pub fn group(&self, category: TextureCategory) -> &TileProviderGroup {
        &self.groups[category as usize]
    }

    /// Mutable group for `category`.
    pub fn group_mut(&mut self, category: TextureCategory) -> &mut TileProviderGroup {
        &mut self.groups[category as usize]
    }

    /// Every group in layering order.
    pub fn groups(&self) -> impl Iterator<Item = &TileProviderGroup> {
        self.groups.iter()
    }

    /// Register a provider into `category`.
    pub fn add_provider(
        &mut self,
        category: TextureCategory,
        name: impl Into<String>,
        provider: Box<dyn TileProvider>,
    ) {
        self.group_mut(category).add(name, provider);
    }

    /// Apply blending and active flags from configuration.
    ///
    /// Providers not listed as inactive are activated.
    pub fn apply_config(&mut self, config: &TilesConfig) -> Result<(), TileError> {
        for (name, group_config) in &config.groups {
            let category = TextureCategory::from_name(name)
                .ok_or_else(|| TileError::UnknownCategory(name.clone()))?;
            let group = self.group_mut(category);
            for inactive in &group_config.inactive_providers {
                if !group.providers.iter().any(|p| &p.name == inactive) {
                    return Err(TileError::UnknownProvider {
                        category: category.name(),
                        name: inactive.clone(),
                    });
                }
            }
            for entry in &mut group.providers {
                entry.is_active = !group_config.inactive_providers.contains(&entry.name);
            }
            group.set_level_blending(group_config.level_blending);
        }
        info!(groups = config.groups.len(), "applied tile configuration");
        Ok(())
    }

    /// Forward `update` to every group.
    pub fn update(&mut self) {
        for group in &mut self.groups {
            group.update();
        }
    }

    /// Forward `reset` to every group.
    pub fn reset(&mut self) {
        info!("resetting tile providers");
        for group in &mut self.groups {
            group.reset();
        }
    }
}
